use anyhow::{Context, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use verba_types::{SetVoiceRequest, SetVoiceResponse};

pub const SET_VOICE_PATH: &str = "/api/set_voice";

/// Request/response side channel of the backend, next to the audio stream.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VoiceSettings: Send + Sync {
    async fn set_voice(&self, voice_id: &str) -> Result<SetVoiceResponse>;

    /// True when the backend answers its root endpoint with a 2xx.
    async fn health_check(&self) -> bool;
}

pub struct VoiceClient {
    client: Client,
    base_url: String,
}

impl VoiceClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl VoiceSettings for VoiceClient {
    async fn set_voice(&self, voice_id: &str) -> Result<SetVoiceResponse> {
        let url = format!("{}{}", self.base_url, SET_VOICE_PATH);
        let res = self
            .client
            .post(&url)
            .json(&SetVoiceRequest::new(voice_id))
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        let status = res.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Failed to set voice: {}",
                status.canonical_reason().unwrap_or(status.as_str())
            ));
        }

        let body = res
            .json::<SetVoiceResponse>()
            .await
            .context("Invalid set_voice response")?;
        tracing::info!("Voice set to {}: {}", voice_id, body.status());
        Ok(body)
    }

    async fn health_check(&self) -> bool {
        match self.client.get(format!("{}/", self.base_url)).send().await {
            Ok(res) => res.status().is_success(),
            Err(e) => {
                tracing::error!("Backend health check failed: {}", e);
                false
            }
        }
    }
}
