/// Body of `POST /api/set_voice`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SetVoiceRequest {
    voice_id: String,
}

impl SetVoiceRequest {
    pub fn new(voice_id: &str) -> Self {
        Self {
            voice_id: voice_id.to_string(),
        }
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }
}

/// Reply of `POST /api/set_voice`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SetVoiceResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

impl SetVoiceResponse {
    pub fn new(status: &str, message: &str) -> Self {
        Self {
            status: status.to_string(),
            message: message.to_string(),
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let json = serde_json::to_string(&SetVoiceRequest::new("es-female-1")).unwrap();
        assert_eq!(json, r#"{"voice_id":"es-female-1"}"#);
    }

    #[test]
    fn test_response_tolerates_missing_fields() {
        let resp: SetVoiceResponse = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert_eq!(resp.status(), "ok");
        assert_eq!(resp.message(), "");
    }
}
