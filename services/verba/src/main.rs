use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::fmt::time::ChronoLocal;
use verba_core::{ConversationSession, SessionConfig, SessionEvent, VoiceClient, VoiceSettings};
use verba_service::commands::{Command, HELP};
use verba_service::config::Config;
use verba_service::native_adapter::{CaptureAdapter, PlaybackAdapter};
use verba_service::realtime_adapter::RealtimeTransport;

#[derive(Parser)]
#[command(version, about = "Practice a language by talking to a voice tutor")]
struct Cli {
    /// WebSocket endpoint of the conversation backend (overrides VERBA_WS_URL)
    #[arg(long)]
    url: Option<String>,
    /// HTTP base URL of the backend (overrides VERBA_API_URL)
    #[arg(long)]
    api_url: Option<String>,
    /// Voice to select once the conversation has started
    #[arg(long)]
    voice: Option<String>,
    /// List audio devices and exit
    #[arg(long)]
    list_devices: bool,
    /// Check that the backend is reachable and exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load application configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let args = Cli::parse();

    if args.list_devices {
        println!("Input devices:\n{}", verba_native_utils::device::get_available_inputs()?);
        println!("Output devices:\n{}", verba_native_utils::device::get_available_outputs()?);
        return Ok(());
    }

    let ws_url = args.url.unwrap_or_else(|| config.ws_url.clone());
    let api_url = args.api_url.unwrap_or_else(|| config.api_url.clone());
    let voice = Arc::new(VoiceClient::new(&api_url));

    if args.health {
        if !voice.health_check().await {
            anyhow::bail!("Backend at {} is not reachable", api_url);
        }
        println!("Backend at {} is healthy", api_url);
        return Ok(());
    }

    tracing::info!("Configuration loaded successfully. Starting verba...");

    let transport_config = verba_realtime::Config::builder().with_url(&ws_url).build();
    let session_config = SessionConfig {
        reconnect_delay: config.reconnect_delay,
        interrupt_policy: config.interrupt_policy,
        ..SessionConfig::default()
    };
    let mut session = ConversationSession::new(
        session_config,
        Box::new(CaptureAdapter::new(config.input_device.clone())),
        Box::new(PlaybackAdapter::new(config.output_device.clone())),
        Box::new(RealtimeTransport::new(transport_config)),
        voice,
    );

    tokio::spawn(print_events(session.subscribe()));

    let mut pending_voice = args.voice;
    start(&mut session, &mut pending_voice).await;
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            input = session.next_input() => {
                // A reconnect attempt can take as long as the connect timeout.
                tokio::select! {
                    _ = session.handle(input) => {}
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Received Ctrl-C, shutting down...");
                        break;
                    }
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<Command>() {
                        Ok(Command::Quit) => break,
                        Ok(command) => run_command(&mut session, command, &mut pending_voice).await,
                        Err(usage) => println!("{}", usage),
                    }
                }
                Ok(None) => {
                    tracing::debug!("stdin closed, waiting for Ctrl-C");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::error!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, shutting down...");
                break;
            }
        }
    }

    session.stop();
    tracing::info!("Shutting down...");
    Ok(())
}

async fn start(session: &mut ConversationSession, pending_voice: &mut Option<String>) {
    if let Err(e) = session.start().await {
        tracing::error!("Failed to start conversation: {}", e);
        return;
    }
    if let Some(voice_id) = pending_voice.take() {
        // Reported through the session's error event on failure.
        let _ = session.set_voice(&voice_id).await;
    }
}

async fn run_command(
    session: &mut ConversationSession,
    command: Command,
    pending_voice: &mut Option<String>,
) {
    match command {
        Command::Start => start(session, pending_voice).await,
        Command::Stop => session.stop(),
        Command::Voice(voice_id) => {
            let _ = session.set_voice(&voice_id).await;
        }
        Command::State => {
            match session.last_error() {
                Some(error) => println!("{} ({})", session.state(), error),
                None => println!("{}", session.state()),
            }
            println!(
                "connected: {}, queued playback segments: {}",
                session.is_connected(),
                session.pending_playback()
            );
        }
        Command::Transcript => {
            for message in session.transcript() {
                println!("[{}] {}", message.sender(), message.text());
            }
        }
        Command::Stats => match session.transport_stats() {
            Some(stats) => println!("{}", stats),
            None => println!("no statistics available"),
        },
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}

async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::StateChanged(state)) => tracing::info!("State: {}", state),
            Ok(SessionEvent::MessageAdded(message)) => {
                println!("[{}] {}", message.sender(), message.text());
            }
            Ok(SessionEvent::Error(error)) => eprintln!("! {}", error),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Event printer lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
