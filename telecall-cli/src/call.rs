use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Input, Select};
use std::sync::Arc;
use telecall_core::{Role, RoomId};
use telecall_session::{
    Call, CallConfig, Collaborators, ConnectionState, LocalAction, NegotiationError,
    NegotiationEvent, SilentMediaSource, TransportConfig, WebRtcTransportFactory, WsChannel,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

pub struct CallArgs {
    pub relay: String,
    pub cpf: Option<String>,
    pub role: Option<Role>,
    pub local_only: bool,
}

const COMMANDS: &str = "mute | unmute | video-off | video-on | end";

fn prompt_cpf() -> Result<String> {
    let cpf = Input::<String>::new()
        .with_prompt("Patient CPF")
        .validate_with(|input: &String| -> Result<(), String> {
            RoomId::from_secret(input)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;
    Ok(cpf)
}

fn prompt_role() -> Result<Role> {
    let choice = Select::new()
        .with_prompt("Join as")
        .items(&["Doctor (initiator)", "Patient (responder)"])
        .default(0)
        .interact()?;
    Ok(if choice == 0 {
        Role::Initiator
    } else {
        Role::Responder
    })
}

fn parse_action(line: &str) -> Option<LocalAction> {
    match line.trim().to_ascii_lowercase().as_str() {
        "mute" => Some(LocalAction::Mute),
        "unmute" => Some(LocalAction::Unmute),
        "video-off" => Some(LocalAction::VideoOff),
        "video-on" => Some(LocalAction::VideoOn),
        "end" | "quit" | "hangup" => Some(LocalAction::EndCall),
        _ => None,
    }
}

fn print_event(event: &NegotiationEvent) {
    match event {
        NegotiationEvent::ConnectionStateChanged(state) => {
            let text = state.status_text();
            let line = match state {
                ConnectionState::Connected => text.green().bold(),
                ConnectionState::Disconnected => text.yellow(),
                ConnectionState::Closed => text.red(),
                _ => text.cyan(),
            };
            println!("● {line}");
        }
        NegotiationEvent::LocalMediaChanged {
            audio_muted,
            video_off,
        } => {
            let mic = if *audio_muted { "muted" } else { "on" };
            let camera = if *video_off { "off" } else { "on" };
            println!("  microphone {mic}, camera {camera}");
        }
        NegotiationEvent::DataChannelOpened(channel) => {
            println!("  data channel '{}' open", channel.label);
        }
        NegotiationEvent::Refused(refusal) => {
            println!("● {}", format!("Connection refused: {refusal}").red());
        }
        other => {
            if let Some(text) = other.status_text() {
                println!("● {}", text.cyan());
            }
        }
    }
}

pub async fn run(args: CallArgs) -> Result<()> {
    let cpf = match args.cpf {
        Some(cpf) => cpf,
        None => prompt_cpf()?,
    };
    let role = match args.role {
        Some(role) => role,
        None => prompt_role()?,
    };

    // The relay's advertised ICE servers win unless running local only.
    let transport_config = if args.local_only {
        TransportConfig::local_only()
    } else {
        TransportConfig::default()
    };
    let collaborators = Collaborators {
        media: Arc::new(SilentMediaSource),
        transports: Arc::new(WebRtcTransportFactory::new(transport_config)),
        channel: Arc::new(WsChannel::new(args.relay)),
    };

    println!("{}", format!("📞 Joining as {role}...").green().bold());
    let (handle, task) = Call::join(CallConfig::new(role, cpf), collaborators)
        .await
        .context("Failed to join the call")?;
    let mut events = handle.subscribe();
    println!("  commands: {}", COMMANDS.dimmed());
    print_event(&NegotiationEvent::ConnectionStateChanged(
        handle.connection_state(),
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    print_event(&event);
                    if event == NegotiationEvent::ConnectionStateChanged(ConnectionState::Closed) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {} call events", skipped),
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match parse_action(&line) {
                    Some(action) => match handle.send_action(action).await {
                        Err(NegotiationError::CallEnded) => break,
                        other => other?,
                    },
                    None => println!("  unknown command, try: {}", COMMANDS.dimmed()),
                },
                None => {
                    stdin_open = false;
                    let _ = handle.end_call().await;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                if handle.end_call().await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = task.await;
    println!("{}", "👋 Call ended".bold());
    Ok(())
}
