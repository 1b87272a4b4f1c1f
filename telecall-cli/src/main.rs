mod call;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::net::SocketAddr;
use telecall_core::{IceServerConfig, Role, RoomId, cpf};
use telecall_server::{DEFAULT_BIND, RelayConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "telecall")]
#[command(about = "Two-party telemedicine calls over WebRTC")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Relay {
        #[arg(long, env = "TELECALL_BIND", default_value = DEFAULT_BIND)]
        bind: SocketAddr,

        /// ICE server advertised to clients, as `url` or
        /// `url,username,credential` for TURN. Repeatable.
        #[arg(long = "ice-server", value_parser = parse_ice_server)]
        ice_servers: Vec<IceServerConfig>,
    },

    /// Join a call as doctor (initiator) or patient (responder).
    Call {
        #[arg(long, env = "TELECALL_RELAY_URL", default_value = "ws://127.0.0.1:8080")]
        relay: String,

        /// Patient CPF. Prompted for when missing.
        #[arg(long)]
        cpf: Option<String>,

        /// `initiator`/`doctor` or `responder`/`patient`.
        #[arg(long)]
        role: Option<Role>,

        /// Gather host candidates only, ignoring the relay's ICE servers.
        #[arg(long)]
        local_only: bool,
    },

    /// Print the room a CPF maps to.
    Room { cpf: String },
}

fn parse_ice_server(arg: &str) -> Result<IceServerConfig, String> {
    let parts: Vec<&str> = arg.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [url] if !url.is_empty() => Ok(IceServerConfig::stun(*url)),
        [url, username, credential] if !url.is_empty() => Ok(IceServerConfig {
            urls: vec![(*url).to_owned()],
            username: Some((*username).to_owned()),
            credential: Some((*credential).to_owned()),
        }),
        _ => Err(format!(
            "expected `url` or `url,username,credential`, got `{arg}`"
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Relay { bind, ice_servers } => {
            let ice_servers = if ice_servers.is_empty() {
                IceServerConfig::default_servers()
            } else {
                ice_servers
            };

            println!("{}", "📡 Starting signaling relay...".green().bold());
            telecall_server::serve(RelayConfig { bind, ice_servers }).await?;
        }
        Commands::Call {
            relay,
            cpf,
            role,
            local_only,
        } => {
            call::run(call::CallArgs {
                relay,
                cpf,
                role,
                local_only,
            })
            .await?;
        }
        Commands::Room { cpf: input } => {
            let room = RoomId::from_secret(&input).context("Cannot derive a room")?;
            let masked = cpf::format(&input).unwrap_or(input);
            println!("{} {}", "CPF: ".cyan(), masked);
            println!("{} {}", "Room:".cyan(), room.to_string().bold());
        }
    }

    Ok(())
}
