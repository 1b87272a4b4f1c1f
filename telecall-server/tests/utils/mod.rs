//! Relay test helpers: a server on an ephemeral port, raw websocket
//! clients, and a transport double for full calls over the relay.


pub use fake_transport::*;
pub use ws_client::*;

use std::net::SocketAddr;
use telecall_core::RoomId;
use telecall_server::{RelayConfig, RelayService, serve_on};
use tokio::net::TcpListener;

pub const CPF: &str = "52998224725";

pub fn room() -> RoomId {
    RoomId::from_secret(CPF).expect("test CPF is valid")
}

/// Starts a relay on `127.0.0.1:0` for the rest of the test.
pub async fn spawn_relay() -> (SocketAddr, RelayService) {
    spawn_relay_with(&RelayConfig::default()).await
}

/// Like [`spawn_relay`], but advertising `config`'s ICE servers. The bind
/// address in `config` is ignored.
pub async fn spawn_relay_with(config: &RelayConfig) -> (SocketAddr, RelayService) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("listener address");
    let service = RelayService::new(config);

    tokio::spawn(serve_on(listener, service.clone(), std::future::pending()));

    (addr, service)
}
