mod transport_config;
mod transport_event;
mod webrtc_transport;

pub use transport_config::*;
pub use transport_event::*;
pub use webrtc_transport::*;

use crate::media::{LocalTrack, StreamHandle};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use telecall_core::{IceCandidateData, IceServerConfig, SessionDescription};
use tokio::sync::mpsc;

/// Peer-connection capabilities the negotiator drives. Notifications
/// (local candidates, state changes, remote tracks, data channel traffic)
/// arrive separately as [`TransportEvent`]s.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn add_track(&self, track: Arc<LocalTrack>, stream: &StreamHandle) -> Result<()>;

    /// Opens the auxiliary data channel. Only the Initiator calls this; the
    /// Responder learns about the channel through `DataChannelReady`.
    async fn create_data_channel(&self, label: &str) -> Result<()>;

    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidateData) -> Result<()>;

    /// Sends over the data channel. Fails while the channel is not open.
    async fn send_data(&self, data: Bytes) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Builds one transport per call, wired to that call's event queue.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// `advertised` holds the ICE servers the signaling channel handed out
    /// for this call, if it handed out any.
    async fn create(
        &self,
        events: mpsc::Sender<TransportEvent>,
        advertised: Option<Vec<IceServerConfig>>,
    ) -> Result<Arc<dyn MediaTransport>>;
}
