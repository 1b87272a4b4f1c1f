mod memory;
mod ws;

pub use memory::*;
pub use ws::*;

use anyhow::Result;
use async_trait::async_trait;
use telecall_core::{IceServerConfig, Role, RoomId, SignalMessage};
use thiserror::Error;
use tokio::sync::mpsc;

/// Inbound messages of one room, in arrival order.
pub type Subscription = mpsc::UnboundedReceiver<SignalMessage>;

/// Why the far end of a channel turned this participant away.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRefusal {
    #[error("role {0} is already taken in this room")]
    RoleTaken(Role),

    #[error("this connection already speaks as {held} and cannot speak as {claimed}")]
    RoleSwitch { held: Role, claimed: Role },

    #[error("room is full")]
    RoomFull,
}

/// Room-scoped publish/subscribe medium between the two participants.
///
/// Delivery is best effort and may echo a participant's own messages back
/// to it; receivers filter by sender and room.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// A refusal at admission time is returned as a [`ChannelRefusal`]
    /// inside the error.
    async fn subscribe(&self, room: &RoomId) -> Result<Subscription>;

    async fn send(&self, room: &RoomId, message: &SignalMessage) -> Result<()>;

    /// Stops delivery to this participant. Idempotent.
    async fn unsubscribe(&self, room: &RoomId);

    /// ICE servers the channel learned for `room` while subscribing, if any.
    fn ice_servers(&self, _room: &RoomId) -> Option<Vec<IceServerConfig>> {
        None
    }

    /// Takes the reason a live subscription to `room` was cut, if it was
    /// refused rather than closed.
    fn take_refusal(&self, _room: &RoomId) -> Option<ChannelRefusal> {
        None
    }
}
