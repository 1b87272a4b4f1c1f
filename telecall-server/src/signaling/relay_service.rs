use crate::config::RelayConfig;
use crate::room::{Outbound, RelayError, RoomMembers};
use dashmap::DashMap;
use std::sync::Arc;
use telecall_core::{IceServerConfig, PeerId, RelayNotice, Role, RoomId, SignalMessage};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// What became of one inbound frame.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Forwarded to this many other connections.
    Forwarded(usize),
    /// Malformed or addressed to another room.
    Dropped,
    /// The sender may not speak as the role it claimed.
    Refused(RelayError),
}

struct RelayInner {
    rooms: DashMap<RoomId, RoomMembers>,
    ice_servers: Vec<IceServerConfig>,
}

/// Room registry of the relay. Cheap to clone; every websocket task holds
/// one.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                rooms: DashMap::new(),
                ice_servers: config.ice_servers.clone(),
            }),
        }
    }

    pub fn welcome(&self, peer_id: PeerId) -> RelayNotice {
        RelayNotice::Welcome {
            peer_id,
            ice_servers: self.inner.ice_servers.clone(),
        }
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    pub fn member_count(&self, room: &RoomId) -> usize {
        self.inner.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    pub fn connect(
        &self,
        room: &RoomId,
        peer_id: PeerId,
        tx: mpsc::UnboundedSender<Outbound>,
    ) -> Result<(), RelayError> {
        let result = self
            .inner
            .rooms
            .entry(room.clone())
            .or_default()
            .insert(peer_id, tx);

        if result.is_ok() {
            info!("Peer {} entered {}", peer_id, room);
        }
        result
    }

    /// Parses, checks and forwards one text frame from `peer_id`.
    pub fn handle_frame(&self, room: &RoomId, peer_id: PeerId, text: &str) -> FrameOutcome {
        let message = match SignalMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Invalid SignalMessage from {}: {}", peer_id, e);
                return FrameOutcome::Dropped;
            }
        };

        if &message.room_id != room {
            warn!(
                "Peer {} sent {} for {} on the {} socket",
                peer_id,
                message.kind(),
                message.room_id,
                room
            );
            return FrameOutcome::Dropped;
        }

        let Some(mut members) = self.inner.rooms.get_mut(room) else {
            error!("Frame from {} for a room that no longer exists", peer_id);
            return FrameOutcome::Dropped;
        };

        if let Err(e) = members.claim(peer_id, message.sender) {
            warn!("Refusing {} from {}: {}", message.kind(), peer_id, e);
            return FrameOutcome::Refused(e);
        }

        let delivered = members.broadcast_except(Some(peer_id), text);
        debug!("Forwarded {} from {} to {} peer(s)", message.kind(), message.sender, delivered);
        FrameOutcome::Forwarded(delivered)
    }

    /// Removes `peer_id`. If it held a role, the rest of the room gets a
    /// `leave` on its behalf. Empty rooms are dropped.
    pub fn disconnect(&self, room: &RoomId, peer_id: PeerId) -> Option<Role> {
        let role = {
            let mut members = self.inner.rooms.get_mut(room)?;
            let role = members.remove(&peer_id);

            if let Some(role) = role {
                match SignalMessage::leave(role, room.clone()).encode() {
                    Ok(leave) => {
                        members.broadcast_except(None, &leave);
                    }
                    Err(e) => error!("Failed to serialize leave: {}", e),
                }
            }
            role
        };

        self.inner
            .rooms
            .remove_if(room, |_, members| members.is_empty());

        info!("Peer {} left {} (role {:?})", peer_id, room, role);
        role
    }
}
