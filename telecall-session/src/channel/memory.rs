use crate::channel::{SignalingChannel, Subscription};
use anyhow::{Result, bail};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use telecall_core::{PeerId, RoomId, SignalMessage};
use tokio::sync::mpsc;
use tracing::{debug, trace};

type Endpoints = DashMap<PeerId, mpsc::UnboundedSender<SignalMessage>>;

/// In-process broadcast bus. Every message published to a room reaches
/// every endpoint subscribed to it, the sender included.
#[derive(Clone, Default)]
pub struct MemoryRelay {
    rooms: Arc<DashMap<RoomId, Endpoints>>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh participant endpoint on this bus.
    pub fn endpoint(&self) -> MemoryChannel {
        MemoryChannel {
            id: PeerId::new(),
            relay: self.clone(),
        }
    }

    pub fn subscriber_count(&self, room: &RoomId) -> usize {
        self.rooms.get(room).map(|r| r.len()).unwrap_or(0)
    }

    fn publish(&self, room: &RoomId, message: &SignalMessage) {
        let Some(endpoints) = self.rooms.get(room) else {
            trace!("No subscribers in {}, dropping {}", room, message.kind());
            return;
        };
        for endpoint in endpoints.iter() {
            let _ = endpoint.value().send(message.clone());
        }
    }

    fn detach(&self, room: &RoomId, id: &PeerId) {
        if let Some(endpoints) = self.rooms.get(room) {
            endpoints.remove(id);
        }
        self.rooms.remove_if(room, |_, endpoints| endpoints.is_empty());
    }
}

/// One participant's view of a [`MemoryRelay`].
#[derive(Clone)]
pub struct MemoryChannel {
    id: PeerId,
    relay: MemoryRelay,
}

impl MemoryChannel {
    pub fn id(&self) -> PeerId {
        self.id
    }
}

#[async_trait]
impl SignalingChannel for MemoryChannel {
    async fn subscribe(&self, room: &RoomId) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.relay
            .rooms
            .entry(room.clone())
            .or_default()
            .insert(self.id, tx);
        debug!("Endpoint {} subscribed to {}", self.id, room);
        Ok(rx)
    }

    async fn send(&self, room: &RoomId, message: &SignalMessage) -> Result<()> {
        let subscribed = self
            .relay
            .rooms
            .get(room)
            .is_some_and(|endpoints| endpoints.contains_key(&self.id));
        if !subscribed {
            bail!("endpoint {} is not subscribed to {}", self.id, room);
        }
        self.relay.publish(room, message);
        Ok(())
    }

    async fn unsubscribe(&self, room: &RoomId) {
        self.relay.detach(room, &self.id);
    }
}
