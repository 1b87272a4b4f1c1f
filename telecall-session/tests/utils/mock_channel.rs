use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use telecall_core::{IceServerConfig, RoomId, SignalMessage, SignalPayload};
use telecall_session::{ChannelRefusal, SignalingChannel, Subscription};
use tokio::sync::{Mutex, mpsc};

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCall {
    Subscribe(RoomId),
    Send(SignalMessage),
    Unsubscribe(RoomId),
}

/// Signaling channel double that records every call and lets the test
/// push inbound messages into the live subscription.
#[derive(Clone, Default)]
pub struct MockChannel {
    calls: Arc<Mutex<Vec<ChannelCall>>>,
    inbound: Arc<Mutex<Option<mpsc::UnboundedSender<SignalMessage>>>>,
    fail_subscribe: bool,
    refuse_subscribe: Option<ChannelRefusal>,
    ice_servers: Option<Vec<IceServerConfig>>,
    refusal: Arc<std::sync::Mutex<Option<ChannelRefusal>>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_subscribe() -> Self {
        Self {
            fail_subscribe: true,
            ..Self::default()
        }
    }

    /// Turns every subscription away with `refusal`.
    pub fn refusing_subscribe(refusal: ChannelRefusal) -> Self {
        Self {
            refuse_subscribe: Some(refusal),
            ..Self::default()
        }
    }

    /// Hands `servers` out as the room's ICE servers.
    pub fn advertising(servers: Vec<IceServerConfig>) -> Self {
        Self {
            ice_servers: Some(servers),
            ..Self::default()
        }
    }

    pub async fn calls(&self) -> Vec<ChannelCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    pub async fn sent(&self) -> Vec<SignalMessage> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                ChannelCall::Send(msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    /// Payloads sent so far, in order.
    pub async fn sent_payloads(&self) -> Vec<SignalPayload> {
        self.sent().await.into_iter().map(|m| m.payload).collect()
    }

    pub async fn sent_kinds(&self) -> Vec<&'static str> {
        self.sent().await.iter().map(SignalMessage::kind).collect()
    }

    pub async fn is_unsubscribed(&self) -> bool {
        self.calls
            .lock()
            .await
            .iter()
            .any(|c| matches!(c, ChannelCall::Unsubscribe(_)))
    }

    /// Delivers `msg` as if the relay forwarded it. Returns false when
    /// nobody is subscribed.
    pub async fn inject(&self, msg: SignalMessage) -> bool {
        match self.inbound.lock().await.as_ref() {
            Some(tx) => tx.send(msg).is_ok(),
            None => false,
        }
    }

    /// Ends the subscription as if the relay connection dropped.
    pub async fn hang_up(&self) {
        self.inbound.lock().await.take();
    }

    /// Ends the subscription as if the relay turned the participant away.
    pub async fn refuse(&self, refusal: ChannelRefusal) {
        if let Ok(mut slot) = self.refusal.lock() {
            *slot = Some(refusal);
        }
        self.hang_up().await;
    }
}

#[async_trait]
impl SignalingChannel for MockChannel {
    async fn subscribe(&self, room: &RoomId) -> Result<Subscription> {
        self.calls
            .lock()
            .await
            .push(ChannelCall::Subscribe(room.clone()));
        if self.fail_subscribe {
            bail!("mock relay unreachable");
        }
        if let Some(refusal) = self.refuse_subscribe {
            return Err(refusal.into());
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.inbound.lock().await = Some(tx);
        Ok(rx)
    }

    async fn send(&self, _room: &RoomId, message: &SignalMessage) -> Result<()> {
        self.calls
            .lock()
            .await
            .push(ChannelCall::Send(message.clone()));
        Ok(())
    }

    async fn unsubscribe(&self, room: &RoomId) {
        self.calls
            .lock()
            .await
            .push(ChannelCall::Unsubscribe(room.clone()));
        self.inbound.lock().await.take();
    }

    fn ice_servers(&self, _room: &RoomId) -> Option<Vec<IceServerConfig>> {
        self.ice_servers.clone()
    }

    fn take_refusal(&self, _room: &RoomId) -> Option<ChannelRefusal> {
        self.refusal.lock().ok().and_then(|mut slot| slot.take())
    }
}
