use crate::channel::{ChannelRefusal, SignalingChannel, Subscription};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use telecall_core::{IceServerConfig, RelayNotice, RoomId, SignalMessage};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// How long the relay gets to greet a new connection.
const WELCOME_TIMEOUT: Duration = Duration::from_secs(5);

type Welcome = Result<Vec<IceServerConfig>, ChannelRefusal>;

struct WsConnection {
    outbound: mpsc::UnboundedSender<Message>,
    recv_task: JoinHandle<()>,
    ice_servers: Vec<IceServerConfig>,
}

/// [`SignalingChannel`] over the relay server's websocket endpoint,
/// one socket per subscribed room.
///
/// `subscribe` returns once the relay has welcomed the connection, so the
/// ICE servers it advertises are available through
/// [`SignalingChannel::ice_servers`] right away.
#[derive(Clone)]
pub struct WsChannel {
    base_url: String,
    connections: Arc<DashMap<RoomId, WsConnection>>,
    refusals: Arc<DashMap<RoomId, ChannelRefusal>>,
}

impl WsChannel {
    /// `base_url` is the relay root, e.g. `ws://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            connections: Arc::new(DashMap::new()),
            refusals: Arc::new(DashMap::new()),
        }
    }

    pub fn room_url(&self, room: &RoomId) -> String {
        format!("{}/ws/{}", self.base_url, room)
    }
}

fn refusal_of(notice: RelayNotice) -> Option<ChannelRefusal> {
    match notice {
        RelayNotice::Welcome { .. } => None,
        RelayNotice::RoleTaken { role } => Some(ChannelRefusal::RoleTaken(role)),
        RelayNotice::RoleSwitch { held, claimed } => {
            Some(ChannelRefusal::RoleSwitch { held, claimed })
        }
        RelayNotice::RoomFull => Some(ChannelRefusal::RoomFull),
    }
}

/// Reader side of one relay socket.
struct Reader {
    room: RoomId,
    inbound: mpsc::UnboundedSender<SignalMessage>,
    welcome: Option<oneshot::Sender<Welcome>>,
    refusals: Arc<DashMap<RoomId, ChannelRefusal>>,
}

impl Reader {
    /// Returns false once nobody listens any more.
    fn handle_frame(&mut self, text: &str) -> bool {
        if let Ok(message) = SignalMessage::decode(text) {
            return self.inbound.send(message).is_ok();
        }

        let notice = match serde_json::from_str::<RelayNotice>(text) {
            Ok(notice) => notice,
            Err(e) => {
                warn!("Dropping unreadable relay frame: {}", e);
                return true;
            }
        };

        if let RelayNotice::Welcome {
            peer_id,
            ice_servers,
        } = notice
        {
            info!("Relay accepted connection as {}", peer_id);
            if let Some(tx) = self.welcome.take() {
                let _ = tx.send(Ok(ice_servers));
            }
            return true;
        }

        let Some(refusal) = refusal_of(notice) else {
            return true;
        };
        error!("Relay refused {}: {}", self.room, refusal);
        match self.welcome.take() {
            Some(tx) => {
                let _ = tx.send(Err(refusal));
            }
            None => {
                self.refusals.insert(self.room.clone(), refusal);
            }
        }
        true
    }
}

#[async_trait]
impl SignalingChannel for WsChannel {
    async fn subscribe(&self, room: &RoomId) -> Result<Subscription> {
        if self.connections.contains_key(room) {
            return Err(anyhow!("already subscribed to {}", room));
        }

        let url = self.room_url(room);
        let (stream, _response) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to relay at {url}"))?;
        debug!("Connected to {}", url);

        let (mut sink, mut source) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (inbound, inbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if sink.send(msg).await.is_err() || closing {
                    break;
                }
            }
        });

        let (welcome_tx, welcome_rx) = oneshot::channel();
        let mut reader = Reader {
            room: room.clone(),
            inbound,
            welcome: Some(welcome_tx),
            refusals: self.refusals.clone(),
        };
        self.refusals.remove(room);

        let recv_task = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if !reader.handle_frame(text.as_str()) {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Relay socket error: {}", e);
                        break;
                    }
                }
            }
            debug!("Relay socket closed");
        });

        let welcome = match tokio::time::timeout(WELCOME_TIMEOUT, welcome_rx).await {
            Ok(Ok(welcome)) => welcome.map_err(anyhow::Error::new),
            Ok(Err(_)) => Err(anyhow!("relay closed the connection before welcoming it")),
            Err(_) => Err(anyhow!("no welcome from the relay within {:?}", WELCOME_TIMEOUT)),
        };
        let ice_servers = match welcome {
            Ok(ice_servers) => ice_servers,
            Err(e) => {
                let _ = outbound.send(Message::Close(None));
                recv_task.abort();
                return Err(e);
            }
        };

        self.connections.insert(
            room.clone(),
            WsConnection {
                outbound,
                recv_task,
                ice_servers,
            },
        );

        Ok(inbound_rx)
    }

    async fn send(&self, room: &RoomId, message: &SignalMessage) -> Result<()> {
        let json = message.encode()?;
        let conn = self
            .connections
            .get(room)
            .ok_or_else(|| anyhow!("not subscribed to {}", room))?;
        conn.outbound
            .send(Message::Text(json.into()))
            .map_err(|_| anyhow!("relay connection for {} is gone", room))?;
        Ok(())
    }

    async fn unsubscribe(&self, room: &RoomId) {
        if let Some((_, conn)) = self.connections.remove(room) {
            let _ = conn.outbound.send(Message::Close(None));
            conn.recv_task.abort();
        }
    }

    fn ice_servers(&self, room: &RoomId) -> Option<Vec<IceServerConfig>> {
        self.connections.get(room).map(|conn| conn.ice_servers.clone())
    }

    fn take_refusal(&self, room: &RoomId) -> Option<ChannelRefusal> {
        self.refusals.remove(room).map(|(_, refusal)| refusal)
    }
}
