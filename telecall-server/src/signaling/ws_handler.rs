use crate::room::{Outbound, RelayError};
use crate::signaling::{FrameOutcome, RelayService};
use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use telecall_core::{PeerId, RelayNotice, RoomId};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// How long a closing socket gets to flush queued frames.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    State(service): State<RelayService>,
) -> Response {
    let room = match RoomId::parse(&room_id) {
        Ok(room) => room,
        Err(e) => {
            warn!("Rejecting websocket for '{}': {}", room_id, e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, room, service))
}

fn notice_text(notice: &RelayNotice) -> Option<String> {
    match serde_json::to_string(notice) {
        Ok(json) => Some(json),
        Err(e) => {
            error!("Failed to serialize relay notice: {}", e);
            None
        }
    }
}

/// What a connection is told before it is dropped for `err`.
fn refusal_notice(err: &RelayError) -> Option<RelayNotice> {
    match *err {
        RelayError::RoleTaken(role) => Some(RelayNotice::RoleTaken { role }),
        RelayError::RoleSwitch { held, claimed } => {
            Some(RelayNotice::RoleSwitch { held, claimed })
        }
        RelayError::RoomFull => Some(RelayNotice::RoomFull),
        RelayError::UnknownPeer(_) => None,
    }
}

async fn handle_socket(socket: WebSocket, room: RoomId, service: RelayService) {
    let peer_id = PeerId::new();
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    if let Err(e) = service.connect(&room, peer_id, tx.clone()) {
        warn!("Refusing connection to {}: {}", room, e);
        if let Some(json) = refusal_notice(&e).as_ref().and_then(notice_text) {
            let _ = sender.send(Message::Text(json.into())).await;
        }
        let _ = sender.send(Message::Close(None)).await;
        return;
    }

    info!("New WebSocket connection: {} in {}", peer_id, room);
    if let Some(json) = notice_text(&service.welcome(peer_id)) {
        let _ = tx.send(Outbound::Text(json));
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(out) = rx.recv().await {
            let (msg, closing) = match out {
                Outbound::Text(text) => (Message::Text(text.into()), false),
                Outbound::Close => (Message::Close(None), true),
            };
            if sender.send(msg).await.is_err() || closing {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let room = room.clone();
        let tx = tx.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        let FrameOutcome::Refused(err) =
                            service.handle_frame(&room, peer_id, text.as_str())
                        else {
                            continue;
                        };

                        if let Some(json) = refusal_notice(&err).as_ref().and_then(notice_text) {
                            let _ = tx.send(Outbound::Text(json));
                        }
                        break;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => {},
    };

    service.disconnect(&room, peer_id);

    let _ = tx.send(Outbound::Close);
    drop(tx);
    if tokio::time::timeout(CLOSE_GRACE, &mut send_task)
        .await
        .is_err()
    {
        send_task.abort();
    }

    info!("WebSocket disconnected: {}", peer_id);
}
