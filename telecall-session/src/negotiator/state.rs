use crate::channel::ChannelRefusal;
use crate::media::StreamHandle;
use crate::transport::DataChannelHandle;
use std::fmt;
use telecall_core::{Role, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    AwaitingRemote,
    Connected,
    Disconnected,
    /// Terminal.
    Closed,
}

impl ConnectionState {
    pub fn is_closed(self) -> bool {
        self == ConnectionState::Closed
    }

    /// Status line shown to the participant.
    pub fn status_text(self) -> &'static str {
        match self {
            ConnectionState::Idle => "Not connected",
            ConnectionState::AwaitingRemote => "Waiting for the other participant...",
            ConnectionState::Connected => "Connection established",
            ConnectionState::Disconnected => "Connection lost",
            ConnectionState::Closed => "Call ended",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::AwaitingRemote => "awaiting remote",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Snapshot of one call as the UI sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationState {
    pub role: Role,
    pub room_id: RoomId,
    pub connection_state: ConnectionState,
    pub local_stream: Option<StreamHandle>,
    pub remote_stream: Option<StreamHandle>,
    pub data_channel: Option<DataChannelHandle>,
    pub audio_muted: bool,
    pub video_off: bool,
    /// Set when the signaling channel turned the call away.
    pub refusal: Option<ChannelRefusal>,
}

impl NegotiationState {
    pub fn new(role: Role, room_id: RoomId) -> Self {
        Self {
            role,
            room_id,
            connection_state: ConnectionState::Idle,
            local_stream: None,
            remote_stream: None,
            data_channel: None,
            audio_muted: false,
            video_off: false,
            refusal: None,
        }
    }
}
