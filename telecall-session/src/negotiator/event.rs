use crate::channel::ChannelRefusal;
use crate::media::StreamHandle;
use crate::negotiator::ConnectionState;
use crate::transport::DataChannelHandle;

/// Local user actions. Only `EndCall` is signaled to the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalAction {
    Mute,
    Unmute,
    VideoOff,
    VideoOn,
    EndCall,
}

/// What subscribers (the UI surface) observe about a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationEvent {
    ConnectionStateChanged(ConnectionState),
    /// First signaling message seen from the other role.
    RemoteJoined,
    RemoteTrackAdded(StreamHandle),
    DataChannelOpened(DataChannelHandle),
    LocalMediaChanged { audio_muted: bool, video_off: bool },
    RemoteLeft,
    /// The signaling channel turned the call away; `Closed` follows.
    Refused(ChannelRefusal),
}

impl NegotiationEvent {
    pub fn status_text(&self) -> Option<&'static str> {
        match self {
            NegotiationEvent::ConnectionStateChanged(state) => Some(state.status_text()),
            NegotiationEvent::RemoteTrackAdded(_) => Some("Participant connected"),
            NegotiationEvent::RemoteLeft => Some("Participant disconnected"),
            NegotiationEvent::Refused(_) => Some("Connection refused"),
            _ => None,
        }
    }
}
