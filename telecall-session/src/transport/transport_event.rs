use crate::media::StreamHandle;
use bytes::Bytes;
use telecall_core::IceCandidateData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChannelHandle {
    pub label: String,
}

/// What a transport reports back to the call that owns it.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A local ICE candidate was gathered and must reach the remote peer.
    CandidateGenerated(IceCandidateData),

    StateChanged(TransportState),

    RemoteTrack(StreamHandle),

    /// The data channel is open, whichever side created it.
    DataChannelReady(DataChannelHandle),

    /// Bytes received on the data channel.
    Message(Bytes),
}
