mod notice;
mod peer;
mod role;
mod room;
mod signaling;

pub use notice::RelayNotice;
pub use peer::PeerId;
pub use role::Role;
pub use room::{ROOM_PREFIX, RoomId, RoomIdError};
pub use signaling::{
    IceCandidateData, IceServerConfig, SdpType, SessionDescription, SignalMessage, SignalPayload,
};
