use crate::model::peer::PeerId;
use crate::model::role::Role;
use crate::model::signaling::IceServerConfig;
use serde::{Deserialize, Serialize};

/// Frames the relay itself sends, as opposed to forwarded [`SignalMessage`]s.
///
/// [`SignalMessage`]: crate::SignalMessage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelayNotice {
    #[serde(rename_all = "camelCase")]
    Welcome {
        peer_id: PeerId,
        ice_servers: Vec<IceServerConfig>,
    },
    /// Another live connection already speaks for `role` in this room.
    RoleTaken { role: Role },
    /// The connection already holds `held` and tried to speak as `claimed`.
    RoleSwitch { held: Role, claimed: Role },
    /// Both seats of the room are occupied by live connections.
    RoomFull,
}
