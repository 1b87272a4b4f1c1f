use crate::model::role::Role;
use crate::model::room::RoomId;
use crate::utils::{DEFAULT_STUN_ADDRS, now_millis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }

    /// Public STUN servers used when nothing else is configured.
    pub fn default_servers() -> Vec<Self> {
        DEFAULT_STUN_ADDRS.iter().map(|url| Self::stun(*url)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// Browser-shaped session description: `{"type": "offer", "sdp": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Browser-shaped ICE candidate (`RTCIceCandidate.toJSON()`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateData {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidateData {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalPayload {
    Join,
    Offer {
        sdp: SessionDescription,
    },
    Answer {
        sdp: SessionDescription,
    },
    IceCandidate {
        candidate: IceCandidateData,
    },
    Leave,
    /// Any tag this version does not know; receivers ignore it.
    #[serde(other)]
    Unknown,
}

impl SignalPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            SignalPayload::Join => "join",
            SignalPayload::Offer { .. } => "offer",
            SignalPayload::Answer { .. } => "answer",
            SignalPayload::IceCandidate { .. } => "ice-candidate",
            SignalPayload::Leave => "leave",
            SignalPayload::Unknown => "unknown",
        }
    }
}

/// One signaling message as it travels over the relay:
///
/// ```json
/// {"type":"offer","sdp":{"type":"offer","sdp":"v=0..."},
///  "sender":"initiator","roomId":"telemedicina_52998224725","timestamp":1700000000000}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalMessage {
    #[serde(flatten)]
    pub payload: SignalPayload,
    pub sender: Role,
    pub room_id: RoomId,
    pub timestamp: u64,
}

impl SignalMessage {
    /// Stamps `payload` with the sender, room and the current time.
    pub fn new(payload: SignalPayload, sender: Role, room_id: RoomId) -> Self {
        Self {
            payload,
            sender,
            room_id,
            timestamp: now_millis(),
        }
    }

    pub fn join(sender: Role, room_id: RoomId) -> Self {
        Self::new(SignalPayload::Join, sender, room_id)
    }

    pub fn leave(sender: Role, room_id: RoomId) -> Self {
        Self::new(SignalPayload::Leave, sender, room_id)
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
