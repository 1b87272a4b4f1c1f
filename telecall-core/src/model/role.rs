use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side of a two-party call. The Initiator always offers and opens the
/// data channel; the Responder always answers and accepts it.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "doctor")]
    Initiator,
    #[serde(alias = "patient")]
    Responder,
}

impl Role {
    pub fn opposite(self) -> Self {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Initiator => "initiator",
            Role::Responder => "responder",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "initiator" | "doctor" => Ok(Role::Initiator),
            "responder" | "patient" => Ok(Role::Responder),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}
