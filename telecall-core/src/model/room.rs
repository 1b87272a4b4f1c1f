use crate::cpf;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const ROOM_PREFIX: &str = "telemedicina_";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomIdError {
    #[error("'{0}' is not a valid CPF")]
    InvalidSecret(String),

    #[error("room id '{0}' must start with 'telemedicina_'")]
    MissingPrefix(String),
}

/// Room a call takes place in, `telemedicina_` followed by the eleven
/// normalized digits of the shared CPF.
///
/// Deserialization does not validate: foreign or malformed ids in inbound
/// messages simply never compare equal to a validated local room.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Derives the room from a shared secret such as `529.982.247-25`.
    pub fn from_secret(secret: &str) -> Result<Self, RoomIdError> {
        if !cpf::is_valid(secret) {
            return Err(RoomIdError::InvalidSecret(secret.to_owned()));
        }
        Ok(Self(format!("{ROOM_PREFIX}{}", cpf::normalize(secret))))
    }

    /// Parses an already derived id, as found in relay URLs.
    pub fn parse(raw: &str) -> Result<Self, RoomIdError> {
        let Some(digits) = raw.strip_prefix(ROOM_PREFIX) else {
            return Err(RoomIdError::MissingPrefix(raw.to_owned()));
        };
        if digits.len() != cpf::CPF_LEN || !cpf::is_valid(digits) {
            return Err(RoomIdError::InvalidSecret(digits.to_owned()));
        }
        Ok(Self(raw.to_owned()))
    }

    /// Accepts either form a user may type: a derived id or the raw secret.
    pub fn resolve(input: &str) -> Result<Self, RoomIdError> {
        let input = input.trim();
        if input.starts_with(ROOM_PREFIX) {
            Self::parse(input)
        } else {
            Self::from_secret(input)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomId {
    type Err = RoomIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
