use crate::channel::ChannelRefusal;
use crate::negotiator::ConnectionState;
use telecall_core::RoomIdError;
use thiserror::Error;

/// Camera or microphone denied or unavailable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("could not access local media: {reason}")]
pub struct MediaAccessError {
    pub reason: String,
}

impl MediaAccessError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error(transparent)]
    InvalidRoomId(#[from] RoomIdError),

    #[error(transparent)]
    MediaAccess(#[from] MediaAccessError),

    #[error("media transport error: {0:#}")]
    Transport(anyhow::Error),

    #[error("signaling channel error: {0:#}")]
    Channel(anyhow::Error),

    #[error("refused by the signaling channel: {0}")]
    Refused(ChannelRefusal),

    #[error("operation not allowed while {0}")]
    InvalidState(ConnectionState),

    #[error("call has already ended")]
    CallEnded,
}
