use crate::media::MediaConstraints;
use telecall_core::Role;

pub const DEFAULT_DATA_CHANNEL_LABEL: &str = "telemedicina";

/// Everything a single call needs to know before it joins.
#[derive(Debug, Clone)]
pub struct CallConfig {
    pub role: Role,
    /// Shared secret (CPF) or an already derived room id.
    pub room: String,
    pub constraints: MediaConstraints,
    pub data_channel_label: String,
    pub event_capacity: usize,
    pub transport_event_capacity: usize,
}

impl CallConfig {
    pub fn new(role: Role, room: impl Into<String>) -> Self {
        Self {
            role,
            room: room.into(),
            constraints: MediaConstraints::default(),
            data_channel_label: DEFAULT_DATA_CHANNEL_LABEL.to_owned(),
            event_capacity: 64,
            transport_event_capacity: 256,
        }
    }

    pub fn with_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }
}
