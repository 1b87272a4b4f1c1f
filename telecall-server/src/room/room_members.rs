use std::collections::HashMap;
use telecall_core::{PeerId, Role};
use thiserror::Error;
use tokio::sync::mpsc;

/// Most connections one room holds: one per role.
pub const MAX_MEMBERS: usize = 2;

/// What the relay queues for one socket's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("room already has two connections")]
    RoomFull,

    #[error("role {0} is held by another connection")]
    RoleTaken(Role),

    #[error("connection holds {held} and cannot speak as {claimed}")]
    RoleSwitch { held: Role, claimed: Role },

    #[error("connection {0} is not in this room")]
    UnknownPeer(PeerId),
}

struct Member {
    tx: mpsc::UnboundedSender<Outbound>,
    role: Option<Role>,
}

/// Membership table of one room.
#[derive(Default)]
pub struct RoomMembers {
    members: HashMap<PeerId, Member>,
}

impl RoomMembers {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn insert(
        &mut self,
        peer_id: PeerId,
        tx: mpsc::UnboundedSender<Outbound>,
    ) -> Result<(), RelayError> {
        if self.members.len() >= MAX_MEMBERS {
            return Err(RelayError::RoomFull);
        }
        self.members.insert(peer_id, Member { tx, role: None });
        Ok(())
    }

    /// Binds `peer_id` to `role` on first use. The first live claimant of a
    /// role keeps it, and a connection never changes role.
    pub fn claim(&mut self, peer_id: PeerId, role: Role) -> Result<(), RelayError> {
        let taken_by_other = self
            .members
            .iter()
            .any(|(id, m)| *id != peer_id && m.role == Some(role));

        let member = self
            .members
            .get_mut(&peer_id)
            .ok_or(RelayError::UnknownPeer(peer_id))?;

        match member.role {
            Some(held) if held == role => Ok(()),
            Some(held) => Err(RelayError::RoleSwitch {
                held,
                claimed: role,
            }),
            None if taken_by_other => Err(RelayError::RoleTaken(role)),
            None => {
                member.role = Some(role);
                Ok(())
            }
        }
    }

    pub fn role_of(&self, peer_id: &PeerId) -> Option<Role> {
        self.members.get(peer_id).and_then(|m| m.role)
    }

    /// Queues `text` for every member except `from`. Returns how many
    /// members it was queued for.
    pub fn broadcast_except(&self, from: Option<PeerId>, text: &str) -> usize {
        self.members
            .iter()
            .filter(|(id, _)| Some(**id) != from)
            .filter(|(_, m)| m.tx.send(Outbound::Text(text.to_owned())).is_ok())
            .count()
    }

    /// Removes `peer_id`, returning the role it held.
    pub fn remove(&mut self, peer_id: &PeerId) -> Option<Role> {
        self.members.remove(peer_id).and_then(|m| m.role)
    }
}
