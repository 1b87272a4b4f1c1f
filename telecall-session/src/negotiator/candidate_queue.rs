use std::collections::{HashSet, VecDeque};
use telecall_core::IceCandidateData;

#[derive(Debug, PartialEq, Eq)]
pub enum CandidateDisposition {
    Duplicate,
    /// Held until the remote description is applied.
    Queued,
    /// Apply now.
    Ready(IceCandidateData),
}

/// Remote candidates of one call: deduplicated, and held back in arrival
/// order until the remote description is set.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    seen: HashSet<IceCandidateData>,
    pending: VecDeque<IceCandidateData>,
    remote_ready: bool,
}

impl CandidateQueue {
    pub fn accept(&mut self, candidate: IceCandidateData) -> CandidateDisposition {
        if !self.seen.insert(candidate.clone()) {
            return CandidateDisposition::Duplicate;
        }
        if self.remote_ready {
            CandidateDisposition::Ready(candidate)
        } else {
            self.pending.push_back(candidate);
            CandidateDisposition::Queued
        }
    }

    /// Marks the remote description as applied and returns what was held.
    pub fn mark_remote_ready(&mut self) -> Vec<IceCandidateData> {
        self.remote_ready = true;
        self.pending.drain(..).collect()
    }

    pub fn is_remote_ready(&self) -> bool {
        self.remote_ready
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
        self.pending.clear();
        self.remote_ready = false;
    }
}
