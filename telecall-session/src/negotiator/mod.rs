mod candidate_queue;
mod event;
mod negotiator;
mod state;

pub use candidate_queue::*;
pub use event::*;
pub use negotiator::*;
pub use state::*;
