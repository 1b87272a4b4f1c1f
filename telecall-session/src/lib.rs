mod call;
mod channel;
mod config;
mod error;
mod media;
mod negotiator;
mod transport;

pub use call::*;
pub use channel::*;
pub use config::*;
pub use error::*;
pub use media::*;
pub use negotiator::*;
pub use transport::*;
