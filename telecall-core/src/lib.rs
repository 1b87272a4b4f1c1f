pub mod cpf;
pub mod model;
pub mod utils;

pub use model::*;
