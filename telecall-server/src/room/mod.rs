mod room_members;

pub use room_members::*;
