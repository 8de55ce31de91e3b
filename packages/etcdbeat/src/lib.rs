pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod model;
pub mod publisher;
pub mod scheduler;

pub use scheduler::{BeatState, Etcdbeat, StopHandle};

/// Process name, also used as the `type` of every published event.
pub const BEAT_NAME: &str = "etcdbeat";
