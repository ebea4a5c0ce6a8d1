//! Channels backed by kira sub-tracks.

mod channel;
mod manager;

pub use channel::{kira_pool, KiraChannel};
pub use manager::AudioManager;
