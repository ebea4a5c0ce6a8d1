//! Glue together `fadeplay-core` and a pool of playback channels to provide
//! BGM crossfading, pausing and resuming with fades, and sound effect playback.

mod channel;
mod config;
mod control;
mod error;
mod fade;
mod loader;
mod player;
mod pool;
mod record;
pub mod sim;

#[cfg(feature = "kira")]
pub mod kira_backend;

pub use channel::AudioChannel;
pub use config::{LoggerConfig, SoundPlayerConfig, SoundPlayerConfigBuilder, SoundPlayerConfigReader};
pub use control::{ActiveControl, ControlCoordinator};
pub use error::{Result, SoundError};
pub use fade::{FadeCallback, FadeFinish, FadeHandle, FadeTarget};
pub use loader::CueIndexLoader;
pub use player::{CrossFadeOptions, SoundPlayer};
pub use pool::{
    is_full_volume, is_idle, is_paused, is_playing, ChannelPool, BGM_CHANNEL_COUNT,
};
pub use record::{BgmRecords, PlaybackRecord, StopRecord};
