//! This crate implements the core functionality of the fadeplay sound player
//!
//! This mostly includes the fade scheduler, bank discovery and the cue index.

#![allow(clippy::uninlined_format_args)]

pub mod cue_index;
pub mod format;
pub mod time;
pub mod types;

pub use cue_index::{CueIndex, CueIndexError};
pub use time::{Easing, TweenId, TweenScheduler, TweenUpdate};
pub use types::{approximately, ChannelId, ChannelStatus, PlaybackId};
