use fadeplay_core::{ChannelId, PlaybackId};

use crate::FadeHandle;

/// The BGM being brought up, or already up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackRecord {
    pub channel: Option<ChannelId>,
    pub fade: Option<FadeHandle>,
    pub playback: Option<PlaybackId>,
    pub cue_name: Option<String>,
}

/// The BGM being brought down or paused.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopRecord {
    pub fade: Option<FadeHandle>,
    pub channel: Option<ChannelId>,
}

impl StopRecord {
    /// Nothing was eligible, so no fade was started.
    pub fn is_empty(&self) -> bool {
        self.channel.is_none()
    }
}

/// The pair of records the orchestrator overwrites on every BGM request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BgmRecords {
    pub play: PlaybackRecord,
    pub stop: StopRecord,
}
