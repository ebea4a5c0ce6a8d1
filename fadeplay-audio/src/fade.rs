use fadeplay_core::{ChannelId, TweenId};

use crate::{AudioChannel, SoundPlayer};

pub type FadeHandle = TweenId;

/// Runs once when a fade completes, naturally or forced, with the player that owns it.
pub type FadeCallback<C> = Box<dyn FnOnce(&mut SoundPlayer<C>)>;

/// What a fade writes on every tick.
#[derive(Debug, Clone, PartialEq)]
pub enum FadeTarget {
    Volume(ChannelId),
    Control { channel: ChannelId, name: String },
    VolumeAndControl { channel: ChannelId, name: String },
}

impl FadeTarget {
    pub fn channel(&self) -> ChannelId {
        match self {
            FadeTarget::Volume(channel) => *channel,
            FadeTarget::Control { channel, .. } => *channel,
            FadeTarget::VolumeAndControl { channel, .. } => *channel,
        }
    }
}

/// State change applied to the channel once the fade reaches its end value.
#[derive(Debug, Clone, PartialEq)]
pub enum FadeFinish {
    Nothing,
    /// Hard stop; with `stop_control`, also reset the control owned by this channel.
    StopChannel { channel: ChannelId, stop_control: bool },
    ReleaseControl { channel: ChannelId, name: String },
    PauseChannel(ChannelId),
}

pub(crate) struct FadeCompletion<C: AudioChannel> {
    pub(crate) finish: FadeFinish,
    pub(crate) callback: Option<FadeCallback<C>>,
}
