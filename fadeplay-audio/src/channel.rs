use fadeplay_core::{ChannelStatus, PlaybackId};

/// One playback slot of the audio engine.
///
/// Implementations only record state; every decision about which channel to
/// use and when is taken by the [`SoundPlayer`](crate::SoundPlayer).
pub trait AudioChannel {
    /// Start `cue_name` from the channel's current cue sheet.
    fn play(&mut self, cue_name: &str) -> anyhow::Result<PlaybackId>;
    fn stop(&mut self);

    fn pause(&mut self, paused: bool);
    fn is_paused(&self) -> bool;

    fn status(&self) -> ChannelStatus;

    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);

    /// Current value of a named continuous control, if it was ever set.
    fn control_value(&self, name: &str) -> Option<f32>;
    fn set_control_value(&mut self, name: &str, value: f32);

    fn cue_sheet(&self) -> Option<&str>;
    fn set_cue_sheet(&mut self, bank: &str);
}
