use std::fmt;

/// Coarse status of a playback channel, as reported by the audio engine.
///
/// Engines usually lag behind a `stop()` request, so "stopped" is only one
/// of the signals used to decide whether a channel is free.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ChannelStatus {
    Playing,
    #[default]
    Stopped,
}

/// Identifies one concrete playback started on a channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PlaybackId(pub u32);

/// Identity of a channel slot in the pool.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChannelId {
    /// One of the BGM channels, by pool index.
    Bgm(usize),
    /// The single sound effect channel.
    Se,
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelId::Bgm(index) => write!(f, "bgm#{}", index),
            ChannelId::Se => write!(f, "se"),
        }
    }
}

/// Float comparison used by every volume heuristic.
pub fn approximately(a: f32, b: f32) -> bool {
    let tolerance = (1e-6 * a.abs().max(b.abs())).max(f32::EPSILON * 8.0);
    (b - a).abs() < tolerance
}
