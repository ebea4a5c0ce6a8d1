use fadeplay_core::{approximately, ChannelId, ChannelStatus};
use itertools::Itertools;

use crate::AudioChannel;

// room for a crossfade while another BGM stays paused
pub const BGM_CHANNEL_COUNT: usize = 3;

/// Free for a new fade-in.
///
/// Engines report `Stopped` late after a stop request, so a silent channel
/// counts as free too. This is a heuristic, not an authoritative state.
pub fn is_idle<C: AudioChannel>(channel: &C) -> bool {
    (channel.status() == ChannelStatus::Stopped || approximately(channel.volume(), 0.0))
        && !channel.is_paused()
}

/// Audible at full volume: the candidate for a fade-out.
pub fn is_full_volume<C: AudioChannel>(channel: &C) -> bool {
    channel.status() == ChannelStatus::Playing
        && approximately(channel.volume(), 1.0)
        && !channel.is_paused()
}

pub fn is_paused<C: AudioChannel>(channel: &C) -> bool {
    channel.status() == ChannelStatus::Playing && channel.is_paused()
}

pub fn is_playing<C: AudioChannel>(channel: &C) -> bool {
    channel.status() == ChannelStatus::Playing
}

/// The fixed set of channels: [`BGM_CHANNEL_COUNT`] BGM channels and one SE channel.
///
/// Channels live as long as the pool; selection never creates or drops one.
pub struct ChannelPool<C> {
    bgm: [C; BGM_CHANNEL_COUNT],
    se: C,
}

impl<C: AudioChannel> ChannelPool<C> {
    pub fn new(bgm: [C; BGM_CHANNEL_COUNT], se: C) -> Self {
        Self { bgm, se }
    }

    pub fn from_fn(mut make: impl FnMut(ChannelId) -> C) -> Self {
        let bgm = std::array::from_fn(|index| make(ChannelId::Bgm(index)));
        let se = make(ChannelId::Se);
        Self { bgm, se }
    }

    pub fn get(&self, id: ChannelId) -> &C {
        match id {
            ChannelId::Bgm(index) => &self.bgm[index],
            ChannelId::Se => &self.se,
        }
    }

    pub fn get_mut(&mut self, id: ChannelId) -> &mut C {
        match id {
            ChannelId::Bgm(index) => &mut self.bgm[index],
            ChannelId::Se => &mut self.se,
        }
    }

    pub fn se(&self) -> &C {
        &self.se
    }

    pub fn se_mut(&mut self) -> &mut C {
        &mut self.se
    }

    pub fn bgm_ids(&self) -> impl Iterator<Item = ChannelId> {
        (0..BGM_CHANNEL_COUNT).map(ChannelId::Bgm)
    }

    /// First BGM channel, in pool order, accepted by `predicate`.
    pub fn select(&self, predicate: impl Fn(&C) -> bool) -> Option<ChannelId> {
        self.bgm
            .iter()
            .position(|channel| predicate(channel))
            .map(ChannelId::Bgm)
    }

    pub fn count(&self, predicate: impl Fn(&C) -> bool) -> usize {
        self.bgm.iter().filter(|channel| predicate(channel)).count()
    }

    pub fn set_bgm_cue_sheet(&mut self, bank: &str) {
        for channel in self.bgm.iter_mut() {
            channel.set_cue_sheet(bank);
        }
    }

    pub fn debug_summary(&self) -> String {
        self.bgm_ids()
            .chain(std::iter::once(ChannelId::Se))
            .map(|id| {
                let channel = self.get(id);
                format!(
                    "{}: {:?}{} vol={:.2} sheet={}",
                    id,
                    channel.status(),
                    if channel.is_paused() { " (paused)" } else { "" },
                    channel.volume(),
                    channel.cue_sheet().unwrap_or("-"),
                )
            })
            .join("\n")
    }
}
