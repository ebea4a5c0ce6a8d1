use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

use kira::effect::filter::{FilterBuilder, FilterHandle};
use kira::track::{TrackBuilder, TrackHandle};
use kira::{AudioManager as KiraAudioManager, AudioManagerSettings, Mix};

use crate::BGM_CHANNEL_COUNT;

pub struct AudioManager {
    manager: Mutex<KiraAudioManager>,
}

impl Debug for AudioManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioManager").finish()
    }
}

impl AudioManager {
    pub fn new() -> anyhow::Result<Self> {
        // one sub-track per BGM channel plus the SE channel
        let mut settings = AudioManagerSettings::default();
        settings.capacities.sub_track_capacity = BGM_CHANNEL_COUNT + 1;

        let mgr = KiraAudioManager::new(settings)?;
        Ok(Self {
            manager: Mutex::new(mgr),
        })
    }

    /// A fresh sub-track whose single filter stands in for the channel's controls.
    pub fn add_channel_track(&self) -> anyhow::Result<(TrackHandle, FilterHandle)> {
        let mut mgr = self.manager.lock().unwrap_or_else(PoisonError::into_inner);

        let mut builder = TrackBuilder::new();
        let filter = builder.add_effect(FilterBuilder::new().mix(Mix::DRY));
        let track = mgr.add_sub_track(builder)?;
        Ok((track, filter))
    }
}
