use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use fadeplay_core::{ChannelStatus, PlaybackId};
use kira::effect::filter::FilterHandle;
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle, StaticSoundSettings};
use kira::sound::{PlaybackState, Region};
use kira::track::TrackHandle;
use kira::{Decibels, Mix, Tween};

use super::AudioManager;
use crate::{AudioChannel, ChannelPool};

/// Linear amplitude to the decibel scale kira expects.
fn amplitude_to_decibels(volume: f32) -> Decibels {
    if volume <= 0.001 {
        Decibels::SILENCE
    } else {
        Decibels(20.0 * volume.log10())
    }
}

/// One sub-track of the kira mixer.
///
/// Cues are files named `<root>/<cue sheet>/<cue>.<ext>`. Every control
/// drives the wet mix of the track's filter.
pub struct KiraChannel {
    track: TrackHandle,
    filter: FilterHandle,
    root: PathBuf,
    looping: bool,
    handle: Option<StaticSoundHandle>,
    volume: f32,
    paused: bool,
    cue_sheet: Option<String>,
    controls: BTreeMap<String, f32>,
    next_playback: u32,
}

impl KiraChannel {
    pub fn new(manager: &AudioManager, root: impl Into<PathBuf>, looping: bool) -> anyhow::Result<Self> {
        let (track, filter) = manager.add_channel_track()?;
        Ok(Self {
            track,
            filter,
            root: root.into(),
            looping,
            handle: None,
            volume: 0.0,
            paused: false,
            cue_sheet: None,
            controls: BTreeMap::new(),
            next_playback: 0,
        })
    }

    fn resolve(&self, cue_name: &str) -> anyhow::Result<PathBuf> {
        let sheet = self
            .cue_sheet
            .as_deref()
            .ok_or_else(|| anyhow!("no cue sheet set before playing {}", cue_name))?;

        let pattern = self
            .root
            .join(glob::Pattern::escape(sheet))
            .join(format!("{}.*", glob::Pattern::escape(cue_name)));
        let pattern = pattern.to_string_lossy();

        glob::glob(&pattern)?
            .filter_map(Result::ok)
            .next()
            .ok_or_else(|| anyhow!("no file for cue {} in {}", cue_name, sheet))
    }
}

impl AudioChannel for KiraChannel {
    fn play(&mut self, cue_name: &str) -> anyhow::Result<PlaybackId> {
        let path = self.resolve(cue_name)?;
        let data = StaticSoundData::from_file(&path)
            .with_context(|| format!("loading {}", path.display()))?;

        let loop_region = self.looping.then_some(Region::default());
        let settings = StaticSoundSettings::new()
            .volume(amplitude_to_decibels(self.volume))
            .loop_region(loop_region);

        let handle = self
            .track
            .play(data.with_settings(settings))
            .map_err(|e| anyhow!("failed to play {}: {:?}", cue_name, e))?;
        log::info!("playing {} from {}", cue_name, path.display());

        if let Some(mut old) = self.handle.replace(handle) {
            old.stop(Tween::default());
        }
        self.paused = false;

        let id = PlaybackId(self.next_playback);
        self.next_playback += 1;
        Ok(id)
    }

    fn stop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop(Tween::default());
        }
    }

    fn pause(&mut self, paused: bool) {
        self.paused = paused;
        if let Some(handle) = self.handle.as_mut() {
            if paused {
                handle.pause(Tween::default());
            } else {
                handle.resume(Tween::default());
            }
        }
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn status(&self) -> ChannelStatus {
        match self.handle.as_ref().map(StaticSoundHandle::state) {
            Some(PlaybackState::Stopped) | None => ChannelStatus::Stopped,
            Some(_) => ChannelStatus::Playing,
        }
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(handle) = self.handle.as_mut() {
            handle.set_volume(amplitude_to_decibels(volume), Tween::default());
        }
    }

    fn control_value(&self, name: &str) -> Option<f32> {
        self.controls.get(name).copied()
    }

    fn set_control_value(&mut self, name: &str, value: f32) {
        self.controls.insert(name.to_string(), value);
        self.filter.set_mix(Mix(value), Tween::default());
    }

    fn cue_sheet(&self) -> Option<&str> {
        self.cue_sheet.as_deref()
    }

    fn set_cue_sheet(&mut self, bank: &str) {
        self.cue_sheet = Some(bank.to_string());
    }
}

/// Looping BGM channels and a one-shot SE channel, all reading cues under `root`.
pub fn kira_pool(manager: &AudioManager, root: &Path) -> anyhow::Result<ChannelPool<KiraChannel>> {
    let bgm = [
        KiraChannel::new(manager, root, true)?,
        KiraChannel::new(manager, root, true)?,
        KiraChannel::new(manager, root, true)?,
    ];
    let se = KiraChannel::new(manager, root, false)?;
    Ok(ChannelPool::new(bgm, se))
}
