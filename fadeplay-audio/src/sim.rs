//! A channel that only keeps state. Used by the tests and the driver binary.

use std::collections::BTreeMap;

use fadeplay_core::{ChannelStatus, PlaybackId};

use crate::AudioChannel;

#[derive(Debug, Clone, Default)]
pub struct SimChannel {
    status: ChannelStatus,
    volume: f32,
    paused: bool,
    cue_sheet: Option<String>,
    controls: BTreeMap<String, f32>,
    current_cue: Option<String>,
    played: Vec<String>,
    next_playback: u32,
}

impl SimChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cue started by the last `play`, cleared by `stop`.
    pub fn current_cue(&self) -> Option<&str> {
        self.current_cue.as_deref()
    }

    /// Every cue ever started on this channel, in order.
    pub fn played(&self) -> &[String] {
        &self.played
    }
}

impl AudioChannel for SimChannel {
    fn play(&mut self, cue_name: &str) -> anyhow::Result<PlaybackId> {
        anyhow::ensure!(
            self.cue_sheet.is_some(),
            "no cue sheet set before playing {}",
            cue_name
        );

        self.status = ChannelStatus::Playing;
        self.paused = false;
        self.current_cue = Some(cue_name.to_string());
        self.played.push(cue_name.to_string());

        let id = PlaybackId(self.next_playback);
        self.next_playback += 1;
        Ok(id)
    }

    fn stop(&mut self) {
        self.status = ChannelStatus::Stopped;
        self.current_cue = None;
    }

    fn pause(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn status(&self) -> ChannelStatus {
        self.status
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn control_value(&self, name: &str) -> Option<f32> {
        self.controls.get(name).copied()
    }

    fn set_control_value(&mut self, name: &str, value: f32) {
        self.controls.insert(name.to_string(), value);
    }

    fn cue_sheet(&self) -> Option<&str> {
        self.cue_sheet.as_deref()
    }

    fn set_cue_sheet(&mut self, bank: &str) {
        self.cue_sheet = Some(bank.to_string());
    }
}
