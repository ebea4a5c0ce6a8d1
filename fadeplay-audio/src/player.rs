use std::time::Duration;

use fadeplay_core::{ChannelId, CueIndex, PlaybackId, TweenScheduler, TweenUpdate};

use crate::{
    control::{ActiveControl, ControlCoordinator},
    fade::{FadeCallback, FadeCompletion, FadeFinish, FadeHandle, FadeTarget},
    is_full_volume, is_idle, is_paused, is_playing, AudioChannel, BgmRecords, ChannelPool,
    CueIndexLoader, PlaybackRecord, Result, SoundError, SoundPlayerConfig, StopRecord,
    BGM_CHANNEL_COUNT,
};

/// Arguments of [`SoundPlayer::play_with_cross_fade`] besides the cue and control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossFadeOptions {
    pub stop_fade: Duration,
    pub play_fade: Duration,
    /// The caller keeps a paused BGM around on purpose; do not hard-stop it.
    pub paused_source_exists: bool,
    /// Reset the active control when the outgoing channel stops.
    pub should_stop_control: bool,
}

impl Default for CrossFadeOptions {
    fn default() -> Self {
        Self {
            stop_fade: Duration::from_millis(200),
            play_fade: Duration::from_millis(200),
            paused_source_exists: false,
            should_stop_control: true,
        }
    }
}

enum IndexState {
    Loading(CueIndexLoader),
    Ready(CueIndex),
    Failed(String),
}

type Fade<C> = TweenUpdate<FadeTarget, FadeCompletion<C>>;

fn is_audible<C: AudioChannel>(channel: &C) -> bool {
    is_playing(channel) && !channel.is_paused()
}

/// BGM and SE playback over a fixed [`ChannelPool`].
///
/// Every call returns immediately. Fades progress only when the owner calls
/// [`SoundPlayer::update`]; completion callbacks run from there, or
/// synchronously when an interrupting request force-completes them.
pub struct SoundPlayer<C: AudioChannel> {
    pool: ChannelPool<C>,
    index: IndexState,
    fades: TweenScheduler<FadeTarget, FadeCompletion<C>>,
    records: BgmRecords,
    controls: ControlCoordinator,
    config: SoundPlayerConfig,
}

impl<C: AudioChannel> SoundPlayer<C> {
    pub fn new(mut pool: ChannelPool<C>, loader: CueIndexLoader, config: SoundPlayerConfig) -> Self {
        for index in 0..BGM_CHANNEL_COUNT {
            pool.get_mut(ChannelId::Bgm(index))
                .set_control_value(&config.default_control_name, 0.0);
        }

        let mut player = Self {
            pool,
            index: IndexState::Loading(loader),
            fades: TweenScheduler::new(),
            records: BgmRecords::default(),
            controls: ControlCoordinator::new(),
            config,
        };
        player.poll_index();
        player
    }

    pub fn pool(&self) -> &ChannelPool<C> {
        &self.pool
    }

    pub fn channel(&self, id: ChannelId) -> &C {
        self.pool.get(id)
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> &mut C {
        self.pool.get_mut(id)
    }

    pub fn records(&self) -> &BgmRecords {
        &self.records
    }

    pub fn active_control(&self) -> Option<&ActiveControl> {
        self.controls.active()
    }

    pub fn config(&self) -> &SoundPlayerConfig {
        &self.config
    }

    /// Crossfade options using the configured fade times.
    pub fn cross_fade_options(&self) -> CrossFadeOptions {
        CrossFadeOptions {
            stop_fade: self.config.stop_fade(),
            play_fade: self.config.play_fade(),
            ..Default::default()
        }
    }

    pub fn current_playing_cue_name(&self) -> Option<&str> {
        self.records.play.cue_name.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.index, IndexState::Ready(_))
    }

    pub fn running_fades(&self) -> usize {
        self.fades.running_count()
    }

    /// True while the tracked play or stop fade is still animating.
    pub fn is_fading(&self) -> bool {
        [self.records.play.fade, self.records.stop.fade]
            .into_iter()
            .flatten()
            .any(|fade| self.fades.is_playing(fade))
    }

    /// Block until the cue index build has finished.
    pub fn wait_until_ready(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.index, IndexState::Failed(String::new()));
        self.index = match state {
            IndexState::Loading(loader) => match loader.wait() {
                Ok(index) => IndexState::Ready(index),
                Err(e) => IndexState::Failed(e.to_string()),
            },
            other => other,
        };

        match &self.index {
            IndexState::Failed(message) => Err(SoundError::IndexBuild(message.clone())),
            _ => Ok(()),
        }
    }

    fn poll_index(&mut self) {
        let IndexState::Loading(loader) = &self.index else {
            return;
        };

        match loader.try_take() {
            Some(Ok(index)) => {
                tracing::info!("sound player ready, {} cues", index.len());
                self.index = IndexState::Ready(index);
            }
            Some(Err(e)) => {
                tracing::error!("sound player unusable: {e}");
                self.index = IndexState::Failed(e.to_string());
            }
            None => {}
        }
    }

    fn bank_of(&mut self, cue_name: &str) -> Result<String> {
        self.poll_index();
        match &self.index {
            IndexState::Loading(_) => Err(SoundError::NotReady),
            IndexState::Ready(index) => Ok(index.bank_of(cue_name)?.to_string()),
            IndexState::Failed(message) => Err(SoundError::IndexBuild(message.clone())),
        }
    }

    /// Advance every fade by `dt` and run whatever completed.
    pub fn update(&mut self, dt: Duration) {
        self.poll_index();

        for update in self.fades.tick(dt) {
            // an earlier completion in this batch may have force-completed it
            if !update.is_finished() && !self.fades.is_playing(update.id) {
                continue;
            }
            self.apply(update);
        }
    }

    fn apply(&mut self, update: Fade<C>) {
        match &update.target {
            FadeTarget::Volume(channel) => self.pool.get_mut(*channel).set_volume(update.value),
            FadeTarget::Control { channel, name } => {
                self.pool.get_mut(*channel).set_control_value(name, update.value)
            }
            FadeTarget::VolumeAndControl { channel, name } => {
                let channel = self.pool.get_mut(*channel);
                channel.set_control_value(name, update.value);
                channel.set_volume(update.value);
            }
        }

        if let Some(FadeCompletion { finish, callback }) = update.finished {
            self.finish(finish);
            if let Some(callback) = callback {
                callback(self);
            }
        }
    }

    fn finish(&mut self, finish: FadeFinish) {
        match finish {
            FadeFinish::Nothing => {}
            FadeFinish::StopChannel { channel, stop_control } => {
                self.pool.get_mut(channel).stop();
                if stop_control && self.controls.is_owned_by(channel) {
                    if let Some(active) = self.controls.release() {
                        self.pool.get_mut(channel).set_control_value(&active.name, 0.0);
                    }
                }
            }
            FadeFinish::ReleaseControl { channel, name } => {
                self.pool.get_mut(channel).set_control_value(&name, 0.0);
                if self.controls.is_active(&name) {
                    self.controls.release();
                }
            }
            FadeFinish::PauseChannel(channel) => self.pool.get_mut(channel).pause(true),
        }
    }

    fn start_fade(
        &mut self,
        from: f32,
        to: f32,
        duration: Duration,
        target: FadeTarget,
        finish: FadeFinish,
        callback: Option<FadeCallback<C>>,
    ) -> FadeHandle {
        tracing::debug!("fade {:?} {from:.2} -> {to:.2} over {duration:?}", target);
        self.fades.animate(
            from,
            to,
            duration,
            self.config.easing,
            target,
            FadeCompletion { finish, callback },
        )
    }

    /// Fast-forward a fade to its end and run its completion. No-op once completed.
    pub fn complete_fade(&mut self, fade: FadeHandle) {
        if let Some(update) = self.fades.complete(fade) {
            self.apply(update);
        }
    }

    fn complete_record_fades(&mut self) {
        let play = self.records.play.fade;
        let stop = self.records.stop.fade;
        for fade in [play, stop].into_iter().flatten() {
            self.complete_fade(fade);
        }
    }

    fn complete_every_fade(&mut self) {
        // completions may start new fades; those are left running
        for fade in self.fades.running_ids() {
            self.complete_fade(fade);
        }
    }

    pub fn play_bgm(&mut self, cue_name: &str, channel: ChannelId, volume: f32) -> Result<PlaybackId> {
        assert!(!cue_name.is_empty(), "cue name must not be empty");
        assert!(volume >= 0.0, "volume must not be negative");
        assert!(matches!(channel, ChannelId::Bgm(_)), "{channel} is not a BGM channel");

        let bank = self.bank_of(cue_name)?;
        self.prepare_bgm_channel(channel, &bank, volume);
        Ok(self.pool.get_mut(channel).play(cue_name)?)
    }

    pub fn play_bgm_with_control(
        &mut self,
        cue_name: &str,
        control_name: &str,
        channel: ChannelId,
        value: f32,
        volume: f32,
    ) -> Result<PlaybackId> {
        assert!(!cue_name.is_empty(), "cue name must not be empty");
        assert!(!control_name.is_empty(), "control name must not be empty");
        assert!((0.0..=1.0).contains(&value), "control value {value} is outside [0, 1]");
        assert!(volume >= 0.0, "volume must not be negative");
        assert!(matches!(channel, ChannelId::Bgm(_)), "{channel} is not a BGM channel");

        let bank = self.bank_of(cue_name)?;
        self.prepare_bgm_channel(channel, &bank, volume);
        self.pool.get_mut(channel).set_control_value(control_name, value);
        self.controls.claim(control_name, channel);
        Ok(self.pool.get_mut(channel).play(cue_name)?)
    }

    fn prepare_bgm_channel(&mut self, channel: ChannelId, bank: &str, volume: f32) {
        self.pool.get_mut(channel).set_volume(volume);
        if self.pool.get(channel).cue_sheet() != Some(bank) {
            self.pool.set_bgm_cue_sheet(bank);
        }
    }

    pub fn play_se(&mut self, cue_name: &str, volume: f32) -> Result<PlaybackId> {
        assert!(!cue_name.is_empty(), "cue name must not be empty");
        assert!(volume >= 0.0, "volume must not be negative");

        let bank = self.bank_of(cue_name)?;
        let se = self.pool.se_mut();
        se.set_volume(volume);
        if se.cue_sheet() != Some(bank.as_str()) {
            se.set_cue_sheet(&bank);
        }
        Ok(se.play(cue_name)?)
    }

    pub fn stop_se(&mut self) {
        self.pool.se_mut().stop();
    }

    /// Hard-stop `channel`, or the first playing BGM channel that is not paused.
    pub fn stop_bgm_immediately(&mut self, channel: Option<ChannelId>) -> Option<ChannelId> {
        let Some(channel) = channel.or_else(|| self.pool.select(is_audible)) else {
            tracing::warn!("stop requested but no BGM is playing");
            return None;
        };
        let channel_ref = self.pool.get_mut(channel);
        channel_ref.pause(false);
        channel_ref.stop();
        Some(channel)
    }

    /// Reset `control_name` to 0 and release it.
    pub fn stop_control_immediately(&mut self, control_name: &str, channel: Option<ChannelId>) {
        assert!(!control_name.is_empty(), "control name must not be empty");

        match channel.or_else(|| self.pool.select(is_playing)) {
            Some(channel) => self.pool.get_mut(channel).set_control_value(control_name, 0.0),
            None => tracing::warn!("no playing BGM to reset {control_name} on"),
        }
        if self.controls.is_active(control_name) {
            self.controls.release();
        }
    }

    pub fn pause_immediately(&mut self, channel: Option<ChannelId>) -> Option<ChannelId> {
        let channel = channel.or_else(|| self.pool.select(is_audible))?;
        self.pool.get_mut(channel).pause(true);
        Some(channel)
    }

    /// Unpause and hard-stop `channel`, or the first paused BGM channel.
    pub fn stop_pause(&mut self, channel: Option<ChannelId>) -> Option<ChannelId> {
        let channel = channel.or_else(|| self.pool.select(is_paused))?;
        tracing::debug!("dropping paused BGM on {channel}");
        let channel_ref = self.pool.get_mut(channel);
        channel_ref.pause(false);
        channel_ref.stop();
        Some(channel)
    }

    pub fn resume_immediately(&mut self) -> Result<ChannelId> {
        let channel = self.pool.select(is_paused).ok_or(SoundError::NoPausedChannel)?;
        self.pool.get_mut(channel).pause(false);
        Ok(channel)
    }

    /// Start `cue_name` silent on `channel` (or an idle one) and fade its volume up.
    pub fn play_with_fade_in(
        &mut self,
        cue_name: &str,
        channel: Option<ChannelId>,
        callback: Option<FadeCallback<C>>,
        fade_time: Duration,
    ) -> Result<PlaybackRecord> {
        let channel = self.select_idle(channel)?;
        let playback = self.play_bgm(cue_name, channel, 0.0)?;
        let fade = self.start_fade(
            0.0,
            1.0,
            fade_time,
            FadeTarget::Volume(channel),
            FadeFinish::Nothing,
            callback,
        );

        Ok(PlaybackRecord {
            channel: Some(channel),
            fade: Some(fade),
            playback: Some(playback),
            cue_name: Some(cue_name.to_string()),
        })
    }

    /// Like [`Self::play_with_fade_in`], driving `control_name` together with the volume.
    pub fn play_with_fade_in_with_control(
        &mut self,
        cue_name: &str,
        control_name: &str,
        channel: Option<ChannelId>,
        callback: Option<FadeCallback<C>>,
        fade_time: Duration,
    ) -> Result<PlaybackRecord> {
        let channel = self.select_idle(channel)?;
        let playback = self.play_bgm_with_control(cue_name, control_name, channel, 0.0, 0.0)?;
        let fade = self.start_fade(
            0.0,
            1.0,
            fade_time,
            FadeTarget::VolumeAndControl {
                channel,
                name: control_name.to_string(),
            },
            FadeFinish::Nothing,
            callback,
        );

        Ok(PlaybackRecord {
            channel: Some(channel),
            fade: Some(fade),
            playback: Some(playback),
            cue_name: Some(cue_name.to_string()),
        })
    }

    fn select_idle(&self, channel: Option<ChannelId>) -> Result<ChannelId> {
        match channel {
            Some(channel) => Ok(channel),
            None => {
                let channel = self.pool.select(is_idle).ok_or(SoundError::NoIdleChannel)?;
                tracing::debug!("selected idle {channel}");
                Ok(channel)
            }
        }
    }

    /// Fade `channel` (or the audible BGM) to silence, then stop it.
    ///
    /// Returns an empty record when nothing is eligible.
    pub fn stop_with_fade_out(
        &mut self,
        channel: Option<ChannelId>,
        callback: Option<FadeCallback<C>>,
        fade_time: Duration,
        stop_control: bool,
    ) -> StopRecord {
        let Some(channel) = channel.or_else(|| self.pool.select(is_full_volume)) else {
            tracing::warn!("fade out requested but no BGM is audible");
            return StopRecord::default();
        };

        let from = self.pool.get(channel).volume();
        let fade = self.start_fade(
            from,
            0.0,
            fade_time,
            FadeTarget::Volume(channel),
            FadeFinish::StopChannel { channel, stop_control },
            callback,
        );
        StopRecord {
            fade: Some(fade),
            channel: Some(channel),
        }
    }

    /// Fade only `control_name` down to 0 and release it, leaving the volume alone.
    pub fn stop_control_with_fade_out(
        &mut self,
        control_name: &str,
        channel: Option<ChannelId>,
        callback: Option<FadeCallback<C>>,
        fade_time: Duration,
    ) -> StopRecord {
        assert!(!control_name.is_empty(), "control name must not be empty");

        let Some(channel) = channel.or_else(|| self.pool.select(is_full_volume)) else {
            tracing::warn!("no audible BGM to fade {control_name} out on");
            return StopRecord::default();
        };

        let from = self.pool.get(channel).control_value(control_name).unwrap_or(1.0);
        let fade = self.start_fade(
            from,
            0.0,
            fade_time,
            FadeTarget::Control {
                channel,
                name: control_name.to_string(),
            },
            FadeFinish::ReleaseControl {
                channel,
                name: control_name.to_string(),
            },
            callback,
        );
        StopRecord {
            fade: Some(fade),
            channel: Some(channel),
        }
    }

    /// Fade `channel` (or the audible BGM) to silence, then pause it in place.
    pub fn pause_with_fade_out(&mut self, channel: Option<ChannelId>, fade_time: Duration) -> StopRecord {
        let Some(channel) = channel.or_else(|| self.pool.select(is_full_volume)) else {
            tracing::warn!("pause requested but no BGM is audible");
            return StopRecord::default();
        };

        let from = self.pool.get(channel).volume();
        let fade = self.start_fade(
            from,
            0.0,
            fade_time,
            FadeTarget::Volume(channel),
            FadeFinish::PauseChannel(channel),
            None,
        );
        StopRecord {
            fade: Some(fade),
            channel: Some(channel),
        }
    }

    /// Unpause the paused BGM and fade it back up.
    pub fn resume_with_fade_in(&mut self, cue_name: &str, fade_time: Duration) -> Result<PlaybackRecord> {
        let channel = self.resume_immediately()?;
        let from = self.pool.get(channel).volume();
        let fade = self.start_fade(
            from,
            1.0,
            fade_time,
            FadeTarget::Volume(channel),
            FadeFinish::Nothing,
            None,
        );

        Ok(PlaybackRecord {
            channel: Some(channel),
            fade: Some(fade),
            playback: None,
            cue_name: Some(cue_name.to_string()),
        })
    }

    /// Fade the current BGM out and `cue_name` in.
    ///
    /// Requesting the cue that is already playing only adjusts the control.
    /// A request arriving while the previous crossfade is still running
    /// completes it first and reuses the channel that was fading out.
    pub fn play_with_cross_fade(
        &mut self,
        cue_name: &str,
        control_name: Option<&str>,
        options: CrossFadeOptions,
    ) -> Result<()> {
        assert!(!cue_name.is_empty(), "cue name must not be empty");

        if self.current_playing_cue_name() == Some(cue_name) {
            self.on_same_bgm(control_name, &options);
            return Ok(());
        }

        self.bank_of(cue_name)?;

        // a stale paused BGM is dropped and its channel counts as free
        let dropped = if options.paused_source_exists {
            None
        } else {
            self.pool.select(is_paused)
        };

        if self.is_fading() {
            tracing::info!("crossfade to {cue_name} interrupts running fades");
            self.complete_record_fades();

            let stopping = self.records.play.channel.or_else(|| self.pool.select(is_full_volume));
            let recycled = self.reusable_channel(self.records.stop.channel, stopping, dropped);
            let target = self.incoming_channel(recycled, stopping, dropped)?;

            if let Some(channel) = dropped {
                self.stop_pause(Some(channel));
            }
            self.records.stop = self.stop_with_fade_out(stopping, None, options.stop_fade, true);
            self.records.play = self.fade_in(cue_name, control_name, target, options.play_fade)?;
        } else {
            tracing::info!("crossfade to {cue_name}");
            let stopping = self.pool.select(is_full_volume);
            let target = self.incoming_channel(None, stopping, dropped)?;

            if let Some(channel) = dropped {
                self.stop_pause(Some(channel));
            }
            let stop_control = control_name.is_none() && options.should_stop_control;
            self.records.stop = self.stop_with_fade_out(stopping, None, options.stop_fade, stop_control);
            self.records.play = self.fade_in(cue_name, control_name, target, options.play_fade)?;
        }
        Ok(())
    }

    fn fade_in(
        &mut self,
        cue_name: &str,
        control_name: Option<&str>,
        channel: ChannelId,
        fade_time: Duration,
    ) -> Result<PlaybackRecord> {
        match control_name {
            Some(control_name) => {
                self.play_with_fade_in_with_control(cue_name, control_name, Some(channel), None, fade_time)
            }
            None => self.play_with_fade_in(cue_name, Some(channel), None, fade_time),
        }
    }

    // The channel that just finished fading out, unless it is now the one
    // being stopped or it holds a paused BGM that stays.
    fn reusable_channel(
        &self,
        previous: Option<ChannelId>,
        stopping: Option<ChannelId>,
        dropped: Option<ChannelId>,
    ) -> Option<ChannelId> {
        previous.filter(|&channel| {
            Some(channel) != stopping && (!self.pool.get(channel).is_paused() || Some(channel) == dropped)
        })
    }

    /// Channel the incoming BGM of a crossfade goes to, decided before anything is touched.
    fn incoming_channel(
        &self,
        recycled: Option<ChannelId>,
        stopping: Option<ChannelId>,
        dropped: Option<ChannelId>,
    ) -> Result<ChannelId> {
        if let Some(channel) = recycled {
            return Ok(channel);
        }
        let channel = self
            .pool
            .bgm_ids()
            .filter(|&id| Some(id) != stopping)
            .find(|&id| Some(id) == dropped || is_idle(self.pool.get(id)))
            .ok_or(SoundError::NoIdleChannel)?;
        tracing::debug!("selected idle {channel}");
        Ok(channel)
    }

    fn on_same_bgm(&mut self, control_name: Option<&str>, options: &CrossFadeOptions) {
        match control_name {
            None => {
                let Some(active) = self.controls.active().cloned() else {
                    return;
                };
                tracing::debug!("same BGM without control, fading {} out", active.name);
                self.stop_control_with_fade_out(&active.name, Some(active.channel), None, options.stop_fade);
            }
            Some(name) if self.controls.is_active(name) => {
                tracing::debug!("same BGM, {name} already active");
            }
            Some(name) => {
                let Some(channel) = self.records.play.channel else {
                    return;
                };
                // the record holds one fade; land the volume fade-in first
                if let Some(fade) = self.records.play.fade {
                    self.complete_fade(fade);
                }
                if let Some(previous) = self.controls.claim(name, channel) {
                    self.pool.get_mut(previous.channel).set_control_value(&previous.name, 0.0);
                }

                self.pool.get_mut(channel).set_control_value(name, 0.0);
                let fade = self.start_fade(
                    0.0,
                    1.0,
                    options.play_fade,
                    FadeTarget::Control {
                        channel,
                        name: name.to_string(),
                    },
                    FadeFinish::Nothing,
                    None,
                );
                self.records.play.fade = Some(fade);
            }
        }
    }

    /// Like a crossfade, but the outgoing BGM is paused so it can be resumed later.
    pub fn pause_and_play(&mut self, cue_name: &str, stop_fade: Duration, play_fade: Duration) -> Result<()> {
        assert!(!cue_name.is_empty(), "cue name must not be empty");

        if self.current_playing_cue_name() == Some(cue_name) {
            tracing::debug!("{cue_name} is already playing");
            return Ok(());
        }

        self.bank_of(cue_name)?;

        let (stopping, target) = if self.is_fading() {
            self.complete_record_fades();

            let stopping = self.records.play.channel.or_else(|| self.pool.select(is_full_volume));
            let recycled = self.reusable_channel(self.records.stop.channel, stopping, None);
            (stopping, self.incoming_channel(recycled, stopping, None)?)
        } else {
            let stopping = self.pool.select(is_full_volume);
            (stopping, self.incoming_channel(None, stopping, None)?)
        };

        self.records.stop = self.pause_with_fade_out(stopping, stop_fade);
        self.records.play = self.play_with_fade_in(cue_name, Some(target), None, play_fade)?;
        Ok(())
    }

    /// Fade the current BGM out and bring the paused one, `cue_name`, back.
    pub fn stop_and_resume(&mut self, cue_name: &str, stop_fade: Duration, play_fade: Duration) -> Result<()> {
        assert!(!cue_name.is_empty(), "cue name must not be empty");

        self.complete_record_fades();
        if self.pool.select(is_paused).is_none() {
            return Err(SoundError::NoPausedChannel);
        }

        self.records.stop = self.stop_with_fade_out(None, None, stop_fade, true);
        self.records.play = self.resume_with_fade_in(cue_name, play_fade)?;
        Ok(())
    }

    /// Fade out the audible BGM and silence everything else.
    pub fn reset_all_sources(&mut self) {
        self.complete_every_fade();

        let stop = self.stop_with_fade_out(None, None, self.config.stop_fade(), true);

        for index in 0..BGM_CHANNEL_COUNT {
            let id = ChannelId::Bgm(index);
            if Some(id) == stop.channel {
                continue;
            }

            let channel = self.pool.get_mut(id);
            channel.pause(false);
            channel.stop();
            channel.set_volume(0.0);

            if self.controls.is_owned_by(id) {
                if let Some(active) = self.controls.release() {
                    self.pool.get_mut(id).set_control_value(&active.name, 0.0);
                }
            }
        }

        self.records = BgmRecords {
            play: PlaybackRecord::default(),
            stop,
        };
    }
}
