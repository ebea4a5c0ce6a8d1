use std::cell::Cell;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Result;
use pretty_assertions::assert_eq;

use fadeplay_audio::sim::SimChannel;
use fadeplay_audio::{
    AudioChannel, ChannelPool, CrossFadeOptions, CueIndexLoader, FadeCallback, SoundError,
    SoundPlayer, SoundPlayerConfig, StopRecord,
};
use fadeplay_core::format::{BankSource, MemoryBankSource};
use fadeplay_core::{approximately, ChannelId, ChannelStatus, CueIndex, CueIndexError};

const FADE: Duration = Duration::from_millis(200);

const BGM0: ChannelId = ChannelId::Bgm(0);
const BGM1: ChannelId = ChannelId::Bgm(1);
const BGM2: ChannelId = ChannelId::Bgm(2);

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn banks() -> MemoryBankSource {
    MemoryBankSource::new()
        .with_bank("bgm", ["title", "field", "battle", "town"])
        .with_bank("event", ["ending"])
        .with_bank("se", ["click"])
}

fn player() -> Result<SoundPlayer<SimChannel>> {
    let index = CueIndex::build(&banks())?;
    Ok(SoundPlayer::new(
        ChannelPool::from_fn(|_| SimChannel::new()),
        CueIndexLoader::ready(index),
        SoundPlayerConfig::default(),
    ))
}

/// A player with `cue` fully faded in on the first BGM channel.
fn playing(cue: &str) -> Result<SoundPlayer<SimChannel>> {
    let mut p = player()?;
    p.play_with_cross_fade(cue, None, CrossFadeOptions::default())?;
    p.update(FADE);
    assert_eq!(p.channel(BGM0).volume(), 1.0);
    Ok(p)
}

#[test]
fn fade_in_on_idle_pool_uses_first_channel() -> Result<()> {
    let mut p = player()?;
    let fired = Rc::new(Cell::new(false));
    let done = fired.clone();
    let callback: FadeCallback<SimChannel> = Box::new(move |_: &mut SoundPlayer<SimChannel>| done.set(true));

    let record = p.play_with_fade_in("title", None, Some(callback), FADE)?;
    assert_eq!(record.channel, Some(BGM0));
    assert_eq!(record.cue_name.as_deref(), Some("title"));
    assert_eq!(p.channel(BGM0).volume(), 0.0);
    assert_eq!(p.channel(BGM0).current_cue(), Some("title"));

    p.update(ms(100));
    assert!(approximately(p.channel(BGM0).volume(), 0.5));
    assert!(!fired.get());

    p.update(ms(100));
    assert!(fired.get());
    assert_eq!(p.channel(BGM0).volume(), 1.0);
    assert_eq!(p.channel(BGM0).status(), ChannelStatus::Playing);
    assert_eq!(p.running_fades(), 0);
    Ok(())
}

#[test]
fn fade_out_with_nothing_audible_is_a_no_op() -> Result<()> {
    let mut p = player()?;
    let record = p.stop_with_fade_out(None, None, FADE, true);

    assert_eq!(record, StopRecord::default());
    assert!(record.is_empty());
    assert_eq!(p.running_fades(), 0);
    for id in p.pool().bgm_ids() {
        assert_eq!(p.channel(id).status(), ChannelStatus::Stopped);
        assert_eq!(p.channel(id).volume(), 0.0);
    }
    Ok(())
}

#[test]
fn repeated_crossfade_to_same_cue_starts_nothing() -> Result<()> {
    let mut p = player()?;
    p.play_with_cross_fade("title", None, CrossFadeOptions::default())?;
    let records = p.records().clone();
    assert_eq!(p.running_fades(), 1);

    p.play_with_cross_fade("title", None, CrossFadeOptions::default())?;
    assert_eq!(p.records(), &records);
    assert_eq!(p.running_fades(), 1);
    assert_eq!(p.channel(BGM0).played(), ["title"]);
    Ok(())
}

#[test]
fn crossfade_moves_to_an_idle_channel() -> Result<()> {
    let mut p = playing("title")?;
    p.play_with_cross_fade("field", None, CrossFadeOptions::default())?;

    assert_eq!(p.records().stop.channel, Some(BGM0));
    assert_eq!(p.records().play.channel, Some(BGM1));

    p.update(ms(50));
    assert!(approximately(p.channel(BGM0).volume(), 0.75));
    assert!(approximately(p.channel(BGM1).volume(), 0.25));

    p.update(ms(150));
    assert_eq!(p.channel(BGM0).status(), ChannelStatus::Stopped);
    assert_eq!(p.channel(BGM1).volume(), 1.0);
    assert_eq!(p.current_playing_cue_name(), Some("field"));
    Ok(())
}

#[test]
fn interrupted_crossfade_swaps_channels() -> Result<()> {
    let mut p = playing("title")?;
    p.play_with_cross_fade("field", None, CrossFadeOptions::default())?;
    p.update(ms(50));

    p.play_with_cross_fade("battle", None, CrossFadeOptions::default())?;

    // the old fades were completed before the new ones started
    assert_eq!(p.channel(BGM1).volume(), 1.0);
    assert_eq!(p.channel(BGM0).current_cue(), Some("battle"));
    assert_eq!(p.records().stop.channel, Some(BGM1));
    assert_eq!(p.records().play.channel, Some(BGM0));
    assert_eq!(p.running_fades(), 2);
    assert!(p.is_fading());

    p.update(FADE);
    assert_eq!(p.channel(BGM0).volume(), 1.0);
    assert_eq!(p.channel(BGM1).status(), ChannelStatus::Stopped);
    assert_eq!(p.channel(BGM2).played().len(), 0);
    Ok(())
}

#[test]
fn pause_and_play_then_stop_and_resume() -> Result<()> {
    let mut p = playing("title")?;

    p.pause_and_play("field", FADE, FADE)?;
    p.update(FADE);
    assert!(p.channel(BGM0).is_paused());
    assert_eq!(p.channel(BGM0).status(), ChannelStatus::Playing);
    assert_eq!(p.channel(BGM0).volume(), 0.0);
    assert_eq!(p.channel(BGM1).volume(), 1.0);

    p.stop_and_resume("title", FADE, FADE)?;
    assert_eq!(p.current_playing_cue_name(), Some("title"));
    assert_eq!(p.records().play.channel, Some(BGM0));
    assert_eq!(p.records().stop.channel, Some(BGM1));
    assert!(!p.channel(BGM0).is_paused());

    p.update(ms(100));
    assert!(approximately(p.channel(BGM0).volume(), 0.5));
    p.update(ms(100));
    assert_eq!(p.channel(BGM0).volume(), 1.0);
    assert_eq!(p.channel(BGM0).current_cue(), Some("title"));
    assert_eq!(p.channel(BGM1).status(), ChannelStatus::Stopped);
    Ok(())
}

#[test]
fn pause_and_play_same_cue_is_ignored() -> Result<()> {
    let mut p = playing("title")?;
    p.pause_and_play("title", FADE, FADE)?;
    assert_eq!(p.running_fades(), 0);
    assert!(!p.channel(BGM0).is_paused());
    Ok(())
}

#[test]
fn stop_and_resume_without_paused_channel_fails_untouched() -> Result<()> {
    let mut p = playing("title")?;
    let err = p.stop_and_resume("field", FADE, FADE).unwrap_err();

    assert!(matches!(err, SoundError::NoPausedChannel));
    assert_eq!(p.running_fades(), 0);
    assert_eq!(p.channel(BGM0).volume(), 1.0);
    assert_eq!(p.current_playing_cue_name(), Some("title"));
    Ok(())
}

#[test]
fn crossfade_drops_stale_paused_channel() -> Result<()> {
    let mut p = playing("title")?;
    p.pause_and_play("field", FADE, FADE)?;
    p.update(FADE);

    p.play_with_cross_fade("battle", None, CrossFadeOptions::default())?;
    assert!(!p.channel(BGM0).is_paused());
    assert_eq!(p.records().stop.channel, Some(BGM1));
    assert_eq!(p.records().play.channel, Some(BGM0));
    assert_eq!(p.channel(BGM0).current_cue(), Some("battle"));
    Ok(())
}

#[test]
fn interrupted_fade_never_recycles_paused_channel() -> Result<()> {
    let mut p = playing("title")?;
    p.pause_and_play("field", FADE, FADE)?;
    p.update(ms(50));

    let options = CrossFadeOptions {
        paused_source_exists: true,
        ..Default::default()
    };
    p.play_with_cross_fade("battle", None, options)?;

    assert!(p.channel(BGM0).is_paused());
    assert_eq!(p.records().stop.channel, Some(BGM1));
    assert_eq!(p.records().play.channel, Some(BGM2));
    assert_eq!(p.channel(BGM2).current_cue(), Some("battle"));
    Ok(())
}

#[test]
fn crossfade_without_control_releases_previous_one() -> Result<()> {
    let mut p = player()?;
    p.play_with_cross_fade("title", Some("Filter"), CrossFadeOptions::default())?;
    p.update(ms(100));
    assert!(approximately(p.channel(BGM0).control_value("Filter").unwrap_or(0.0), 0.5));
    p.update(ms(100));
    assert_eq!(p.channel(BGM0).control_value("Filter"), Some(1.0));
    assert_eq!(p.active_control().map(|c| c.channel), Some(BGM0));

    p.play_with_cross_fade("field", None, CrossFadeOptions::default())?;
    p.update(FADE);
    assert_eq!(p.channel(BGM0).status(), ChannelStatus::Stopped);
    assert_eq!(p.channel(BGM0).control_value("Filter"), Some(0.0));
    assert!(p.active_control().is_none());
    Ok(())
}

#[test]
fn crossfade_into_control_keeps_the_new_owner() -> Result<()> {
    let mut p = player()?;
    p.play_with_cross_fade("title", Some("Filter"), CrossFadeOptions::default())?;
    p.update(FADE);

    p.play_with_cross_fade("field", Some("Reverb"), CrossFadeOptions::default())?;
    p.update(FADE);

    let active = p.active_control().cloned();
    assert_eq!(active.as_ref().map(|c| c.name.as_str()), Some("Reverb"));
    assert_eq!(active.map(|c| c.channel), Some(BGM1));
    assert_eq!(p.channel(BGM1).control_value("Reverb"), Some(1.0));
    Ok(())
}

#[test]
fn same_bgm_fades_control_in_and_out() -> Result<()> {
    let mut p = playing("title")?;

    p.play_with_cross_fade("title", Some("Filter"), CrossFadeOptions::default())?;
    assert_eq!(p.channel(BGM0).control_value("Filter"), Some(0.0));
    p.update(FADE);
    assert_eq!(p.channel(BGM0).control_value("Filter"), Some(1.0));
    assert!(p.active_control().is_some());

    // asking again for the active control changes nothing
    p.play_with_cross_fade("title", Some("Filter"), CrossFadeOptions::default())?;
    assert_eq!(p.running_fades(), 0);

    p.play_with_cross_fade("title", None, CrossFadeOptions::default())?;
    p.update(ms(100));
    assert!(approximately(p.channel(BGM0).control_value("Filter").unwrap_or(0.0), 0.5));
    p.update(ms(100));
    assert_eq!(p.channel(BGM0).control_value("Filter"), Some(0.0));
    assert!(p.active_control().is_none());

    // only the control moved
    assert_eq!(p.channel(BGM0).volume(), 1.0);
    assert_eq!(p.channel(BGM0).status(), ChannelStatus::Playing);
    assert_eq!(p.channel(BGM0).played(), ["title"]);
    Ok(())
}

#[test]
fn default_control_is_zeroed_at_startup() -> Result<()> {
    let p = player()?;
    for id in p.pool().bgm_ids() {
        assert_eq!(p.channel(id).control_value("AisacControl_00"), Some(0.0));
    }
    assert_eq!(p.pool().se().control_value("AisacControl_00"), None);
    Ok(())
}

struct GatedSource {
    gate: mpsc::Receiver<()>,
    inner: MemoryBankSource,
}

impl BankSource for GatedSource {
    fn bank_names(&self) -> Result<Vec<String>> {
        let _ = self.gate.recv();
        self.inner.bank_names()
    }

    fn cue_names(&self, bank: &str) -> Result<Vec<String>> {
        self.inner.cue_names(bank)
    }
}

#[test]
fn requests_before_the_index_is_built_are_rejected() -> Result<()> {
    let (open, gate) = mpsc::channel();
    let loader = CueIndexLoader::spawn(GatedSource { gate, inner: banks() })?;
    let mut p = SoundPlayer::new(
        ChannelPool::from_fn(|_| SimChannel::new()),
        loader,
        SoundPlayerConfig::default(),
    );

    assert!(!p.is_initialized());
    let err = p.play_with_fade_in("title", None, None, FADE).unwrap_err();
    assert!(matches!(err, SoundError::NotReady));
    assert_eq!(p.channel(BGM0).status(), ChannelStatus::Stopped);

    open.send(())?;
    p.wait_until_ready()?;
    assert!(p.is_initialized());
    p.play_with_fade_in("title", None, None, FADE)?;
    Ok(())
}

#[test]
fn unknown_cue_changes_nothing() -> Result<()> {
    let mut p = playing("title")?;
    let err = p
        .play_with_cross_fade("missing", None, CrossFadeOptions::default())
        .unwrap_err();

    assert!(matches!(
        err,
        SoundError::Lookup(CueIndexError::UnknownCue(ref cue)) if cue == "missing"
    ));
    assert_eq!(p.running_fades(), 0);
    assert_eq!(p.channel(BGM0).volume(), 1.0);
    Ok(())
}

#[test]
fn busy_pool_has_no_idle_channel() -> Result<()> {
    let mut p = player()?;
    for id in [BGM0, BGM1, BGM2] {
        let channel = p.channel_mut(id);
        channel.set_cue_sheet("bgm");
        channel.play("town")?;
        channel.set_volume(0.5);
    }

    let err = p.play_with_fade_in("title", None, None, FADE).unwrap_err();
    assert!(matches!(err, SoundError::NoIdleChannel));
    assert_eq!(p.running_fades(), 0);
    Ok(())
}

#[test]
fn reset_silences_every_channel() -> Result<()> {
    let mut p = playing("title")?;
    p.pause_and_play("field", FADE, FADE)?;
    p.update(FADE);

    p.reset_all_sources();
    assert_eq!(p.current_playing_cue_name(), None);
    assert_eq!(p.records().stop.channel, Some(BGM1));
    assert!(!p.channel(BGM0).is_paused());
    assert_eq!(p.channel(BGM0).status(), ChannelStatus::Stopped);
    assert_eq!(p.channel(BGM0).volume(), 0.0);

    p.update(FADE);
    for id in p.pool().bgm_ids() {
        assert_eq!(p.channel(id).status(), ChannelStatus::Stopped);
        assert_eq!(p.channel(id).volume(), 0.0);
    }
    Ok(())
}

#[test]
fn completion_callback_can_start_new_fades() -> Result<()> {
    let mut p = player()?;
    let callback: FadeCallback<SimChannel> = Box::new(|p: &mut SoundPlayer<SimChannel>| {
        p.stop_with_fade_out(None, None, FADE, true);
    });

    p.play_with_fade_in("title", None, Some(callback), FADE)?;
    p.update(FADE);
    assert_eq!(p.running_fades(), 1);
    assert_eq!(p.channel(BGM0).status(), ChannelStatus::Playing);

    p.update(FADE);
    assert_eq!(p.channel(BGM0).status(), ChannelStatus::Stopped);
    assert_eq!(p.running_fades(), 0);
    Ok(())
}

#[test]
fn forced_completion_runs_the_callback_once() -> Result<()> {
    let mut p = player()?;
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let callback: FadeCallback<SimChannel> = Box::new(move |_: &mut SoundPlayer<SimChannel>| {
        counter.set(counter.get() + 1)
    });

    let record = p.play_with_fade_in("title", None, Some(callback), FADE)?;
    let fade = record.fade.expect("fade started");
    p.complete_fade(fade);
    p.complete_fade(fade);
    p.update(FADE);

    assert_eq!(calls.get(), 1);
    assert_eq!(p.channel(BGM0).volume(), 1.0);
    Ok(())
}

#[test]
fn cue_sheet_follows_the_requested_cue() -> Result<()> {
    let mut p = playing("title")?;
    p.play_with_cross_fade("ending", None, CrossFadeOptions::default())?;

    for id in p.pool().bgm_ids() {
        assert_eq!(p.channel(id).cue_sheet(), Some("event"));
    }
    assert_eq!(p.channel(BGM1).current_cue(), Some("ending"));
    assert_eq!(p.pool().se().cue_sheet(), None);
    Ok(())
}

#[test]
fn sound_effects_use_their_own_channel() -> Result<()> {
    let mut p = playing("title")?;
    p.play_se("click", 0.8)?;

    assert_eq!(p.pool().se().cue_sheet(), Some("se"));
    assert_eq!(p.pool().se().current_cue(), Some("click"));
    assert_eq!(p.pool().se().volume(), 0.8);
    assert_eq!(p.channel(BGM0).cue_sheet(), Some("bgm"));

    p.stop_se();
    assert_eq!(p.pool().se().status(), ChannelStatus::Stopped);
    assert_eq!(p.channel(BGM0).status(), ChannelStatus::Playing);
    Ok(())
}

#[test]
fn immediate_helpers() -> Result<()> {
    let mut p = playing("title")?;

    assert_eq!(p.pause_immediately(None), Some(BGM0));
    assert!(p.channel(BGM0).is_paused());
    assert_eq!(p.resume_immediately()?, BGM0);
    assert!(!p.channel(BGM0).is_paused());

    assert_eq!(p.stop_bgm_immediately(None), Some(BGM0));
    assert_eq!(p.channel(BGM0).status(), ChannelStatus::Stopped);
    assert_eq!(p.stop_bgm_immediately(None), None);
    assert_eq!(p.stop_pause(None), None);
    Ok(())
}

#[test]
fn direct_playback_with_control() -> Result<()> {
    let mut p = player()?;
    p.play_bgm_with_control("town", "Filter", BGM2, 0.4, 0.7)?;

    assert_eq!(p.channel(BGM2).control_value("Filter"), Some(0.4));
    assert_eq!(p.channel(BGM2).volume(), 0.7);
    assert_eq!(p.active_control().map(|c| c.channel), Some(BGM2));
    // the cue sheet is shared by every BGM channel
    assert_eq!(p.channel(BGM0).cue_sheet(), Some("bgm"));

    p.stop_control_immediately("Filter", Some(BGM2));
    assert_eq!(p.channel(BGM2).control_value("Filter"), Some(0.0));
    assert!(p.active_control().is_none());
    assert_eq!(p.channel(BGM2).status(), ChannelStatus::Playing);
    Ok(())
}

/// `title` paused on BGM0, `field` paused on BGM1, `battle` audible on BGM2.
fn two_paused() -> Result<SoundPlayer<SimChannel>> {
    let mut p = playing("title")?;
    p.pause_and_play("field", FADE, FADE)?;
    p.update(FADE);
    p.pause_and_play("battle", FADE, FADE)?;
    p.update(FADE);

    assert!(p.channel(BGM0).is_paused());
    assert!(p.channel(BGM1).is_paused());
    assert_eq!(p.channel(BGM2).volume(), 1.0);
    Ok(p)
}

#[test]
fn interrupted_pause_and_play_moves_to_a_fresh_channel() -> Result<()> {
    let mut p = playing("title")?;
    p.pause_and_play("field", FADE, FADE)?;
    p.update(ms(50));

    p.pause_and_play("battle", FADE, FADE)?;

    // the pause of BGM0 landed, BGM0 keeps its paused BGM
    assert!(p.channel(BGM0).is_paused());
    assert_eq!(p.channel(BGM0).volume(), 0.0);
    assert_eq!(p.records().stop.channel, Some(BGM1));
    assert_eq!(p.records().play.channel, Some(BGM2));
    assert_eq!(p.running_fades(), 2);

    p.update(FADE);
    assert!(p.channel(BGM1).is_paused());
    assert_eq!(p.channel(BGM1).current_cue(), Some("field"));
    assert_eq!(p.channel(BGM2).volume(), 1.0);
    assert_eq!(p.current_playing_cue_name(), Some("battle"));
    Ok(())
}

#[test]
fn pause_and_play_without_idle_channel_leaves_audio_alone() -> Result<()> {
    let mut p = two_paused()?;
    let records = p.records().clone();

    let err = p.pause_and_play("town", FADE, FADE).unwrap_err();
    assert!(matches!(err, SoundError::NoIdleChannel));
    assert_eq!(p.records(), &records);
    assert_eq!(p.running_fades(), 0);

    p.update(FADE);
    assert!(!p.channel(BGM2).is_paused());
    assert_eq!(p.channel(BGM2).volume(), 1.0);
    assert_eq!(p.current_playing_cue_name(), Some("battle"));
    Ok(())
}

#[test]
fn interrupted_pause_and_play_without_idle_channel_leaves_audio_alone() -> Result<()> {
    let mut p = playing("title")?;
    p.pause_and_play("field", FADE, FADE)?;
    p.pause_and_play("battle", FADE, FADE)?;
    let records = p.records().clone();

    let err = p.pause_and_play("town", FADE, FADE).unwrap_err();
    assert!(matches!(err, SoundError::NoIdleChannel));
    // only the interrupted fades were landed
    assert_eq!(p.records(), &records);
    assert_eq!(p.running_fades(), 0);
    assert!(p.channel(BGM1).is_paused());
    assert!(!p.channel(BGM2).is_paused());
    assert_eq!(p.channel(BGM2).volume(), 1.0);
    Ok(())
}

#[test]
fn crossfade_without_idle_channel_leaves_audio_alone() -> Result<()> {
    let mut p = two_paused()?;
    let records = p.records().clone();
    let options = CrossFadeOptions {
        paused_source_exists: true,
        ..Default::default()
    };

    let err = p.play_with_cross_fade("town", None, options).unwrap_err();
    assert!(matches!(err, SoundError::NoIdleChannel));
    assert_eq!(p.records(), &records);
    assert_eq!(p.running_fades(), 0);

    p.update(FADE);
    assert_eq!(p.channel(BGM2).status(), ChannelStatus::Playing);
    assert_eq!(p.channel(BGM2).volume(), 1.0);
    assert!(p.channel(BGM0).is_paused());
    Ok(())
}

#[test]
fn crossfade_reuses_the_dropped_paused_channel() -> Result<()> {
    let mut p = two_paused()?;

    // without a paused source to keep, the first paused BGM makes room
    p.play_with_cross_fade("town", None, CrossFadeOptions::default())?;
    assert!(!p.channel(BGM0).is_paused());
    assert_eq!(p.channel(BGM0).current_cue(), Some("town"));
    assert_eq!(p.records().play.channel, Some(BGM0));
    assert_eq!(p.records().stop.channel, Some(BGM2));
    assert!(p.channel(BGM1).is_paused());
    Ok(())
}

#[test]
fn control_on_same_bgm_lands_the_running_fade_in() -> Result<()> {
    let mut p = player()?;
    p.play_with_cross_fade("title", None, CrossFadeOptions::default())?;
    p.update(ms(50));

    p.play_with_cross_fade("title", Some("Filter"), CrossFadeOptions::default())?;
    assert_eq!(p.channel(BGM0).volume(), 1.0);
    assert_eq!(p.running_fades(), 1);

    p.play_with_cross_fade("field", None, CrossFadeOptions::default())?;
    assert_eq!(p.running_fades(), 2);
    assert_eq!(p.records().stop.channel, Some(BGM0));
    assert_eq!(p.records().play.channel, Some(BGM1));

    p.update(FADE);
    assert_eq!(p.channel(BGM0).status(), ChannelStatus::Stopped);
    assert_eq!(p.channel(BGM1).volume(), 1.0);
    assert!(p.active_control().is_none());
    Ok(())
}

#[test]
fn immediate_helpers_skip_paused_channels() -> Result<()> {
    let mut p = playing("title")?;
    p.pause_and_play("field", FADE, FADE)?;
    p.update(FADE);

    assert_eq!(p.pause_immediately(None), Some(BGM1));
    assert_eq!(p.resume_immediately()?, BGM0);
    assert_eq!(p.stop_bgm_immediately(None), Some(BGM0));
    assert!(!p.channel(BGM0).is_paused());
    assert_eq!(p.channel(BGM0).status(), ChannelStatus::Stopped);

    // an explicit paused channel is released too
    assert_eq!(p.stop_bgm_immediately(Some(BGM1)), Some(BGM1));
    assert!(!p.channel(BGM1).is_paused());
    assert_eq!(p.channel(BGM1).status(), ChannelStatus::Stopped);
    Ok(())
}
