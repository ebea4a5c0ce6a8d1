use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use fadeplay_audio::sim::SimChannel;
use fadeplay_audio::{
    AudioChannel, ChannelPool, CueIndexLoader, SoundPlayer, SoundPlayerConfig,
    SoundPlayerConfigReader,
};
use fadeplay_core::format::{BankSource, DirBankSource, MemoryBankSource};

/// Bank holding the cues named on the command line when no bank directory is given.
const DEFAULT_BANK: &str = "default";

#[derive(Debug, Clone, PartialEq)]
enum Step {
    FadeIn(String),
    CrossFade { cue: String, control: Option<String> },
    Pause(String),
    Resume(String),
    Stop,
    Se(String),
    Reset,
    Wait(Duration),
}

impl Step {
    fn cue(&self) -> Option<&str> {
        match self {
            Step::FadeIn(cue)
            | Step::CrossFade { cue, .. }
            | Step::Pause(cue)
            | Step::Resume(cue)
            | Step::Se(cue) => Some(cue.as_str()),
            Step::Stop | Step::Reset | Step::Wait(_) => None,
        }
    }
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (verb, arg) = match s.split_once(':') {
            Some((verb, arg)) => (verb, Some(arg)),
            None => (s, None),
        };
        let cue = || -> Result<String> {
            match arg {
                Some(cue) if !cue.is_empty() => Ok(cue.to_string()),
                _ => Err(anyhow!("step {} needs a cue name", verb)),
            }
        };

        let step = match verb {
            "fadein" => Step::FadeIn(cue()?),
            "xfade" => {
                let cue = cue()?;
                match cue.split_once('@') {
                    Some((cue, control)) if !control.is_empty() => Step::CrossFade {
                        cue: cue.to_string(),
                        control: Some(control.to_string()),
                    },
                    _ => Step::CrossFade { cue, control: None },
                }
            }
            "pause" => Step::Pause(cue()?),
            "resume" => Step::Resume(cue()?),
            "se" => Step::Se(cue()?),
            "stop" => Step::Stop,
            "reset" => Step::Reset,
            "wait" => {
                let ms = arg.ok_or_else(|| anyhow!("wait needs a duration in ms"))?;
                Step::Wait(Duration::from_millis(ms.parse().context("parsing wait duration")?))
            }
            other => bail!("unknown step {}", other),
        };
        Ok(step)
    }
}

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON configuration, see `SoundPlayerConfig`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory scanned for bank files
    #[arg(short, long)]
    banks: Option<PathBuf>,

    /// Simulated frame length
    #[arg(short, long, default_value_t = 16)]
    tick_ms: u64,

    /// Play through the sound device instead of simulated channels
    #[arg(long)]
    kira: bool,

    /// fadein:CUE, xfade:CUE[@CONTROL], pause:CUE, resume:CUE, stop, se:CUE, reset, wait:MS
    #[arg(required = true)]
    steps: Vec<Step>,
}

struct Driver<C: AudioChannel> {
    player: SoundPlayer<C>,
    tick: Duration,
    realtime: bool,
}

impl<C: AudioChannel> Driver<C> {
    fn advance(&mut self, mut remaining: Duration) {
        while !remaining.is_zero() {
            let dt = remaining.min(self.tick);
            if self.realtime {
                std::thread::sleep(dt);
            }
            self.player.update(dt);
            remaining -= dt;
        }
    }

    fn run(&mut self, steps: &[Step]) -> Result<()> {
        self.player.wait_until_ready()?;
        let stop_fade = self.player.config().stop_fade();
        let play_fade = self.player.config().play_fade();

        for step in steps {
            tracing::info!("step {:?}", step);
            match step {
                Step::FadeIn(cue) => {
                    self.player.play_with_fade_in(cue, None, None, play_fade)?;
                }
                Step::CrossFade { cue, control } => {
                    let options = self.player.cross_fade_options();
                    self.player.play_with_cross_fade(cue, control.as_deref(), options)?;
                }
                Step::Pause(cue) => self.player.pause_and_play(cue, stop_fade, play_fade)?,
                Step::Resume(cue) => self.player.stop_and_resume(cue, stop_fade, play_fade)?,
                Step::Stop => {
                    self.player.stop_with_fade_out(None, None, stop_fade, true);
                }
                Step::Se(cue) => {
                    self.player.play_se(cue, 1.0)?;
                }
                Step::Reset => self.player.reset_all_sources(),
                Step::Wait(duration) => self.advance(*duration),
            }
            tracing::info!("channels:\n{}", self.player.pool().debug_summary());
        }

        // let the last fades land
        while self.player.running_fades() > 0 {
            self.advance(self.tick);
        }
        tracing::info!(
            "finished, playing {}",
            self.player.current_playing_cue_name().unwrap_or("nothing")
        );
        Ok(())
    }
}

fn bank_source(args: &Args, config: &SoundPlayerConfig) -> Box<dyn BankSource + Send> {
    if let Some(dir) = args.banks.as_ref().or(config.bank_dir.as_ref()) {
        // scanned by the loader thread
        return Box::new(DirBankSource::with_extension(dir, &config.bank_extension));
    }

    let cues = args.steps.iter().filter_map(Step::cue).map(|cue| cue.to_string());
    Box::new(MemoryBankSource::new().with_bank(DEFAULT_BANK, cues))
}

#[cfg(feature = "kira")]
fn run_kira(args: &Args, config: SoundPlayerConfig, loader: CueIndexLoader, tick: Duration) -> Result<()> {
    let root = args
        .banks
        .clone()
        .or_else(|| config.bank_dir.clone())
        .ok_or_else(|| anyhow!("--kira needs a bank directory"))?;
    let manager = fadeplay_audio::kira_backend::AudioManager::new()?;
    let pool = fadeplay_audio::kira_backend::kira_pool(&manager, &root)?;

    let mut driver = Driver {
        player: SoundPlayer::new(pool, loader, config),
        tick,
        realtime: true,
    };
    driver.run(&args.steps)
}

#[cfg(not(feature = "kira"))]
fn run_kira(_: &Args, _: SoundPlayerConfig, _: CueIndexLoader, _: Duration) -> Result<()> {
    bail!("built without the kira feature")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SoundPlayerConfigReader::read_json(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => SoundPlayerConfig::default(),
    };

    let default_level = config.level_filter().to_string().to_lowercase();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let loader = CueIndexLoader::spawn(bank_source(&args, &config))?;
    let tick = Duration::from_millis(args.tick_ms.max(1));

    if args.kira {
        return run_kira(&args, config, loader, tick);
    }

    let pool = ChannelPool::from_fn(|_| SimChannel::new());
    let mut driver = Driver {
        player: SoundPlayer::new(pool, loader, config),
        tick,
        realtime: false,
    };
    driver.run(&args.steps)
}
