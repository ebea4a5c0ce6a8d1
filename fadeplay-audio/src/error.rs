use fadeplay_core::CueIndexError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SoundError {
    #[error("the cue index is still being built")]
    NotReady,
    #[error(transparent)]
    Lookup(#[from] CueIndexError),
    #[error("no idle BGM channel is available")]
    NoIdleChannel,
    #[error("no paused BGM channel to resume")]
    NoPausedChannel,
    #[error("building the cue index failed: {0}")]
    IndexBuild(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T, E = SoundError> = std::result::Result<T, E>;
