use std::{io, thread};

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use fadeplay_core::{format::BankSource, CueIndex};

use crate::{Result, SoundError};

/// Builds the [`CueIndex`] off the caller's thread.
///
/// The result is delivered once. The player polls it from `update`, so
/// requests made before it arrives fail with [`SoundError::NotReady`].
pub struct CueIndexLoader {
    rx: Receiver<anyhow::Result<CueIndex>>,
}

impl CueIndexLoader {
    pub fn spawn<S>(source: S) -> io::Result<Self>
    where
        S: BankSource + Send + 'static,
    {
        let (tx, rx) = bounded(1);

        thread::Builder::new()
            .name("fadeplay-cue-index".to_string())
            .spawn(move || {
                let result = CueIndex::build(&source);
                if let Err(e) = &result {
                    tracing::error!("cue index build failed: {e:#}");
                }
                // The player may be gone already.
                let _ = tx.send(result);
            })?;

        Ok(Self { rx })
    }

    /// A loader whose index is already available.
    pub fn ready(index: CueIndex) -> Self {
        let (tx, rx) = bounded(1);
        let _ = tx.send(Ok(index));
        Self { rx }
    }

    /// The index, once the build has finished. `None` while it is still running.
    pub fn try_take(&self) -> Option<Result<CueIndex>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result.map_err(|e| SoundError::IndexBuild(format!("{e:#}")))),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(SoundError::IndexBuild(
                "loader thread exited without a result".to_string(),
            ))),
        }
    }

    /// Block until the build has finished.
    pub fn wait(self) -> Result<CueIndex> {
        match self.rx.recv() {
            Ok(result) => result.map_err(|e| SoundError::IndexBuild(format!("{e:#}"))),
            Err(_) => Err(SoundError::IndexBuild(
                "loader thread exited without a result".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fadeplay_core::format::MemoryBankSource;

    #[test]
    fn spawned_loader_delivers_index() {
        let source = MemoryBankSource::new().with_bank("bgm", ["title", "field"]);
        let loader = CueIndexLoader::spawn(source).unwrap();
        let index = loader.wait().unwrap();
        assert_eq!(index.bank_of("field"), Ok("bgm"));
    }

    #[test]
    fn ready_loader_is_immediately_available() {
        let loader = CueIndexLoader::ready(CueIndex::default());
        assert!(matches!(loader.try_take(), Some(Ok(_))));
    }
}
