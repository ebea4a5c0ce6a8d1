use std::collections::HashMap;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::format::BankSource;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CueIndexError {
    #[error("cue {0:?} is not in any loaded bank")]
    UnknownCue(String),
}

/// Maps a cue name to the bank (cue sheet) that contains it.
///
/// Built once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct CueIndex {
    bank_by_cue: HashMap<String, String>,
}

impl CueIndex {
    pub fn build(source: &dyn BankSource) -> Result<Self> {
        let mut bank_by_cue = HashMap::new();

        for bank in source.bank_names()? {
            let cues = source
                .cue_names(&bank)
                .with_context(|| format!("listing cues of bank {}", bank))?;

            for cue in cues {
                if let Some(previous) = bank_by_cue.insert(cue.clone(), bank.clone()) {
                    log::warn!("cue {} found in both {} and {}, using {}", cue, previous, bank, bank);
                }
            }
        }

        log::info!("cue index ready: {} cues", bank_by_cue.len());
        Ok(Self { bank_by_cue })
    }

    pub fn bank_of(&self, cue_name: &str) -> Result<&str, CueIndexError> {
        self.bank_by_cue
            .get(cue_name)
            .map(String::as_str)
            .ok_or_else(|| CueIndexError::UnknownCue(cue_name.to_string()))
    }

    pub fn contains(&self, cue_name: &str) -> bool {
        self.bank_by_cue.contains_key(cue_name)
    }

    pub fn len(&self) -> usize {
        self.bank_by_cue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bank_by_cue.is_empty()
    }
}
