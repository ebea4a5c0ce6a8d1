use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

pub const DEFAULT_BANK_EXTENSION: &str = "bank.json";

/// Where banks (cue sheets) and their cue lists come from.
pub trait BankSource {
    fn bank_names(&self) -> Result<Vec<String>>;
    fn cue_names(&self, bank: &str) -> Result<Vec<String>>;
}

/// Bank file contents: either a bare list of cue names or `{ "cues": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BankFile {
    List(Vec<String>),
    Table { cues: Vec<String> },
}

impl BankFile {
    fn into_cues(self) -> Vec<String> {
        match self {
            BankFile::List(cues) => cues,
            BankFile::Table { cues } => cues,
        }
    }
}

/// Banks stored as files below a directory, searched recursively.
///
/// The directory is scanned on first use, so building a [`CueIndex`](crate::CueIndex)
/// on another thread also moves the scan off the caller's thread.
#[derive(Debug, Clone)]
pub struct DirBankSource {
    root: PathBuf,
    extension: String,
    files: OnceLock<BTreeMap<String, PathBuf>>,
}

impl DirBankSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_extension(root, DEFAULT_BANK_EXTENSION)
    }

    pub fn with_extension(root: impl AsRef<Path>, extension: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
            files: OnceLock::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn files(&self) -> Result<&BTreeMap<String, PathBuf>> {
        if let Some(files) = self.files.get() {
            return Ok(files);
        }
        let files = Self::scan(&self.root, &self.extension)?;
        Ok(self.files.get_or_init(|| files))
    }

    fn scan(root: &Path, extension: &str) -> Result<BTreeMap<String, PathBuf>> {
        let mut files = BTreeMap::new();
        if !root.exists() {
            log::warn!("bank directory does not exist: {:?}", root);
            return Ok(files);
        }

        let mut pattern = root.to_path_buf();
        pattern.push("**");
        pattern.push(format!("*.{}", extension));

        let suffix = format!(".{}", extension);
        let matches: Vec<_> = glob::glob(&pattern.to_string_lossy())?.flatten().collect();
        for path in matches {
            let Some(file_name) = path.file_name() else {
                continue;
            };
            let file_name = file_name.to_string_lossy();
            if let Some(bank) = file_name.strip_suffix(&suffix) {
                log::info!("bank file found: {}", bank);
                files.insert(bank.to_string(), path.clone());
            }
        }

        Ok(files)
    }
}

impl BankSource for DirBankSource {
    fn bank_names(&self) -> Result<Vec<String>> {
        Ok(self.files()?.keys().cloned().collect())
    }

    fn cue_names(&self, bank: &str) -> Result<Vec<String>> {
        let Some(path) = self.files()?.get(bank) else {
            bail!("unknown bank {:?} (extension {:?})", bank, self.extension);
        };

        let file = File::open(path).with_context(|| format!("opening bank {:?}", path))?;
        let mut bytes = Vec::new();
        BufReader::new(file).read_to_end(&mut bytes)?;
        let contents: BankFile = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing bank {:?}", path))?;

        Ok(contents.into_cues())
    }
}

impl<T: BankSource + ?Sized> BankSource for Box<T> {
    fn bank_names(&self) -> Result<Vec<String>> {
        (**self).bank_names()
    }

    fn cue_names(&self, bank: &str) -> Result<Vec<String>> {
        (**self).cue_names(bank)
    }
}

/// Banks held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryBankSource {
    banks: Vec<(String, Vec<String>)>,
}

impl MemoryBankSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bank<I, S>(mut self, bank: &str, cues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(bank, cues);
        self
    }

    pub fn insert<I, S>(&mut self, bank: &str, cues: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cues = cues.into_iter().map(Into::into).collect();
        match self.banks.iter_mut().find(|(name, _)| name == bank) {
            Some((_, existing)) => *existing = cues,
            None => self.banks.push((bank.to_string(), cues)),
        }
    }
}

impl BankSource for MemoryBankSource {
    fn bank_names(&self) -> Result<Vec<String>> {
        Ok(self.banks.iter().map(|(name, _)| name.clone()).collect())
    }

    fn cue_names(&self, bank: &str) -> Result<Vec<String>> {
        self.banks
            .iter()
            .find(|(name, _)| name == bank)
            .map(|(_, cues)| cues.clone())
            .ok_or_else(|| anyhow::anyhow!("unknown bank {:?}", bank))
    }
}
