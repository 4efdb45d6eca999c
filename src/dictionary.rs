//! Word list: membership test plus a background loader.

use log::{debug, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use thiserror::Error;

/// Shortest word that can score.
pub const MIN_WORD_LEN: usize = 2;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("cannot read word list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("word list {0} contains no usable words")]
    Empty(PathBuf),
    #[error("dictionary loader thread exited without a result")]
    LoaderGone,
}

/// Static word set. Until a list is installed, [`Dictionary::is_loaded`] is
/// false and nothing is a word.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    words: Option<HashSet<String>>,
}

impl Dictionary {
    /// Not yet loaded.
    pub fn pending() -> Self {
        Self { words: None }
    }

    /// Loaded list from already-known words; entries are normalised the same
    /// way as file lines.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words.into_iter().filter_map(|w| normalise(w.as_ref())).collect();
        Self { words: Some(words) }
    }

    /// Loaded but empty; used when the word list could not be read.
    pub fn empty() -> Self {
        Self { words: Some(HashSet::new()) }
    }

    pub fn is_loaded(&self) -> bool {
        self.words.is_some()
    }

    pub fn len(&self) -> usize {
        self.words.as_ref().map_or(0, HashSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Case-insensitive membership. Words shorter than [`MIN_WORD_LEN`] never match.
    pub fn contains(&self, word: &str) -> bool {
        let Some(words) = &self.words else {
            return false;
        };
        if word.chars().count() < MIN_WORD_LEN {
            return false;
        }
        words.contains(&word.to_ascii_lowercase())
    }

    /// Parse a word list: one word per line, `#` comments and non-alphabetic
    /// entries (proper nouns with apostrophes etc.) skipped.
    pub fn parse(text: &str) -> Self {
        Self::from_words(text.lines().filter(|l| !l.trim_start().starts_with('#')))
    }

    pub fn load(path: &Path) -> Result<Self, DictionaryError> {
        let text = std::fs::read_to_string(path).map_err(|source| DictionaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dictionary = Self::parse(&text);
        if dictionary.is_empty() {
            return Err(DictionaryError::Empty(path.to_path_buf()));
        }
        Ok(dictionary)
    }
}

fn normalise(word: &str) -> Option<String> {
    let word = word.trim();
    (word.len() >= MIN_WORD_LEN && word.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| word.to_ascii_lowercase())
}

/// Loads a word list on a worker thread; poll from the main loop.
#[derive(Debug)]
pub struct DictionaryLoader {
    rx: Receiver<Result<Dictionary, DictionaryError>>,
}

impl DictionaryLoader {
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            debug!("loading word list from {}", path.display());
            let result = Dictionary::load(&path);
            if let Ok(dictionary) = &result {
                info!("loaded {} words from {}", dictionary.len(), path.display());
            }
            // Receiver may be gone if the app already quit.
            let _ = tx.send(result);
        });
        Self { rx }
    }

    /// `None` while still loading.
    pub fn poll(&self) -> Option<Result<Dictionary, DictionaryError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(DictionaryError::LoaderGone)),
        }
    }
}
