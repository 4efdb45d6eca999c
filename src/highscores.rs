//! Persist high scores to disk (XDG config or ~/.config/cascadetui).

use anyhow::Result;
use log::{debug, warn};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

const FILENAME: &str = "highscores";

/// Longest list kept.
pub const MAX_SCORES: usize = 5;

/// Returns the path to the high scores file (config dir / cascadetui / highscores).
fn config_path() -> PathBuf {
    let home_config = || {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from("."))
    };
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => home_config(),
    };
    base.join("cascadetui").join(FILENAME)
}

/// Load high scores, best first. Missing or corrupt files give an empty list.
pub fn load_high_scores() -> Vec<u32> {
    load_from(&config_path())
}

pub fn load_from(path: &Path) -> Vec<u32> {
    let content = match fs::read(path) {
        Ok(c) => c,
        Err(e) => {
            debug!("no high scores at {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    let mut scores = Vec::new();
    for line in BufReader::new(&content[..]).lines() {
        let Ok(line) = line else {
            warn!("high score file {} is not text, ignoring it", path.display());
            return Vec::new();
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<u32>() {
            Ok(n) => scores.push(n),
            Err(_) => {
                warn!("corrupt high score entry {:?} in {}, ignoring file", line, path.display());
                return Vec::new();
            }
        }
    }
    normalise(&mut scores);
    scores
}

/// Save high scores to disk. Creates config directory if needed.
pub fn save_high_scores(scores: &[u32]) -> Result<()> {
    save_to(&config_path(), scores)
}

pub fn save_to(path: &Path, scores: &[u32]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = fs::File::create(path)?;
    for score in scores.iter().take(MAX_SCORES) {
        writeln!(f, "{}", score)?;
    }
    Ok(())
}

/// Descending, at most [`MAX_SCORES`] entries.
fn normalise(scores: &mut Vec<u32>) {
    scores.sort_unstable_by(|a, b| b.cmp(a));
    scores.truncate(MAX_SCORES);
}

/// Insert `score` if it qualifies: the list has room or the score beats the
/// lowest entry. Returns its rank (0 = best).
pub fn insert_score(scores: &mut Vec<u32>, score: u32, cap: usize) -> Option<usize> {
    if cap == 0 {
        return None;
    }
    if scores.len() >= cap && scores.last().is_some_and(|&min| score <= min) {
        return None;
    }
    // Equal scores keep the older entry ahead.
    let rank = scores.iter().position(|&s| score > s).unwrap_or(scores.len());
    scores.insert(rank, score);
    scores.truncate(cap);
    Some(rank)
}
