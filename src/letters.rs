//! Letters and the seeded letter generator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not a tile letter: {0:?}")]
pub struct NotALetter(pub char);

/// A tile face: one letter A–Z, where `Q` always stands for the digraph "Qu".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct Letter(char);

impl TryFrom<char> for Letter {
    type Error = NotALetter;

    fn try_from(ch: char) -> Result<Self, Self::Error> {
        Self::new(ch).ok_or(NotALetter(ch))
    }
}

impl From<Letter> for char {
    fn from(letter: Letter) -> Self {
        letter.0
    }
}

impl Letter {
    /// `None` unless `ch` is an ASCII letter.
    pub fn new(ch: char) -> Option<Self> {
        ch.is_ascii_alphabetic().then(|| Self(ch.to_ascii_uppercase()))
    }

    pub fn is_digraph(self) -> bool {
        self.0 == 'Q'
    }

    /// Face text as shown on the tile: "A", "Qu".
    pub fn label(self) -> &'static str {
        const LABELS: [&str; 26] = [
            "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Qu",
            "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
        ];
        LABELS[(self.0 as u8 - b'A') as usize]
    }

    /// Lower-cased letters this tile contributes to a word.
    pub fn push_lower(self, word: &mut String) {
        word.push(self.0.to_ascii_lowercase());
        if self.is_digraph() {
            word.push('u');
        }
    }

    /// Underlying letter (the `Q` of "Qu").
    pub fn char(self) -> char {
        self.0
    }
}

/// Relative draw weights for A..Z (tile counts of a standard English letter set).
const FREQUENCIES: [u32; 26] = [
    9, 2, 2, 4, 12, 2, 3, 2, 9, 1, 1, 4, 2, 6, 8, 2, 1, 6, 4, 6, 4, 2, 2, 1, 2, 1,
];

const TOTAL_WEIGHT: u32 = {
    let mut sum = 0;
    let mut i = 0;
    while i < FREQUENCIES.len() {
        sum += FREQUENCIES[i];
        i += 1;
    }
    sum
};

/// Deterministic letter source. Output is a pure function of the seed and the
/// number of letters drawn, so a round can be replayed from its seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterGen {
    seed: u64,
    state: u64,
}

impl LetterGen {
    pub fn new(seed: u64) -> Self {
        Self { seed, state: seed }
    }

    /// Restart the sequence from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.state = seed;
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.state >> 32) as u32
    }

    pub fn next_letter(&mut self) -> Letter {
        let mut roll = self.next_u32() % TOTAL_WEIGHT;
        for (i, &weight) in FREQUENCIES.iter().enumerate() {
            if roll < weight {
                return Letter((b'A' + i as u8) as char);
            }
            roll -= weight;
        }
        Letter('E')
    }
}

impl Default for LetterGen {
    fn default() -> Self {
        Self::new(0x1234_5678)
    }
}
