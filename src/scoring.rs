//! Word scoring: letter values and the length multiplier.

use crate::letters::Letter;

/// Point value of a single letter (Scrabble values).
pub fn char_value(ch: char) -> u32 {
    match ch.to_ascii_uppercase() {
        'A' | 'E' | 'I' | 'L' | 'N' | 'O' | 'R' | 'S' | 'T' | 'U' => 1,
        'D' | 'G' => 2,
        'B' | 'C' | 'M' | 'P' => 3,
        'F' | 'H' | 'V' | 'W' | 'Y' => 4,
        'K' => 5,
        'J' | 'X' => 8,
        'Q' | 'Z' => 10,
        _ => 0,
    }
}

/// Tile value; "Qu" counts both letters.
pub fn letter_value(letter: Letter) -> u32 {
    let base = char_value(letter.char());
    if letter.is_digraph() { base + char_value('U') } else { base }
}

/// Multiplier for a word spanning `tiles` tiles. Rewards long rows super-linearly.
pub fn length_multiplier(tiles: usize) -> f64 {
    match tiles {
        0 | 1 => 0.0,
        2 => 1.0,
        3 => 1.5,
        4 => 2.0,
        5 => 3.0,
        6 => 4.0,
        _ => 6.0,
    }
}

/// Score of a row of tiles read as a valid word.
pub fn word_score(letters: &[Letter]) -> u32 {
    let sum: u32 = letters.iter().copied().map(letter_value).sum();
    (f64::from(sum) * length_multiplier(letters.len())).round() as u32
}
