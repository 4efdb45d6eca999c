//! Sound cues. The only backend is the terminal bell; `--quiet` silences it.

use crate::game::GameEvent;
use log::debug;
use std::io::Write;

/// Cue volumes (0.0..=1.0). Backends that can only beep play cues at or
/// above [`BELL_THRESHOLD`].
pub const TILE_MOVE_VOLUME: f32 = 0.2;
pub const WORD_CLEAR_VOLUME: f32 = 0.45;
pub const PERFECT_VOLUME: f32 = 0.8;
pub const ROUND_END_VOLUME: f32 = 0.35;

pub const BELL_THRESHOLD: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    TileMove,
    WordClear,
    Perfect,
    RoundEnd,
}

impl Cue {
    pub fn for_event(event: &GameEvent) -> Option<Self> {
        match event {
            GameEvent::TileMoved(_) => Some(Cue::TileMove),
            GameEvent::WordCleared(_) => Some(Cue::WordClear),
            GameEvent::PerfectBoard => Some(Cue::Perfect),
            GameEvent::RoundEnded { .. } => Some(Cue::RoundEnd),
            _ => None,
        }
    }

    pub fn volume(self) -> f32 {
        match self {
            Cue::TileMove => TILE_MOVE_VOLUME,
            Cue::WordClear => WORD_CLEAR_VOLUME,
            Cue::Perfect => PERFECT_VOLUME,
            Cue::RoundEnd => ROUND_END_VOLUME,
        }
    }
}

/// Fire-and-forget playback. Implementations must not block the game loop.
pub trait Audio {
    fn play(&mut self, cue: Cue);
}

#[derive(Debug, Default)]
pub struct Silent;

impl Audio for Silent {
    fn play(&mut self, _cue: Cue) {}
}

/// Rings the terminal bell (BEL) for loud cues.
#[derive(Debug)]
pub struct TerminalBell<W: Write> {
    out: W,
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Audio for TerminalBell<W> {
    fn play(&mut self, cue: Cue) {
        if cue.volume() < BELL_THRESHOLD {
            return;
        }
        // A lost beep is not worth interrupting play for.
        if let Err(e) = self.out.write_all(b"\x07").and_then(|()| self.out.flush()) {
            debug!("bell failed: {}", e);
        }
    }
}

/// Backend selected from the command line.
pub fn from_config(quiet: bool) -> Box<dyn Audio> {
    if quiet {
        Box::new(Silent)
    } else {
        Box::new(TerminalBell::new(std::io::stdout()))
    }
}
