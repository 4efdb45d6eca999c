//! Round controller: phase state machine, gravity, hand refills, evaluation.
//!
//! All timing runs on a logical millisecond clock. The app loop calls
//! [`Game::advance`] with the current time; due tasks fire in order, each at
//! its own due time, so a long frame replays exactly like many short ones.

use crate::GameConfig;
use crate::board::{Board, RowResult, Tile, TileId};
use crate::dictionary::Dictionary;
use crate::geometry::{self, BOTTOM_ROW, GridPos, HAND_ROW, HAND_WIDTH, ROW_COUNT};
use crate::highscores;
use crate::letters::{Letter, LetterGen};
use crate::scheduler::{Scheduler, TimerKind};
use log::{debug, info, trace, warn};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Brand word spelled into the hand at the start of each round.
pub const INTRO_WORD: &str = "CASCADE";
/// Delay between intro letters.
pub const INTRO_STEP_MS: u64 = 180;
/// Pause on the finished intro word before play begins.
pub const INTRO_HOLD_MS: u64 = 600;
/// Gravity task cadence.
pub const GRAVITY_TICK_MS: u64 = 40;
/// Minimum time a tile waits after being placed or falling before it falls again.
pub const FALL_DELAY_MS: u64 = 110;
/// Delay before an empty hand slot is refilled.
pub const REFILL_DELAY_MS: u64 = 400;
/// One round-clock second.
pub const CLOCK_TICK_MS: u64 = 1000;
/// How long evaluation results stay on screen.
pub const CLEAR_DISPLAY_MS: u64 = 2500;
/// Display time after a perfect board.
pub const PERFECT_DISPLAY_MS: u64 = 5000;
/// Default round length in seconds.
pub const DEFAULT_ROUND_SECS: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the first tap.
    Start,
    /// Spelling the intro word; input ignored.
    Intro,
    /// Clock and gravity running, input accepted.
    Playing,
    /// Board full; results on display, input rejected.
    Clearing,
    /// Time is up; waiting for a tap to restart.
    RoundEnd,
}

/// Notifications for the renderer and audio. The engine never waits on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    RoundStarted { seed: u64 },
    /// Intro placed the letter at this hand column.
    IntroLetter(usize),
    TileMoved(TileId),
    /// A valid row of this many tiles.
    WordCleared(usize),
    BoardCleared,
    PerfectBoard,
    /// `rank` is the position in the high-score list, if the score made it.
    RoundEnded { score: u32, rank: Option<usize> },
}

/// A tile lifted off the board by an in-progress drag.
#[derive(Debug, Clone)]
struct Held {
    tile: Tile,
    origin: GridPos,
}

#[derive(Debug)]
pub struct Game {
    board: Board,
    phase: Phase,
    score: u32,
    remaining_secs: u32,
    round_secs: u32,
    letters: LetterGen,
    fixed_seed: Option<u64>,
    rounds_started: u64,
    dictionary: Dictionary,
    timers: Scheduler,
    now: u64,
    next_tile_id: u64,
    /// Earliest time each unsettled tile may fall again.
    fall_ready: HashMap<TileId, u64>,
    held: Option<Held>,
    intro_step: usize,
    results: Vec<RowResult>,
    perfect: bool,
    high_scores: Vec<u32>,
    events: Vec<GameEvent>,
    tiles_created: u64,
    tiles_destroyed: u64,
}

impl Game {
    pub fn new(config: &GameConfig, high_scores: Vec<u32>) -> Self {
        Self {
            board: Board::new(),
            phase: Phase::Start,
            score: 0,
            remaining_secs: config.round_secs,
            round_secs: config.round_secs,
            letters: LetterGen::new(config.seed.unwrap_or_default()),
            fixed_seed: config.seed,
            rounds_started: 0,
            dictionary: Dictionary::pending(),
            timers: Scheduler::new(),
            now: 0,
            next_tile_id: 0,
            fall_ready: HashMap::new(),
            held: None,
            intro_step: 0,
            results: Vec::new(),
            perfect: false,
            high_scores,
            events: Vec::new(),
            tiles_created: 0,
            tiles_destroyed: 0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn round_secs(&self) -> u32 {
        self.round_secs
    }

    /// Row results of the evaluation on display; empty outside `Clearing`.
    pub fn results(&self) -> &[RowResult] {
        &self.results
    }

    /// Whether the evaluation on display was a perfect board.
    pub fn is_perfect(&self) -> bool {
        self.perfect
    }

    pub fn high_scores(&self) -> &[u32] {
        &self.high_scores
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Logical time of the last [`Game::advance`].
    #[cfg(test)]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Tile lifted by the current drag and the slot it came from.
    pub fn held(&self) -> Option<(&Tile, GridPos)> {
        self.held.as_ref().map(|h| (&h.tile, h.origin))
    }

    /// Drops, drags and hand taps are accepted.
    pub fn input_enabled(&self) -> bool {
        self.phase == Phase::Playing
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Tiles that exist right now: on the board plus any held by a drag.
    pub fn live_tiles(&self) -> usize {
        self.board.tile_count() + usize::from(self.held.is_some())
    }

    /// Tiles ever created minus tiles removed by explicit clears.
    pub fn expected_tiles(&self) -> u64 {
        self.tiles_created - self.tiles_destroyed
    }

    /// Install the loaded word list. A board that filled while the list was
    /// still loading is evaluated now.
    pub fn install_dictionary(&mut self, dictionary: Dictionary) {
        info!("dictionary ready ({} words)", dictionary.len());
        self.dictionary = dictionary;
        self.check_full();
    }

    // ---------------------------------------------------------------------
    // Time
    // ---------------------------------------------------------------------

    /// Run every task due at or before `now`.
    pub fn advance(&mut self, now: u64) {
        if now < self.now {
            return;
        }
        while let Some((kind, due)) = self.timers.pop_due(now) {
            self.now = due;
            self.fire(kind);
        }
        self.now = now;
    }

    fn schedule_in(&mut self, kind: TimerKind, delay: u64) {
        self.timers.schedule(kind, self.now + delay);
    }

    fn fire(&mut self, kind: TimerKind) {
        trace!("timer {:?} at {} ({} pending)", kind, self.now, self.timers.len());
        match kind {
            TimerKind::Intro => self.intro_tick(),
            TimerKind::Gravity => self.gravity_tick(),
            TimerKind::Refill(col) => self.refill(col),
            TimerKind::Clock => self.clock_tick(),
            TimerKind::Display => self.finish_clearing(),
        }
    }

    // ---------------------------------------------------------------------
    // Round lifecycle
    // ---------------------------------------------------------------------

    /// Generic tap: starts a round from `Start` or `RoundEnd`. Returns true if it did.
    pub fn tap(&mut self) -> bool {
        if matches!(self.phase, Phase::Start | Phase::RoundEnd) {
            self.start_round();
            true
        } else {
            false
        }
    }

    fn fresh_seed(&self) -> u64 {
        self.fixed_seed.unwrap_or_else(|| {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default();
            nanos ^ self.rounds_started.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        })
    }

    fn start_round(&mut self) {
        self.timers.cancel_all();
        self.held = None;
        self.clear_board();
        self.results.clear();
        self.perfect = false;
        self.score = 0;
        self.remaining_secs = self.round_secs;
        let seed = self.fresh_seed();
        self.letters.reseed(seed);
        self.rounds_started += 1;
        self.intro_step = 0;
        self.phase = Phase::Intro;
        self.events.push(GameEvent::RoundStarted { seed });
        info!("round {} started, seed {}", self.rounds_started, self.letters.seed());
        self.schedule_in(TimerKind::Intro, 0);
    }

    fn intro_tick(&mut self) {
        if self.phase != Phase::Intro {
            return;
        }
        let letters: Vec<Letter> = INTRO_WORD.chars().filter_map(Letter::new).collect();
        if let Some(&letter) = letters.get(self.intro_step) {
            let col = self.intro_step;
            let tile = self.spawn_tile(letter);
            self.place_in_hand(col, tile);
            self.events.push(GameEvent::IntroLetter(col));
            self.intro_step += 1;
            let delay = if self.intro_step < letters.len() { INTRO_STEP_MS } else { INTRO_HOLD_MS };
            self.schedule_in(TimerKind::Intro, delay);
            return;
        }
        self.clear_board();
        self.fill_hand();
        self.phase = Phase::Playing;
        self.schedule_in(TimerKind::Clock, CLOCK_TICK_MS);
        self.schedule_in(TimerKind::Gravity, GRAVITY_TICK_MS);
        info!("playing, {} s on the clock", self.remaining_secs);
    }

    fn clock_tick(&mut self) {
        if !matches!(self.phase, Phase::Playing | Phase::Clearing) {
            return;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            self.schedule_in(TimerKind::Clock, CLOCK_TICK_MS);
        } else if self.phase == Phase::Playing {
            self.end_round();
        } else {
            debug!("time up during clearing; round ends after the display");
        }
    }

    fn end_round(&mut self) {
        self.phase = Phase::RoundEnd;
        self.return_held();
        self.timers.cancel_all();
        debug_assert!(self.timers.is_empty());
        self.fall_ready.clear();
        self.results.clear();
        if self.live_tiles() as u64 != self.expected_tiles() {
            warn!("tile count drifted: {} live, {} expected", self.live_tiles(), self.expected_tiles());
        }
        let rank = highscores::insert_score(&mut self.high_scores, self.score, highscores::MAX_SCORES);
        info!("round over: score {}, rank {:?}", self.score, rank);
        self.events.push(GameEvent::RoundEnded { score: self.score, rank });
    }

    /// Put a held tile back on the board so it is never lost.
    fn return_held(&mut self) {
        if self.held.is_some() {
            let origin = self.held.as_ref().map(|h| h.origin);
            debug!("returning held tile to the board");
            self.end_drag(origin);
        }
    }

    fn clear_board(&mut self) {
        let removed = self.board.clear();
        self.tiles_destroyed += removed as u64;
        self.fall_ready.clear();
    }

    // ---------------------------------------------------------------------
    // Tiles and the hand
    // ---------------------------------------------------------------------

    fn spawn_tile(&mut self, letter: Letter) -> Tile {
        let id = TileId(self.next_tile_id);
        self.next_tile_id += 1;
        self.tiles_created += 1;
        Tile::new(id, letter)
    }

    /// Hand tiles never move under gravity, so they count as settled.
    fn place_in_hand(&mut self, col: usize, mut tile: Tile) {
        tile.settled = true;
        if let Err(tile) = self.board.place(GridPos::new(HAND_ROW, col), tile) {
            warn!("hand slot {} occupied, dropping spawn {:?}", col, tile.id);
            self.tiles_created -= 1;
        }
    }

    /// Fill every empty hand slot at once and drop pending refills.
    fn fill_hand(&mut self) {
        self.timers.cancel_refills();
        for col in 0..HAND_WIDTH {
            if self.board.is_empty(GridPos::new(HAND_ROW, col)) {
                let letter = self.letters.next_letter();
                let tile = self.spawn_tile(letter);
                self.place_in_hand(col, tile);
            }
        }
    }

    fn schedule_refill(&mut self, col: usize) {
        let kind = TimerKind::Refill(col);
        if let Some(due) = self.timers.due_at(kind) {
            trace!("refill {} rescheduled (was due at {})", col, due);
        }
        self.schedule_in(kind, REFILL_DELAY_MS);
    }

    fn refill(&mut self, col: usize) {
        if self.phase != Phase::Playing {
            return;
        }
        let slot = GridPos::new(HAND_ROW, col);
        if !self.board.is_empty(slot) {
            return;
        }
        // The last empty slot stays free while a tile is held, so the held tile
        // always has somewhere to land.
        if self.held.is_some() && self.board.empty_positions().count() <= 1 {
            debug!("refill {} postponed while a tile is held", col);
            self.schedule_refill(col);
            return;
        }
        let letter = self.letters.next_letter();
        let tile = self.spawn_tile(letter);
        self.place_in_hand(col, tile);
        self.check_full();
    }

    /// Mark `tile` as freshly placed: unsettled, and not allowed to fall
    /// before the fall delay has passed.
    fn arm_fall(&mut self, id: TileId) {
        self.fall_ready.insert(id, self.now + FALL_DELAY_MS);
    }

    // ---------------------------------------------------------------------
    // Input intents
    // ---------------------------------------------------------------------

    /// Drop the hand tile at `col` into the first empty slot below the hand.
    /// No-op if the slot is empty, input is disabled, or the board below is full.
    pub fn hand_tap(&mut self, col: usize) -> bool {
        if !self.input_enabled() {
            return false;
        }
        let from = GridPos::new(HAND_ROW, col);
        if !self.board.is_occupied(from) {
            return false;
        }
        let Some(to) = self.board.first_empty_below_hand() else {
            debug!("hand tap {} ignored, no empty slot", col);
            return false;
        };
        if !self.board.move_tile(from, to) {
            return false;
        }
        self.board.set_settled(to, false);
        let id = self.board.get(to).map(|t| t.id);
        if let Some(id) = id {
            self.arm_fall(id);
            self.events.push(GameEvent::TileMoved(id));
        }
        self.schedule_refill(col);
        debug!("hand tap {} -> {}", col, to);
        true
    }

    /// Whether a drag may start at `pos`: any hand tile, or a settled,
    /// uncovered board tile.
    pub fn can_drag(&self, pos: GridPos) -> bool {
        if !self.input_enabled() || self.held.is_some() {
            return false;
        }
        match self.board.get(pos) {
            None => false,
            Some(_) if pos.is_hand() => true,
            Some(tile) => tile.settled && !self.board.is_covered(pos),
        }
    }

    /// Lift the tile at `pos`. Rejected drags create no state.
    pub fn begin_drag(&mut self, pos: GridPos) -> bool {
        if !self.can_drag(pos) {
            return false;
        }
        let Some(mut tile) = self.board.remove(pos) else {
            return false;
        };
        tile.settled = false;
        self.fall_ready.remove(&tile.id);
        debug!("drag {:?} from {}", tile.id, pos);
        self.held = Some(Held { tile, origin: pos });
        true
    }

    /// Release the held tile over `target`. Falls back to the origin, then the
    /// nearest empty slot, then forces the origin. Returns where it landed.
    pub fn end_drag(&mut self, target: Option<GridPos>) -> Option<GridPos> {
        let Held { tile, origin } = self.held.take()?;
        let id = tile.id;
        let dest = match target.filter(|&t| self.board.is_empty(t)) {
            Some(t) => t,
            None if self.board.is_empty(origin) => origin,
            None => match self.board.nearest_empty(origin) {
                Some(near) => {
                    debug!("origin {} filled during drag, using {}", origin, near);
                    near
                }
                None => {
                    warn!("no empty slot for {:?}, forcing it back to {}", id, origin);
                    origin
                }
            },
        };
        if let Some(displaced) = self.board.force_place(dest, tile) {
            warn!("{:?} displaced by forced drop", displaced.id);
            self.tiles_destroyed += 1;
        }
        if dest.is_hand() {
            self.board.set_settled(dest, true);
            self.timers.cancel(TimerKind::Refill(dest.col));
        } else {
            self.arm_fall(id);
        }
        if origin.is_hand() && self.board.is_empty(origin) {
            self.schedule_refill(origin.col);
        }
        self.events.push(GameEvent::TileMoved(id));
        debug!("drop {:?} at {}", id, dest);
        if dest.is_hand() {
            self.check_full();
        }
        Some(dest)
    }

    // ---------------------------------------------------------------------
    // Gravity
    // ---------------------------------------------------------------------

    fn gravity_tick(&mut self) {
        if self.phase != Phase::Playing {
            return;
        }
        let settled = self.gravity_step();
        self.schedule_in(TimerKind::Gravity, GRAVITY_TICK_MS);
        if settled > 0 {
            self.check_full();
        }
    }

    /// One gravity pass, bottom row first so lower tiles vacate before upper
    /// tiles look for space. Returns the number of settle events.
    fn gravity_step(&mut self) -> usize {
        let mut settle_events = 0;
        for row in (HAND_ROW + 1..ROW_COUNT).rev() {
            for col in 0..geometry::row_width(row) {
                let pos = GridPos::new(row, col);
                let Some(tile) = self.board.get(pos) else {
                    continue;
                };
                if tile.settled {
                    continue;
                }
                let id = tile.id;
                if row < BOTTOM_ROW {
                    if let Some(target) = self.board.free_fall_target(pos) {
                        let ready = self.fall_ready.get(&id).is_none_or(|&t| self.now >= t);
                        if ready && self.board.move_tile(pos, target) {
                            self.arm_fall(id);
                            self.events.push(GameEvent::TileMoved(id));
                            trace!("{:?} fell {} -> {}", id, pos, target);
                        }
                        continue;
                    }
                }
                if self.board.rests_on_settled(pos) {
                    self.board.set_settled(pos, true);
                    self.fall_ready.remove(&id);
                    settle_events += 1;
                }
            }
        }
        settle_events
    }

    // ---------------------------------------------------------------------
    // Evaluation
    // ---------------------------------------------------------------------

    fn check_full(&mut self) {
        if self.phase == Phase::Playing && self.board.is_full() {
            self.evaluate();
        }
    }

    fn evaluate(&mut self) {
        if !self.dictionary.is_loaded() {
            debug!("board full but dictionary not loaded; evaluation deferred");
            return;
        }
        let results: Vec<RowResult> = (0..ROW_COUNT)
            .filter_map(|row| self.board.score_row(row, &self.dictionary))
            .collect();
        let (total, perfect) = credited_score(&results);
        self.score += total;
        for result in results.iter().filter(|r| r.valid) {
            self.events.push(GameEvent::WordCleared(geometry::row_width(result.row)));
        }
        if perfect {
            self.events.push(GameEvent::PerfectBoard);
        }
        info!(
            "board evaluated: {} valid rows, +{}{}",
            results.iter().filter(|r| r.valid).count(),
            total,
            if perfect { " (perfect)" } else { "" }
        );
        self.results = results;
        self.perfect = perfect;
        self.phase = Phase::Clearing;
        self.timers.cancel(TimerKind::Gravity);
        self.timers.cancel_refills();
        let display = if perfect { PERFECT_DISPLAY_MS } else { CLEAR_DISPLAY_MS };
        self.schedule_in(TimerKind::Display, display);
    }

    fn finish_clearing(&mut self) {
        if self.phase != Phase::Clearing {
            return;
        }
        self.clear_board();
        self.results.clear();
        self.perfect = false;
        self.events.push(GameEvent::BoardCleared);
        if self.remaining_secs == 0 {
            self.end_round();
            return;
        }
        self.phase = Phase::Playing;
        self.fill_hand();
        self.schedule_in(TimerKind::Gravity, GRAVITY_TICK_MS);
    }
}

/// Points credited for one evaluation and whether it was a perfect board.
/// A perfect board doubles the sum of the same per-row results.
pub fn credited_score(results: &[RowResult]) -> (u32, bool) {
    let sum: u32 = results.iter().map(|r| r.points).sum();
    let perfect = !results.is_empty() && results.iter().all(|r| r.valid);
    (if perfect { sum * 2 } else { sum }, perfect)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: [&str; ROW_COUNT] = ["RETAINS", "ORANGE", "TABLE", "TIDE", "CAT", "AT"];
    const INTRO_MS: u64 = (INTRO_WORD.len() as u64 - 1) * INTRO_STEP_MS + INTRO_HOLD_MS;

    fn config() -> GameConfig {
        GameConfig { round_secs: 60, seed: Some(2024) }
    }

    fn all_words() -> Dictionary {
        Dictionary::from_words(WORDS)
    }

    /// Game in `Playing` with the word list loaded.
    fn playing(dictionary: Dictionary) -> Game {
        let mut game = Game::new(&config(), vec![]);
        game.install_dictionary(dictionary);
        assert!(game.tap());
        game.advance(INTRO_MS);
        assert_eq!(game.phase(), Phase::Playing);
        game
    }

    fn step(game: &mut Game, ms: u64) {
        let now = game.now() + ms;
        game.advance(now);
    }

    fn assert_conserved(game: &Game) {
        assert_eq!(game.live_tiles() as u64, game.expected_tiles());
    }

    /// Replace the board with `WORDS`, every tile settled except row 1's first,
    /// so the next gravity tick produces a settle event.
    fn fill_with_words(game: &mut Game) {
        game.clear_board();
        game.timers.cancel_refills();
        for (row, word) in WORDS.iter().enumerate() {
            for (col, ch) in word.chars().enumerate() {
                let tile = game.spawn_tile(Letter::new(ch).unwrap());
                let pos = GridPos::new(row, col);
                game.board.place(pos, tile).unwrap();
                game.board.set_settled(pos, pos != GridPos::new(1, 0));
            }
        }
        assert!(game.board().is_full());
    }

    #[test_log::test]
    fn intro_spells_brand_word_then_fills_hand() {
        let mut game = Game::new(&config(), vec![]);
        assert_eq!(game.phase(), Phase::Start);
        game.tap();
        assert_eq!(game.phase(), Phase::Intro);
        game.advance(INTRO_STEP_MS * 6);
        assert_eq!(game.board().read_row(HAND_ROW).as_deref(), Some("cascade"));
        assert!(!game.hand_tap(0), "input is disabled during the intro");
        game.advance(INTRO_MS);
        assert_eq!(game.phase(), Phase::Playing);
        assert!(game.board().read_row(HAND_ROW).is_some());
        assert_eq!(game.board().tile_count(), HAND_WIDTH);
        assert!(game.timers.is_pending(TimerKind::Clock));
        let events = game.drain_events();
        assert_eq!(events.iter().filter(|e| matches!(e, GameEvent::IntroLetter(_))).count(), 7);
        assert_conserved(&game);
    }

    #[test_log::test]
    fn same_seed_same_hand() {
        let a = playing(all_words());
        let b = playing(all_words());
        assert_eq!(a.board().read_row(HAND_ROW), b.board().read_row(HAND_ROW));
        assert_eq!(a.letters.seed(), 2024);
    }

    #[test_log::test]
    fn hand_tap_drops_and_refills_after_delay() {
        let mut game = playing(all_words());
        assert!(game.hand_tap(3));
        assert!(game.board().is_empty(GridPos::new(HAND_ROW, 3)));
        assert!(game.board().is_occupied(GridPos::new(1, 0)));
        step(&mut game, REFILL_DELAY_MS - 1);
        assert!(game.board().is_empty(GridPos::new(HAND_ROW, 3)));
        step(&mut game, 1);
        assert!(game.board().is_occupied(GridPos::new(HAND_ROW, 3)));
        assert_conserved(&game);
    }

    #[test_log::test]
    fn tapped_tile_falls_one_row_per_step_to_the_bottom() {
        let mut game = playing(all_words());
        game.hand_tap(0);
        let id = game.board().get(GridPos::new(1, 0)).unwrap().id;
        let mut rows = vec![1];
        for _ in 0..100 {
            step(&mut game, GRAVITY_TICK_MS);
            let pos = game.board().find(id).unwrap();
            if *rows.last().unwrap() != pos.row {
                rows.push(pos.row);
            }
        }
        assert_eq!(rows, vec![1, 2, 3, 4, 5]);
        let pos = game.board().find(id).unwrap();
        assert_eq!(pos, GridPos::new(BOTTOM_ROW, 0));
        assert!(game.board().get(pos).unwrap().settled);
    }

    #[test_log::test]
    fn competing_tiles_prefer_left_target() {
        let mut game = playing(all_words());
        game.clear_board();
        let tile = game.spawn_tile(Letter::new('A').unwrap());
        game.board.place(GridPos::new(4, 1), tile).unwrap();
        // (4,1) may fall to (5,0) or (5,1); left wins.
        step(&mut game, GRAVITY_TICK_MS);
        assert_eq!(game.board().find(TileId(game.next_tile_id - 1)), Some(GridPos::new(5, 0)));
    }

    #[test_log::test]
    fn hand_tap_with_full_board_below_is_noop() {
        let mut game = playing(all_words());
        for pos in geometry::positions().filter(|p| !p.is_hand()) {
            let tile = game.spawn_tile(Letter::new('E').unwrap());
            game.board.place(pos, tile).unwrap();
        }
        game.board.remove(GridPos::new(HAND_ROW, 2));
        game.tiles_destroyed += 1;
        let before = game.board().get(GridPos::new(HAND_ROW, 4)).cloned();
        assert!(!game.hand_tap(4));
        assert_eq!(game.board().get(GridPos::new(HAND_ROW, 4)).cloned(), before);
        assert!(!game.timers.is_pending(TimerKind::Refill(4)));
        assert_conserved(&game);
    }

    #[test_log::test]
    fn refill_is_rescheduled_not_stacked() {
        let mut game = playing(all_words());
        game.hand_tap(3);
        let first_due = game.timers.due_at(TimerKind::Refill(3)).unwrap();
        step(&mut game, 100);
        // Slot 3 is filled from elsewhere in the hand, then emptied again.
        assert!(game.board.move_tile(GridPos::new(HAND_ROW, 0), GridPos::new(HAND_ROW, 3)));
        assert!(game.hand_tap(3));
        assert_eq!(game.timers.due_at(TimerKind::Refill(3)), Some(first_due + 100));
        let refills = [TimerKind::Refill(0), TimerKind::Refill(3)]
            .iter()
            .filter(|&&k| game.timers.is_pending(k))
            .count();
        assert_eq!(refills, 1);
        assert_eq!(game.timers.len(), 3, "gravity, clock and a single refill");
    }

    #[test_log::test]
    fn full_board_with_all_words_doubles_score() {
        let mut game = playing(all_words());
        fill_with_words(&mut game);
        step(&mut game, GRAVITY_TICK_MS);
        assert_eq!(game.phase(), Phase::Clearing);
        assert!(game.is_perfect());
        assert_eq!(game.score(), 2 * (42 + 28 + 21 + 10 + 8 + 2));
        let events = game.drain_events();
        assert!(events.contains(&GameEvent::PerfectBoard));
        assert_eq!(events.iter().filter(|e| matches!(e, GameEvent::WordCleared(_))).count(), 6);
    }

    #[test_log::test]
    fn one_invalid_row_means_no_doubling() {
        let dictionary = Dictionary::from_words(WORDS.iter().filter(|w| **w != "ORANGE"));
        let mut game = playing(dictionary);
        fill_with_words(&mut game);
        step(&mut game, GRAVITY_TICK_MS);
        assert_eq!(game.phase(), Phase::Clearing);
        assert!(!game.is_perfect());
        assert_eq!(game.score(), 42 + 21 + 10 + 8 + 2);
        let orange = &game.results()[1];
        assert_eq!((orange.word.as_str(), orange.valid, orange.points), ("orange", false, 0));
        for result in game.results() {
            assert_eq!(result.points > 0, game.dictionary().contains(&result.word));
        }
    }

    #[test_log::test]
    fn full_board_is_evaluated_exactly_once() {
        let mut game = playing(all_words());
        fill_with_words(&mut game);
        step(&mut game, GRAVITY_TICK_MS);
        let score = game.score();
        game.check_full();
        game.gravity_tick();
        step(&mut game, CLEAR_DISPLAY_MS - 100);
        assert_eq!(game.phase(), Phase::Clearing);
        assert_eq!(game.score(), score);
        assert!(!game.timers.is_pending(TimerKind::Gravity));
    }

    #[test_log::test]
    fn refill_of_last_hand_slot_triggers_evaluation() {
        let mut game = playing(all_words());
        fill_with_words(&mut game);
        let slot = GridPos::new(HAND_ROW, 3);
        assert!(game.board.remove(slot).is_some());
        game.tiles_destroyed += 1;
        game.schedule_refill(3);
        step(&mut game, REFILL_DELAY_MS - 1);
        assert_eq!(game.phase(), Phase::Playing);
        step(&mut game, 1);
        assert!(game.board().is_full());
        assert_eq!(game.phase(), Phase::Clearing);
        assert_eq!(game.results().len(), ROW_COUNT);
        assert_conserved(&game);
    }

    #[test_log::test]
    fn perfect_board_stays_on_display_longer() {
        let mut game = playing(all_words());
        fill_with_words(&mut game);
        step(&mut game, GRAVITY_TICK_MS);
        assert!(game.is_perfect());
        step(&mut game, CLEAR_DISPLAY_MS);
        assert_eq!(game.phase(), Phase::Clearing);
        step(&mut game, PERFECT_DISPLAY_MS - CLEAR_DISPLAY_MS - 1);
        assert_eq!(game.phase(), Phase::Clearing);
        step(&mut game, 1);
        assert_eq!(game.phase(), Phase::Playing);
    }

    #[test_log::test]
    fn failed_word_list_clears_the_board_without_scoring() {
        let mut game = Game::new(&config(), vec![]);
        game.tap();
        game.advance(INTRO_MS);
        fill_with_words(&mut game);
        step(&mut game, GRAVITY_TICK_MS);
        assert_eq!(game.phase(), Phase::Playing);
        game.drain_events();
        game.install_dictionary(Dictionary::empty());
        assert_eq!(game.phase(), Phase::Clearing);
        assert_eq!(game.score(), 0);
        assert!(!game.is_perfect());
        assert_eq!(game.results().len(), ROW_COUNT);
        assert!(game.results().iter().all(|r| !r.valid && r.points == 0));
        assert!(!game.drain_events().iter().any(|e| matches!(e, GameEvent::WordCleared(_))));
    }

    #[test_log::test]
    fn lifting_a_tile_leaves_the_rest_settled() {
        let mut game = playing(all_words());
        fill_with_words(&mut game);
        game.board.set_settled(GridPos::new(1, 0), true);
        for col in [0, 1] {
            assert!(game.board.remove(GridPos::new(HAND_ROW, col)).is_some());
            game.tiles_destroyed += 1;
        }
        let lifted = GridPos::new(1, 0);
        assert!(game.begin_drag(lifted));
        assert!(game.board().tiles().all(|(_, t)| t.settled));
        assert_eq!(game.end_drag(Some(lifted)), Some(lifted));
        assert_conserved(&game);
    }

    #[test_log::test]
    fn clearing_returns_to_play_with_fresh_hand() {
        let dictionary = Dictionary::from_words(["at"]);
        let mut game = playing(dictionary);
        fill_with_words(&mut game);
        step(&mut game, GRAVITY_TICK_MS);
        assert_eq!(game.phase(), Phase::Clearing);
        assert_eq!(game.score(), 2);
        assert!(!game.hand_tap(0));
        assert!(!game.begin_drag(GridPos::new(HAND_ROW, 0)));
        step(&mut game, CLEAR_DISPLAY_MS);
        assert_eq!(game.phase(), Phase::Playing);
        assert_eq!(game.board().tile_count(), HAND_WIDTH);
        assert!(game.results().is_empty());
        assert!(game.drain_events().contains(&GameEvent::BoardCleared));
        assert_conserved(&game);
    }

    #[test_log::test]
    fn evaluation_waits_for_dictionary() {
        let mut game = Game::new(&config(), vec![]);
        game.tap();
        game.advance(INTRO_MS);
        fill_with_words(&mut game);
        step(&mut game, GRAVITY_TICK_MS);
        assert_eq!(game.phase(), Phase::Playing);
        assert_eq!(game.score(), 0);
        game.install_dictionary(all_words());
        assert_eq!(game.phase(), Phase::Clearing);
        assert!(game.score() > 0);
    }

    #[test_log::test]
    fn clock_ends_round_and_cancels_timers() {
        let mut game = playing(all_words());
        game.hand_tap(1);
        step(&mut game, 60 * CLOCK_TICK_MS);
        assert_eq!(game.phase(), Phase::RoundEnd);
        assert_eq!(game.remaining_secs(), 0);
        assert!(game.timers.is_empty());
        let frozen: Vec<_> = game.board().tiles().map(|(p, t)| (p, t.id)).collect();
        step(&mut game, 10_000);
        let after: Vec<_> = game.board().tiles().map(|(p, t)| (p, t.id)).collect();
        assert_eq!(frozen, after);
        assert!(game
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::RoundEnded { score: 0, rank: Some(0) })));
        assert_eq!(game.high_scores(), &[0]);
    }

    #[test_log::test]
    fn time_up_during_clearing_ends_after_display() {
        let mut game = playing(all_words());
        step(&mut game, 59 * CLOCK_TICK_MS);
        fill_with_words(&mut game);
        step(&mut game, GRAVITY_TICK_MS);
        assert_eq!(game.phase(), Phase::Clearing);
        step(&mut game, CLOCK_TICK_MS);
        assert_eq!(game.remaining_secs(), 0);
        assert_eq!(game.phase(), Phase::Clearing);
        step(&mut game, PERFECT_DISPLAY_MS);
        assert_eq!(game.phase(), Phase::RoundEnd);
        assert_eq!(game.high_scores(), &[game.score()]);
    }

    #[test_log::test]
    fn restart_from_round_end() {
        let mut game = playing(all_words());
        step(&mut game, 60 * CLOCK_TICK_MS);
        assert_eq!(game.phase(), Phase::RoundEnd);
        assert!(game.tap());
        assert_eq!(game.phase(), Phase::Intro);
        assert_eq!(game.score(), 0);
        assert_eq!(game.remaining_secs(), 60);
        assert_conserved(&game);
    }

    #[test_log::test]
    fn covered_tile_cannot_be_dragged() {
        let mut game = playing(all_words());
        game.clear_board();
        let below = game.spawn_tile(Letter::new('A').unwrap());
        let above = game.spawn_tile(Letter::new('B').unwrap());
        game.board.place(GridPos::new(5, 0), below).unwrap();
        game.board.set_settled(GridPos::new(5, 0), true);
        game.board.place(GridPos::new(4, 1), above).unwrap();
        game.board.set_settled(GridPos::new(4, 1), true);
        assert!(!game.begin_drag(GridPos::new(5, 0)));
        assert!(game.held().is_none());
        assert!(game.board().is_occupied(GridPos::new(5, 0)));
        assert!(game.begin_drag(GridPos::new(4, 1)));
    }

    #[test_log::test]
    fn unsettled_tile_cannot_be_dragged() {
        let mut game = playing(all_words());
        game.hand_tap(0);
        assert!(!game.begin_drag(GridPos::new(1, 0)));
        assert!(game.begin_drag(GridPos::new(HAND_ROW, 1)));
    }

    #[test_log::test]
    fn drag_to_empty_slot_relocates() {
        let mut game = playing(all_words());
        assert!(game.begin_drag(GridPos::new(HAND_ROW, 2)));
        assert_conserved(&game);
        assert_eq!(game.end_drag(Some(GridPos::new(3, 1))), Some(GridPos::new(3, 1)));
        assert!(game.timers.is_pending(TimerKind::Refill(2)));
        assert_conserved(&game);
    }

    #[test_log::test]
    fn drop_on_occupied_slot_returns_to_origin() {
        let mut game = playing(all_words());
        game.begin_drag(GridPos::new(HAND_ROW, 2));
        assert_eq!(game.end_drag(Some(GridPos::new(HAND_ROW, 5))), Some(GridPos::new(HAND_ROW, 2)));
        assert!(!game.timers.is_pending(TimerKind::Refill(2)));
        assert_eq!(game.end_drag(None), None);
    }

    #[test_log::test]
    fn drop_falls_back_to_nearest_when_origin_filled() {
        let mut game = playing(all_words());
        game.clear_board();
        let a = game.spawn_tile(Letter::new('A').unwrap());
        game.board.place(GridPos::new(5, 0), a).unwrap();
        game.board.set_settled(GridPos::new(5, 0), true);
        assert!(game.begin_drag(GridPos::new(5, 0)));
        // Something else lands in the origin while dragging.
        let b = game.spawn_tile(Letter::new('B').unwrap());
        game.board.place(GridPos::new(5, 0), b).unwrap();
        let landed = game.end_drag(Some(GridPos::new(5, 0))).unwrap();
        assert_eq!(landed, GridPos::new(5, 1));
        assert_conserved(&game);
    }

    #[test_log::test]
    fn refill_keeps_a_slot_free_for_held_tile() {
        let mut game = playing(all_words());
        game.clear_board();
        for pos in geometry::positions() {
            let tile = game.spawn_tile(Letter::new('E').unwrap());
            game.board.place(pos, tile).unwrap();
            game.board.set_settled(pos, true);
        }
        assert!(game.begin_drag(GridPos::new(HAND_ROW, 0)));
        // The origin gets filled while the tile is held; slot 6 is the last gap.
        let filler = game.spawn_tile(Letter::new('E').unwrap());
        game.board.place(GridPos::new(HAND_ROW, 0), filler).unwrap();
        game.board.remove(GridPos::new(HAND_ROW, 6));
        game.tiles_destroyed += 1;
        game.schedule_refill(6);
        step(&mut game, REFILL_DELAY_MS);
        assert!(game.board().is_empty(GridPos::new(HAND_ROW, 6)));
        assert_eq!(game.end_drag(None), Some(GridPos::new(HAND_ROW, 6)));
        assert_conserved(&game);
        assert_eq!(game.phase(), Phase::Clearing, "dropping into the last hand slot fills the board");
    }

    #[test_log::test]
    fn dropped_tile_slides_down_the_pile_and_settles() {
        let mut game = playing(all_words());
        game.clear_board();
        for pos in [GridPos::new(5, 0), GridPos::new(5, 1), GridPos::new(4, 1)] {
            let tile = game.spawn_tile(Letter::new('O').unwrap());
            game.board.place(pos, tile).unwrap();
            game.board.set_settled(pos, true);
        }
        assert!(!game.begin_drag(GridPos::new(5, 1)));
        assert!(game.begin_drag(GridPos::new(4, 1)));
        assert_eq!(game.end_drag(Some(GridPos::new(2, 0))), Some(GridPos::new(2, 0)));
        step(&mut game, 400);
        assert_eq!(game.board().get(GridPos::new(4, 0)).map(|t| t.settled), Some(true));
        assert!(game.board().tiles().all(|(_, t)| t.settled));
        assert_conserved(&game);
    }

    #[test_log::test]
    fn settled_tiles_stay_put() {
        let mut game = playing(all_words());
        let mut settled_at: HashMap<TileId, GridPos> = HashMap::new();
        for i in 0..200 {
            if i % 7 == 0 {
                game.hand_tap(i % HAND_WIDTH);
            }
            step(&mut game, GRAVITY_TICK_MS);
            if game.phase() != Phase::Playing {
                break;
            }
            for (pos, tile) in game.board().tiles().filter(|(p, _)| !p.is_hand()) {
                if let Some(&prev) = settled_at.get(&tile.id) {
                    assert_eq!(prev, pos, "{:?} moved after settling", tile.id);
                }
                if tile.settled {
                    settled_at.insert(tile.id, pos);
                }
            }
        }
        assert!(!settled_at.is_empty());
    }

    #[test_log::test]
    fn tiles_are_conserved_over_a_round() {
        let mut game = playing(Dictionary::from_words(["at", "ta"]));
        let mut pick = LetterGen::new(5);
        for i in 0..2000u64 {
            match pick.next_letter().char() {
                'A' | 'E' => {
                    game.hand_tap((i % HAND_WIDTH as u64) as usize);
                }
                'T' | 'R' => {
                    let from = geometry::positions().nth((i % 27) as usize).unwrap();
                    if game.begin_drag(from) {
                        let to = geometry::positions().nth(((i * 7) % 27) as usize);
                        game.end_drag(to);
                    }
                }
                _ => {}
            }
            assert_conserved(&game);
            step(&mut game, 35);
            assert_conserved(&game);
            let ids: std::collections::HashSet<_> = game.board().tiles().map(|(_, t)| t.id).collect();
            assert_eq!(ids.len(), game.board().tile_count(), "duplicate tile identity");
        }
    }

    #[test]
    fn credited_score_doubles_only_when_all_valid() {
        let row = |valid, points| RowResult { row: 0, word: String::new(), valid, points };
        assert_eq!(credited_score(&[row(true, 5), row(true, 7)]), (24, true));
        assert_eq!(credited_score(&[row(true, 5), row(false, 0)]), (5, false));
        assert_eq!(credited_score(&[]), (0, false));
    }
}
