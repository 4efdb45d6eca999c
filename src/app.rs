//! App: terminal init, main loop, event and intent handling.

use crate::anim::Anim;
use crate::audio::{self, Audio, Cue};
use crate::dictionary::{Dictionary, DictionaryLoader};
use crate::game::{Game, GameEvent};
use crate::geometry::Layout as BoardLayout;
use crate::highscores;
use crate::input::{Intent, Pointer, key_to_intent};
use crate::theme::Theme;
use crate::ui::{self, View};
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use log::{debug, info, warn};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

pub struct App {
    args: Args,
    theme: Theme,
    game: Game,
    anim: Anim,
    audio: Box<dyn Audio>,
    pointer: Pointer,
    loader: Option<DictionaryLoader>,
    /// Logical time zero for the game clock.
    started: Instant,
    last_frame: Instant,
    /// Terminal area of the last frame; mouse hit-testing uses its layout.
    area: Rect,
    clear_effect: Option<Effect>,
    clear_effect_time: Option<Instant>,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Result<Self> {
        let high_scores = highscores::load_high_scores();
        debug!("loaded {} high scores", high_scores.len());
        let loader = DictionaryLoader::spawn(args.words.clone());
        let now = Instant::now();
        Ok(Self {
            game: Game::new(&config, high_scores),
            anim: Anim::new(!args.no_animation),
            audio: audio::from_config(args.quiet),
            pointer: Pointer::new(),
            loader: Some(loader),
            started: now,
            last_frame: now,
            area: Rect::default(),
            clear_effect: None,
            clear_effect_time: None,
            args,
            theme,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let mut terminal = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), DisableMouseCapture);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn now_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started).as_millis() as u64
    }

    fn layout(&self) -> BoardLayout {
        ui::board_layout(self.area)
    }

    fn poll_dictionary(&mut self) {
        let Some(result) = self.loader.as_ref().and_then(DictionaryLoader::poll) else {
            return;
        };
        self.loader = None;
        match result {
            Ok(dictionary) => self.game.install_dictionary(dictionary),
            Err(e) => {
                warn!("{}; no word will score this session", e);
                self.game.install_dictionary(Dictionary::empty());
            }
        }
    }

    /// Returns true to quit.
    fn apply(&mut self, intent: Intent) -> bool {
        match intent {
            Intent::Quit => return true,
            Intent::Tap => {
                self.game.tap();
            }
            Intent::HandTap(col) => {
                self.game.hand_tap(col);
            }
            Intent::BeginDrag(pos) => {
                if !self.game.begin_drag(pos) {
                    debug!("drag rejected at {}", pos);
                    self.pointer.cancel();
                }
            }
            Intent::EndDrag(target) => {
                let held = self.game.held().map(|(tile, _)| tile.id);
                if let (Some(id), Some(_)) = (held, self.game.end_drag(target)) {
                    if let Some(at) = self.pointer.position {
                        self.anim.warp(id, at);
                    }
                }
            }
        }
        false
    }

    fn handle_game_events(&mut self) {
        for event in self.game.drain_events() {
            if let Some(cue) = Cue::for_event(&event) {
                self.audio.play(cue);
            }
            match event {
                GameEvent::RoundStarted { .. } => {
                    self.anim.clear();
                    self.clear_effect = None;
                }
                GameEvent::BoardCleared if !self.args.no_animation => {
                    self.clear_effect = Some(ui::clear_effect(&self.theme, self.area));
                    self.clear_effect_time = None;
                }
                GameEvent::RoundEnded { score, rank: Some(rank) } => {
                    info!("score {} ranks #{}", score, rank + 1);
                    if let Err(e) = highscores::save_high_scores(self.game.high_scores()) {
                        warn!("could not save high scores: {}", e);
                    }
                }
                _ => {}
            }
        }
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate);
        loop {
            let now = Instant::now();
            self.poll_dictionary();
            self.game.advance(self.now_ms(now));
            self.handle_game_events();

            let size = terminal.size()?;
            self.area = Rect::new(0, 0, size.width, size.height);
            let dt = now.saturating_duration_since(self.last_frame).as_millis() as u64;
            self.last_frame = now;
            self.anim.update(self.game.board(), &self.layout(), dt);

            let pointer = self.pointer.position.filter(|_| self.pointer.is_lifted());
            let view = View { theme: &self.theme, anim: &self.anim, pointer };
            terminal.draw(|f| {
                ui::draw(f, &self.game, &view, &mut self.clear_effect, &mut self.clear_effect_time, now)
            })?;
            if self.clear_effect.as_ref().is_some_and(Effect::done) {
                self.clear_effect = None;
                self.clear_effect_time = None;
            }

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if !event::poll(timeout)? {
                continue;
            }
            while event::poll(Duration::ZERO)? {
                let intents = match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => key_to_intent(key).into_iter().collect(),
                    Event::Mouse(mouse) => self.pointer.handle(mouse, &self.layout()),
                    _ => Vec::new(),
                };
                // Intents apply at the time they were read.
                self.game.advance(self.now_ms(Instant::now()));
                for intent in intents {
                    if self.apply(intent) {
                        info!("quit");
                        return Ok(());
                    }
                }
            }
        }
    }
}
