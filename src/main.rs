//! Cascade: a falling-tile word puzzle in the terminal.

mod anim;
mod app;
mod audio;
mod board;
mod dictionary;
mod game;
mod geometry;
mod highscores;
mod input;
mod letters;
mod scheduler;
mod scoring;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Options derived from CLI that affect the rules of a round.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub round_secs: u32,
    /// Fixed letter seed; every round replays the same letters.
    pub seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    info!("starting cascadetui {}", env!("CARGO_PKG_VERSION"));
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        warn!("theme not loaded: {}", e);
        theme::Theme::default()
    });
    let config = GameConfig {
        round_secs: args.round_secs.max(1),
        seed: args.seed,
    };
    let mut app = App::new(args, config, theme)?;
    app.run()?;
    Ok(())
}

/// Log to a file so output never lands on the game screen. Filter with RUST_LOG.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let path = path.map_or_else(|| std::env::temp_dir().join("cascadetui.log"), Path::to_path_buf);
    let log_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();
    Ok(())
}

/// Triangular falling-tile word puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "cascadetui",
    version,
    about = "Falling-tile word puzzle in the terminal. Fill the triangle; every row that spells a word scores.",
    long_about = "Cascade is a terminal word puzzle.\n\n\
        Letters wait in the hand at the top. Drop them into the triangular board below, where they \
        fall and pile up. When every slot is full, each row is read left to right; rows that spell \
        a dictionary word score by letter value and length. Make every row a word for double points.\n\n\
        CONTROLS:\n  Click hand tile  Drop it      Drag tile   Move an uncovered tile\n  1-7              Drop slot    Space       Start round     Q / Esc   Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Word list, one word per line.
    #[arg(short, long, default_value = "/usr/share/dict/words", value_name = "FILE")]
    pub words: PathBuf,

    /// Round length in seconds.
    #[arg(short, long, default_value_t = game::DEFAULT_ROUND_SECS, value_name = "SECS")]
    pub round_secs: u32,

    /// Fixed seed for the letter sequence (same letters every round).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable tile movement and clear animations.
    #[arg(long)]
    pub no_animation: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE", value_parser = parse_frame_rate)]
    pub frame_rate: f64,

    /// Log file (default: cascadetui.log in the temp directory).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// No terminal bell.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Frames per second: a finite number from 1 to 240.
fn parse_frame_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if rate.is_finite() && (1.0..=240.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("{} is not between 1 and 240", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
