//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::Palette;
use crate::letters::Letter;
use crate::scoring;
use log::warn;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Board and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Tile faces by letter value: common (1), mid (2-3), rare (4-5), premium (8+).
    pub tiers: [Color; 4],
    /// Letter on a tile face.
    pub tile_fg: Color,
    /// Hand row frame.
    pub hand: Color,
    /// Background.
    pub bg: Color,
    /// Empty slots and borders.
    pub div_line: Color,
    /// Text (score, clock).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Row results.
    pub valid: Color,
    pub invalid: Color,
    /// Secondary text.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// One Dark values (onedark.theme).
    pub fn onedark_default() -> Self {
        Self {
            tiers: [rgb(0xABB2BF), rgb(0x61AFEF), rgb(0xC678DD), rgb(0xE5C07B)],
            tile_fg: rgb(0x282C34),
            hand: rgb(0x56B6C2),
            bg: rgb(0x31353F),
            div_line: rgb(0x3F444F),
            main_fg: rgb(0xABB2BF),
            title: rgb(0xE5C07B),
            valid: rgb(0x98C379),
            invalid: rgb(0xE06C75),
            inactive_fg: rgb(0x5C6370),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or missing.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => Self::from_map(&parse_theme_file(&std::fs::read_to_string(p)?)),
            Some(p) => {
                warn!("theme {} not found, using defaults", p.display());
                Self::default()
            }
            None => Self::default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override tile and result colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => {
                self.tiers = [rgb(0xFFFFFF), rgb(0x00FFFF), rgb(0xFF00FF), rgb(0xFFFF00)];
                self.tile_fg = rgb(0x000000);
                self.valid = rgb(0x00FF00);
                self.invalid = rgb(0xFF0000);
            }
            Palette::Colorblind => {
                // Blue/orange instead of green/red for results.
                self.tiers = [rgb(0xBBBBBB), rgb(0x33BBEE), rgb(0xEE7733), rgb(0xEE3377)];
                self.valid = rgb(0x0077BB);
                self.invalid = rgb(0xCC3311);
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let d = Self::onedark_default();
        // Keys follow onedark.theme.
        Self {
            tiers: [
                get("main_fg").unwrap_or(d.tiers[0]),
                get("cpu_box").unwrap_or(d.tiers[1]),
                get("net_box").unwrap_or(d.tiers[2]),
                get("title").or_else(|| get("cpu_mid")).unwrap_or(d.tiers[3]),
            ],
            tile_fg: get("main_bg").unwrap_or(d.tile_fg),
            hand: get("hi_fg").or_else(|| get("proc_misc")).unwrap_or(d.hand),
            bg: get("meter_bg").unwrap_or(d.bg),
            div_line: get("div_line").unwrap_or(d.div_line),
            main_fg: get("main_fg").unwrap_or(d.main_fg),
            title: get("title").unwrap_or(d.title),
            valid: get("mem_box").or_else(|| get("cpu_start")).unwrap_or(d.valid),
            invalid: get("cpu_end").or_else(|| get("temp_end")).unwrap_or(d.invalid),
            inactive_fg: get("inactive_fg").unwrap_or(d.inactive_fg),
        }
    }

    /// Tile face colour for a letter, by point value.
    pub fn tile_color(&self, letter: Letter) -> Color {
        let tier = match scoring::letter_value(letter) {
            0..=1 => 0,
            2..=3 => 1,
            4..=5 => 2,
            _ => 3,
        };
        self.tiers[tier]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| {
            let (key, rest) = line.strip_prefix("theme[")?.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let digits: Vec<u8> = s
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()
        .ok_or_else(invalid)?;
    match digits[..] {
        [r1, r2, g1, g2, b1, b2] => Ok(Color::Rgb(r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2)),
        [r, g, b] => Ok(Color::Rgb(r * 17, g * 17, b * 17)),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
        assert!(parse_hex("#GG0000").is_err());
        assert!(parse_hex("#1234").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file("# comment\ntheme[meter_bg]=\"#31353F\"\ntheme[title]='#FFF'\n");
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
        assert_eq!(map.get("title"), Some(&"#FFF".to_string()));
    }

    #[test]
    fn theme_keys_override_defaults() {
        let map = parse_theme_file("theme[mem_box]=\"#010203\"");
        let theme = Theme::from_map(&map);
        assert_eq!(theme.valid, Color::Rgb(1, 2, 3));
        assert_eq!(theme.bg, Theme::default().bg);
    }

    #[test]
    fn rare_letters_get_premium_colour() {
        let theme = Theme::default();
        let z = Letter::new('Z').unwrap();
        let e = Letter::new('E').unwrap();
        assert_eq!(theme.tile_color(z), theme.tiers[3]);
        assert_eq!(theme.tile_color(e), theme.tiers[0]);
    }

    #[test]
    fn palette_changes_result_colours() {
        let mut theme = Theme::default();
        theme.apply_palette(Palette::Colorblind);
        assert_eq!(theme.valid, Color::Rgb(0x00, 0x77, 0xBB));
    }
}
