//! Layout and drawing: board, hand, row results, sidebar, start and round-end screens.
//! Reads game state only.

use crate::anim::Anim;
use crate::board::{RowResult, Tile};
use crate::game::{Game, Phase};
use crate::geometry::{self, GridPos, HAND_ROW, Layout as BoardLayout};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

pub const SIDEBAR_WIDTH: u16 = 26;
/// Fade-in of the fresh board after a clear.
const CLEAR_FADE_MS: u32 = 450;

/// Board area and sidebar for a terminal area.
pub fn split(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(SIDEBAR_WIDTH)])
        .split(area);
    (chunks[0], chunks[1])
}

/// Tile layout for a terminal area. Input uses the same layout to hit-test.
pub fn board_layout(area: Rect) -> BoardLayout {
    let (board, _) = split(area);
    BoardLayout::new(board.x, board.y, board.width, board.height)
}

/// Fade effect started when the board is cleared.
pub fn clear_effect(theme: &Theme, area: Rect) -> Effect {
    let (board, _) = split(area);
    fx::fade_from(theme.valid, theme.bg, (CLEAR_FADE_MS, Interpolation::QuadOut)).with_area(board)
}

/// Everything the renderer reads besides the game.
pub struct View<'a> {
    pub theme: &'a Theme,
    pub anim: &'a Anim,
    /// Mouse cell, for drawing a held tile.
    pub pointer: Option<(u16, u16)>,
}

/// Draw the current phase. Processes `clear_fx` if present.
pub fn draw(
    frame: &mut Frame,
    game: &Game,
    view: &View,
    clear_fx: &mut Option<Effect>,
    clear_fx_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    let theme = view.theme;
    Block::default().style(Style::default().bg(theme.bg)).render(area, frame.buffer_mut());
    let (board_area, sidebar_area) = split(area);
    let layout = board_layout(area);

    draw_board(frame.buffer_mut(), game, view, &layout, board_area);
    if game.phase() == Phase::Clearing {
        draw_results(frame.buffer_mut(), game, theme, &layout, board_area);
    }
    draw_sidebar(frame.buffer_mut(), game, theme, sidebar_area);

    match game.phase() {
        Phase::Start => draw_start(frame.buffer_mut(), game, theme, board_area),
        Phase::RoundEnd => draw_round_end(frame.buffer_mut(), game, theme, board_area),
        _ => {}
    }

    if let Some(effect) = clear_fx {
        let delta = clear_fx_time
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(std::time::Duration::ZERO);
        let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
        *clear_fx_time = Some(now);
        frame.render_effect(effect, board_area, TfxDuration::from_millis(delta_ms));
    }
}

fn tile_rect(layout: &BoardLayout, (x, y): (u16, u16), clip: Rect) -> Rect {
    Rect::new(x, y, layout.tile_w, layout.tile_h).intersection(clip)
}

fn draw_board(buf: &mut Buffer, game: &Game, view: &View, layout: &BoardLayout, area: Rect) {
    let theme = view.theme;
    for pos in geometry::positions() {
        let rect = tile_rect(layout, layout.to_pixel(pos), area);
        let border = if pos.row == HAND_ROW { theme.hand } else { theme.div_line };
        draw_slot(buf, rect, border, theme);
    }
    for (pos, tile) in game.board().tiles() {
        let at = view.anim.position(tile.id).unwrap_or_else(|| layout.to_pixel(pos));
        let border = if pos.row == HAND_ROW { theme.hand } else { theme.tile_color(tile.letter) };
        draw_tile(buf, tile_rect(layout, at, area), tile, border, theme);
    }
    if let (Some((tile, _)), Some((x, y))) = (game.held(), view.pointer) {
        // Centre the held tile under the mouse.
        let at = (x.saturating_sub(layout.tile_w / 2), y.saturating_sub(layout.tile_h / 2));
        draw_tile(buf, tile_rect(layout, at, area), tile, theme.title, theme);
    }
}

fn draw_slot(buf: &mut Buffer, rect: Rect, border: Color, theme: &Theme) {
    if rect.is_empty() {
        return;
    }
    if rect.height >= 3 {
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border).bg(theme.bg))
            .render(rect, buf);
    } else {
        Paragraph::new("·")
            .alignment(Alignment::Center)
            .style(Style::default().fg(border).bg(theme.bg))
            .render(rect, buf);
    }
}

fn draw_tile(buf: &mut Buffer, rect: Rect, tile: &Tile, border: Color, theme: &Theme) {
    if rect.is_empty() {
        return;
    }
    let face = theme.tile_color(tile.letter);
    let label_style = Style::default().fg(theme.tile_fg).bg(face).add_modifier(Modifier::BOLD);
    let label = Paragraph::new(tile.letter.label()).alignment(Alignment::Center).style(label_style);
    if rect.height >= 3 {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border).bg(face))
            .style(Style::default().bg(face));
        let inner = block.inner(rect);
        block.render(rect, buf);
        label.render(inner, buf);
    } else {
        label.render(rect, buf);
    }
}

fn result_line<'a>(result: &'a RowResult, theme: &Theme) -> Line<'a> {
    if result.valid {
        Line::from(vec![
            Span::styled(result.word.to_uppercase(), Style::default().fg(theme.valid)),
            Span::styled(format!(" +{}", result.points), Style::default().fg(theme.valid).add_modifier(Modifier::BOLD)),
        ])
    } else {
        Line::from(Span::styled(
            format!("{} ✗", result.word.to_uppercase()),
            Style::default().fg(theme.invalid).add_modifier(Modifier::CROSSED_OUT),
        ))
    }
}

/// Row results to the right of each row, plus a banner for a perfect board.
fn draw_results(buf: &mut Buffer, game: &Game, theme: &Theme, layout: &BoardLayout, area: Rect) {
    for result in game.results() {
        let last = GridPos::new(result.row, geometry::row_width(result.row) - 1);
        let (x, y) = layout.to_pixel(last);
        let x = x + layout.tile_w + 2;
        let y = y + layout.tile_h / 2;
        let rect = Rect::new(x, y, area.right().saturating_sub(x), 1).intersection(area);
        Paragraph::new(result_line(result, theme)).render(rect, buf);
    }
    if game.is_perfect() {
        let banner = Rect::new(area.x, area.y, area.width, 1);
        Paragraph::new(Span::styled(
            " PERFECT BOARD x2 ",
            Style::default().fg(theme.bg).bg(theme.title).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .render(banner, buf);
    }
}

fn section(buf: &mut Buffer, area: Rect, theme: &Theme, title: &str) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(format!(" {} ", title), Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, buf);
    inner
}

fn draw_sidebar(buf: &mut Buffer, game: &Game, theme: &Theme, area: Rect) {
    let label = Style::default().fg(theme.title);
    let fg = Style::default().fg(theme.main_fg);
    let dim = Style::default().fg(theme.inactive_fg);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Round
            Constraint::Length(1),
            Constraint::Length(7), // Best
            Constraint::Length(1),
            Constraint::Length(7), // Controls
            Constraint::Min(0),
        ])
        .split(area);

    let inner = section(buf, chunks[0], theme, "Round");
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
        .split(inner);
    let secs = game.remaining_secs();
    Paragraph::new(Line::from(vec![Span::styled("Score: ", label), Span::styled(game.score().to_string(), fg)]))
        .render(rows[0], buf);
    Paragraph::new(Line::from(vec![
        Span::styled("Time:  ", label),
        Span::styled(format!("{}:{:02}", secs / 60, secs % 60), fg),
    ]))
    .render(rows[1], buf);
    let total = game.round_secs().max(1);
    Gauge::default()
        .ratio((f64::from(secs) / f64::from(total)).clamp(0.0, 1.0))
        .label("")
        .gauge_style(Style::default().fg(if secs <= 10 { theme.invalid } else { theme.valid }).bg(theme.div_line))
        .render(rows[2], buf);
    if !game.dictionary().is_loaded() {
        Paragraph::new(Span::styled("loading words...", dim)).render(rows[3], buf);
    }

    let inner = section(buf, chunks[2], theme, "Best");
    let best: Vec<Line> = if game.high_scores().is_empty() {
        vec![Line::from(Span::styled("none yet", dim))]
    } else {
        game.high_scores()
            .iter()
            .enumerate()
            .map(|(i, s)| Line::from(vec![Span::styled(format!("{}. ", i + 1), label), Span::styled(s.to_string(), fg)]))
            .collect()
    };
    Paragraph::new(Text::from(best)).render(inner, buf);

    let inner = section(buf, chunks[4], theme, "Controls");
    let help = vec![
        Line::from(Span::styled("click hand   drop tile", fg)),
        Line::from(Span::styled("drag         move tile", fg)),
        Line::from(Span::styled("1-7          drop slot", fg)),
        Line::from(Span::styled("Space        start", fg)),
        Line::from(Span::styled("q / Esc      quit", fg)),
    ];
    Paragraph::new(Text::from(help)).render(inner, buf);
}

fn popup(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(area.x + (area.width - w) / 2, area.y + (area.height - h) / 2, w, h)
}

fn draw_popup(buf: &mut Buffer, theme: &Theme, area: Rect, lines: Vec<Line>) {
    let rect = popup(area, 36, lines.len() as u16 + 2);
    Clear.render(rect, buf);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Cascade ", Style::default().fg(theme.title))),
        )
        .render(rect, buf);
}

fn draw_start(buf: &mut Buffer, game: &Game, theme: &Theme, area: Rect) {
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("Fill the board with words", fg)),
        Line::from(Span::styled(format!("{} seconds per round", game.round_secs()), fg)),
        Line::from(""),
        Line::from(Span::styled("Click or press Space to start", Style::default().fg(theme.title))),
    ];
    if let Some(&best) = game.high_scores().first() {
        lines.push(Line::from(Span::styled(format!("Best: {}", best), fg)));
    }
    draw_popup(buf, theme, area, lines);
}

fn draw_round_end(buf: &mut Buffer, game: &Game, theme: &Theme, area: Rect) {
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Time's up! ", Style::default().fg(theme.bg).bg(theme.invalid))),
        Line::from(""),
        Line::from(Span::styled(format!("Score: {}", game.score()), fg)),
    ];
    if game.high_scores().first() == Some(&game.score()) && game.score() > 0 {
        lines.push(Line::from(Span::styled(
            "New record!",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Space - Play again    Q - Quit", fg)));
    draw_popup(buf, theme, area, lines);
}
