//! Terminal events to game intents: keys, and mouse press/drag/release.

use crate::geometry::{GridPos, HAND_ROW, HAND_WIDTH, Layout};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

/// What the player asked for. The controller decides whether it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Generic tap: starts a round on the start and round-end screens.
    Tap,
    HandTap(usize),
    BeginDrag(GridPos),
    /// Release of a drag over this slot, or off the board.
    EndDrag(Option<GridPos>),
    Quit,
}

/// Map key event to an intent. Digits tap the matching hand slot.
pub fn key_to_intent(key: KeyEvent) -> Option<Intent> {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL {
        return matches!(code, KeyCode::Char('c')).then_some(Intent::Quit);
    }
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Intent::Quit),
        KeyCode::Enter | KeyCode::Char(' ') => Some(Intent::Tap),
        KeyCode::Char(c @ '1'..='9') => {
            let col = c as usize - '1' as usize;
            (col < HAND_WIDTH).then_some(Intent::HandTap(col))
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy)]
struct Press {
    cell: GridPos,
    lifted: bool,
}

/// Tracks the left button between press and release.
///
/// A press on a slot is a drag candidate. Moving off that slot lifts the tile;
/// releasing on the same slot without lifting is a tap on that slot.
#[derive(Debug, Default)]
pub struct Pointer {
    press: Option<Press>,
    /// Last known mouse cell, used to draw a held tile.
    pub position: Option<(u16, u16)>,
}

impl Pointer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_lifted(&self) -> bool {
        self.press.is_some_and(|p| p.lifted)
    }

    /// Forget the current press, e.g. when the controller rejected the drag.
    pub fn cancel(&mut self) {
        self.press = None;
    }

    pub fn handle(&mut self, mouse: MouseEvent, layout: &Layout) -> Vec<Intent> {
        let (x, y) = (mouse.column, mouse.row);
        self.position = Some((x, y));
        let cell = layout.to_grid(x, y);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.press = cell.map(|cell| Press { cell, lifted: false });
                vec![Intent::Tap]
            }
            MouseEventKind::Drag(MouseButton::Left) => match &mut self.press {
                Some(press) if !press.lifted && cell != Some(press.cell) => {
                    press.lifted = true;
                    vec![Intent::BeginDrag(press.cell)]
                }
                _ => vec![],
            },
            MouseEventKind::Up(MouseButton::Left) => match self.press.take() {
                Some(Press { lifted: true, .. }) => vec![Intent::EndDrag(cell)],
                Some(Press { cell: from, .. }) if cell == Some(from) => {
                    if from.row == HAND_ROW {
                        vec![Intent::HandTap(from.col)]
                    } else {
                        vec![]
                    }
                }
                // Released elsewhere without a reported drag.
                Some(Press { cell: from, .. }) => vec![Intent::BeginDrag(from), Intent::EndDrag(cell)],
                None => vec![],
            },
            _ => vec![],
        }
    }
}
