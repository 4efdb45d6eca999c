//! Cancelable scheduled tasks on a logical millisecond clock.
//!
//! At most one task per [`TimerKind`] is pending; scheduling a kind again
//! replaces the earlier task. The owner drains due tasks with
//! [`Scheduler::pop_due`] and dispatches them itself.

/// Task category. Refills are tracked per hand column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Next gravity step.
    Gravity,
    /// Hand refill for one column.
    Refill(usize),
    /// Round clock second.
    Clock,
    /// End of the clearing display.
    Display,
    /// Next intro step.
    Intro,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    kind: TimerKind,
    due: u64,
    seq: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` at `due`, replacing any pending task of the same kind.
    pub fn schedule(&mut self, kind: TimerKind, due: u64) {
        self.cancel(kind);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry { kind, due, seq });
    }

    /// Returns true if a task was pending.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.kind != kind);
        self.entries.len() != before
    }

    pub fn cancel_where(&mut self, mut pred: impl FnMut(TimerKind) -> bool) {
        self.entries.retain(|e| !pred(e.kind));
    }

    pub fn cancel_refills(&mut self) {
        self.cancel_where(|k| matches!(k, TimerKind::Refill(_)));
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.due_at(kind).is_some()
    }

    pub fn due_at(&self, kind: TimerKind) -> Option<u64> {
        self.entries.iter().find(|e| e.kind == kind).map(|e| e.due)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return the earliest task due at or before `now`, with its
    /// due time. Ties fire in scheduling order.
    pub fn pop_due(&mut self, now: u64) -> Option<(TimerKind, u64)> {
        let (idx, _) = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= now)
            .min_by_key(|(_, e)| (e.due, e.seq))?;
        let entry = self.entries.swap_remove(idx);
        Some((entry.kind, entry.due))
    }
}
