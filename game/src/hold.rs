//! Hold cells.
//!
//! The first cell keeps its piece for as long as the player likes. Cells bought with the
//! `expanded_hold` upgrade are timed: each lock costs them a turn and an expired piece goes back
//! to the front of the queue. Hold and release share one cooldown gate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::countdown::{Countdown, advance_slot};
use crate::shapes::PieceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldPiece {
    pub kind: PieceKind,
    /// Locks left before the piece is returned; `None` in the primary cell.
    pub turns_left: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldCells {
    cells: Vec<HeldPiece>,
    gate: Option<Countdown<()>>,
}

impl HoldCells {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cells(&self) -> &[HeldPiece] {
        &self.cells
    }

    pub fn primary(&self) -> Option<PieceKind> {
        self.cells.first().map(|held| held.kind)
    }

    /// Hold and release are both closed while the gate counts down.
    pub fn is_open(&self) -> bool {
        self.gate.is_none()
    }

    pub fn can_hold(&self, capacity: usize) -> bool {
        self.is_open() && self.cells.len() < capacity
    }

    /// Stores `kind` in the next free cell. Timed cells take their turn budget from
    /// `extra_turns`, one entry per extra cell.
    pub fn hold(
        &mut self,
        kind: PieceKind,
        capacity: usize,
        extra_turns: &[u32],
        cooldown: Duration,
    ) -> bool {
        if !self.can_hold(capacity) {
            return false;
        }
        let turns_left = match self.cells.len() {
            0 => None,
            n => extra_turns
                .get(n - 1)
                .or(extra_turns.last())
                .copied()
                .or(Some(3)),
        };
        self.cells.push(HeldPiece { kind, turns_left });
        self.close_gate(cooldown);
        true
    }

    /// Swaps `current` into the primary cell and hands back what it held. With no active piece
    /// the primary cell empties and the next cell moves up, losing its timer.
    pub fn release(
        &mut self,
        current: Option<PieceKind>,
        cooldown: Duration,
    ) -> Option<PieceKind> {
        if !self.is_open() {
            return None;
        }
        let released = self.primary()?;
        match current {
            Some(kind) => self.cells[0].kind = kind,
            None => {
                self.cells.remove(0);
                if let Some(next) = self.cells.first_mut() {
                    next.turns_left = None;
                }
            }
        }
        self.close_gate(cooldown);
        Some(released)
    }

    /// Spends a turn in every timed cell; returns expired kinds in cell order.
    pub fn on_piece_locked(&mut self) -> Vec<PieceKind> {
        let mut expired = Vec::new();
        let mut index = 0;
        self.cells.retain_mut(|held| {
            let primary = index == 0;
            index += 1;
            let Some(turns) = held.turns_left.as_mut().filter(|_| !primary) else {
                return true;
            };
            *turns = turns.saturating_sub(1);
            if *turns == 0 {
                expired.push(held.kind);
                return false;
            }
            true
        });
        expired
    }

    fn close_gate(&mut self, cooldown: Duration) {
        self.gate = (!cooldown.is_zero()).then(|| Countdown::new(cooldown, ()));
    }

    pub fn tick(&mut self, dt: Duration) {
        advance_slot(&mut self.gate, dt);
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.gate = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_millis(500);
    const TURNS: [u32; 2] = [3, 5];

    fn kind(name: &str) -> PieceKind {
        PieceKind::from_name(name).unwrap()
    }

    fn filled(capacity: usize, names: &[&str]) -> HoldCells {
        let mut hold = HoldCells::new();
        for name in names {
            assert!(hold.hold(kind(name), capacity, &TURNS, COOLDOWN));
            hold.tick(COOLDOWN);
        }
        hold
    }

    #[test]
    fn single_cell_holds_one_piece_behind_the_gate() {
        let mut hold = HoldCells::new();
        assert!(hold.hold(kind("T"), 1, &TURNS, COOLDOWN));
        assert!(!hold.is_open());
        hold.tick(COOLDOWN);
        assert!(hold.is_open());
        assert!(!hold.hold(kind("O"), 1, &TURNS, COOLDOWN));
        assert_eq!(hold.cells()[0].turns_left, None);
    }

    #[test]
    fn extra_cells_get_their_turn_budgets() {
        let hold = filled(3, &["T", "O", "L"]);
        let turns: Vec<Option<u32>> = hold.cells().iter().map(|h| h.turns_left).collect();
        assert_eq!(turns, vec![None, Some(3), Some(5)]);
    }

    #[test]
    fn expired_pieces_come_back_in_cell_order() {
        let mut hold = filled(3, &["T", "O", "L"]);
        assert!(hold.on_piece_locked().is_empty());
        assert!(hold.on_piece_locked().is_empty());
        assert_eq!(hold.on_piece_locked(), vec![kind("O")]);
        assert_eq!(hold.cells().len(), 2);
        assert_eq!(hold.cells()[1].turns_left, Some(2));
        hold.on_piece_locked();
        assert_eq!(hold.on_piece_locked(), vec![kind("L")]);
        assert_eq!(hold.cells(), &[HeldPiece { kind: kind("T"), turns_left: None }]);
    }

    #[test]
    fn release_swaps_the_primary_and_waits_for_the_gate() {
        let mut hold = HoldCells::new();
        hold.hold(kind("T"), 1, &TURNS, COOLDOWN);
        assert_eq!(hold.release(Some(kind("I")), COOLDOWN), None);
        hold.tick(Duration::from_millis(499));
        assert_eq!(hold.release(Some(kind("I")), COOLDOWN), None);
        hold.tick(Duration::from_millis(1));
        assert_eq!(hold.release(Some(kind("I")), COOLDOWN), Some(kind("T")));
        assert_eq!(hold.primary(), Some(kind("I")));
        assert!(!hold.is_open());
    }

    #[test]
    fn releasing_without_an_active_piece_promotes_the_next_cell() {
        let mut hold = filled(2, &["T", "O"]);
        assert_eq!(hold.release(None, COOLDOWN), Some(kind("T")));
        assert_eq!(hold.cells(), &[HeldPiece { kind: kind("O"), turns_left: None }]);
    }
}
