use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::kicks::kick_offsets;
use crate::piece::Piece;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationDir {
    Cw,
    Ccw,
}

impl RotationDir {
    pub fn apply(self, rotation: u8) -> u8 {
        match self {
            RotationDir::Cw => (rotation + 1) % 4,
            RotationDir::Ccw => (rotation + 3) % 4,
        }
    }
}

/// True when the placement leaves the side walls, passes the floor or overlaps a filled
/// cell. Rows above the board are always free.
pub fn collides(board: &Board, piece: &Piece, dx: i32, dy: i32, rotation: u8) -> bool {
    piece.cells_at(dx, dy, rotation).any(|(col, row)| {
        if col < 0 || col >= board.width() as i32 || row >= board.height() as i32 {
            return true;
        }
        row >= 0 && !board.is_empty_at(row, col)
    })
}

pub fn fits(board: &Board, piece: &Piece, dx: i32, dy: i32, rotation: u8) -> bool {
    !collides(board, piece, dx, dy, rotation)
}

pub fn try_move(board: &Board, piece: &mut Piece, dx: i32, dy: i32) -> bool {
    if !fits(board, piece, dx, dy, piece.rotation) {
        return false;
    }
    piece.x += dx;
    piece.y += dy;
    true
}

/// Rows the piece can still fall.
pub fn drop_distance(board: &Board, piece: &Piece) -> i32 {
    let mut dist = 0;
    while fits(board, piece, 0, dist + 1, piece.rotation) {
        dist += 1;
    }
    dist
}

pub fn is_resting(board: &Board, piece: &Piece) -> bool {
    !fits(board, piece, 0, 1, piece.rotation)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationOutcome {
    /// The kick entry that succeeded.
    pub kick: (i32, i32),
    /// Total translation applied: pivot shift plus kick.
    pub translation: (i32, i32),
}

/// Rounds half up, matching how pivot shifts were tuned.
fn round_half_up(v: f32) -> i32 {
    (v + 0.5).floor() as i32
}

/// Pivot in the rotated grid and the integer shift keeping the old pivot in place.
pub fn pivot_after(piece: &Piece, dir: RotationDir) -> ((f32, f32), (i32, i32)) {
    let (w, h) = piece.dims();
    let (w, h) = (w as f32, h as f32);
    let (cx, cy) = piece.pivot;
    let (ncx, ncy) = match dir {
        RotationDir::Cw => (h - 1.0 - cy, cx),
        RotationDir::Ccw => (cy, w - 1.0 - cx),
    };
    let shift = (round_half_up(cx - ncx), round_half_up(cy - ncy));
    ((ncx, ncy), shift)
}

/// Tries each kick for the transition in order and commits the first collision-free
/// placement. On failure the piece is untouched.
pub fn try_rotate(board: &Board, piece: &mut Piece, dir: RotationDir) -> Option<RotationOutcome> {
    let from = piece.rotation;
    let to = dir.apply(from);
    let (pivot, (sx, sy)) = pivot_after(piece, dir);

    for &(kx, ky) in kick_offsets(piece.def().class, from, to) {
        let (dx, dy) = (sx + kx, sy + ky);
        if fits(board, piece, dx, dy, to) {
            piece.x += dx;
            piece.y += dy;
            piece.rotation = to;
            piece.pivot = pivot;
            return Some(RotationOutcome {
                kick: (kx, ky),
                translation: (dx, dy),
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cell;
    use crate::shapes::PieceKind;

    fn kind(name: &str) -> PieceKind {
        PieceKind::from_name(name).unwrap()
    }

    #[test]
    fn negative_rows_never_collide() {
        let board = Board::new(10, 20);
        let p = Piece::new(kind("I"), 0, -5);
        assert!(fits(&board, &p, 0, 0, 0));
        assert!(collides(&board, &p, -1, 0, 0));
        assert!(collides(&board, &p, 7, 0, 0));
    }

    #[test]
    fn floor_and_cells_collide() {
        let mut board = Board::new(10, 20);
        let p = Piece::new(kind("O"), 0, 18);
        assert!(collides(&board, &p, 0, 1, 0));
        board.set(17, 1, Cell::Obstacle(2));
        assert!(collides(&board, &p, 0, -1, 0));
    }

    #[test]
    fn drop_distance_reaches_the_floor() {
        let board = Board::new(10, 20);
        let p = Piece::new(kind("I"), 3, 0);
        assert_eq!(drop_distance(&board, &p), 19);
    }

    #[test]
    fn t_rotates_in_open_space_around_its_pivot() {
        let board = Board::new(10, 20);
        let mut p = Piece::new(kind("T"), 4, 10);
        let out = try_rotate(&board, &mut p, RotationDir::Cw).expect("rotation");
        assert_eq!(out.kick, (0, 0));
        assert_eq!(p.rotation, 1);
        // Center cell of the T stays put.
        assert!(p.cells().contains(&(5, 11)));
    }

    #[test]
    fn blocked_rotation_leaves_the_piece_alone() {
        let mut board = Board::new(4, 4);
        for r in 0..4 {
            for c in 0..4 {
                board.set(r, c, Cell::Occupied(kind("O")));
            }
        }
        board.set(3, 0, Cell::Empty);
        board.set(3, 1, Cell::Empty);
        let mut p = Piece::new(kind("D"), 0, 3);
        let before = p;
        assert!(try_rotate(&board, &mut p, RotationDir::Cw).is_none());
        assert_eq!(p, before);
    }

    #[test]
    fn pivot_shift_rounds_half_up() {
        let p = Piece::new(kind("I"), 3, 5);
        let (pivot, shift) = pivot_after(&p, RotationDir::Cw);
        // 1x4 bar: new pivot (0 - 0.5, 1.5) -> (-0.5, 1.5); shift (2, -1).
        assert_eq!(pivot, (-0.5, 1.5));
        assert_eq!(shift, (2, -1));
    }
}
