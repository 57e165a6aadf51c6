use serde::{Deserialize, Serialize};

use crate::shapes::{PieceKind, ShapeDef};

/// Spawn row: pieces enter above the visible board.
pub const SPAWN_ROW: i32 = -2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    /// Quarter turns clockwise, 0..=3.
    pub rotation: u8,
    pub x: i32,
    pub y: i32,
    /// Rotation pivot in the current orientation's grid coordinates.
    pub pivot: (f32, f32),
}

impl Piece {
    pub fn new(kind: PieceKind, x: i32, y: i32) -> Self {
        Self {
            kind,
            rotation: 0,
            x,
            y,
            pivot: kind.def().center,
        }
    }

    /// Horizontally centered on a board of `board_width` columns, above the top row.
    pub fn spawn(kind: PieceKind, board_width: usize) -> Self {
        let (w, _) = kind.def().dims(0);
        let x = (board_width as i32 - w).max(0) / 2;
        Self::new(kind, x, SPAWN_ROW)
    }

    pub fn def(&self) -> &'static ShapeDef {
        self.kind.def()
    }

    pub fn dims(&self) -> (i32, i32) {
        self.def().dims(self.rotation)
    }

    /// Absolute `(col, row)` cells for a hypothetical offset and rotation.
    pub fn cells_at(&self, dx: i32, dy: i32, rotation: u8) -> impl Iterator<Item = (i32, i32)> + '_ {
        let (x, y) = (self.x + dx, self.y + dy);
        self.def()
            .blocks(rotation)
            .iter()
            .map(move |&(c, r)| (x + c, y + r))
    }

    pub fn cells(&self) -> Vec<(i32, i32)> {
        self.cells_at(0, 0, self.rotation).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_is_centered_above_the_board() {
        let i = Piece::spawn(PieceKind::from_name("I").unwrap(), 10);
        assert_eq!((i.x, i.y), (3, SPAWN_ROW));
        let o = Piece::spawn(PieceKind::from_name("O").unwrap(), 10);
        assert_eq!(o.x, 4);
        let wide = Piece::spawn(PieceKind::from_name("I").unwrap(), 12);
        assert_eq!(wide.x, 4);
    }

    #[test]
    fn cells_are_offset_by_position() {
        let mut p = Piece::new(PieceKind::from_name("T").unwrap(), 2, 5);
        assert_eq!(p.cells(), vec![(3, 5), (2, 6), (3, 6), (4, 6)]);
        p.rotation = 1;
        assert_eq!(p.dims(), (2, 3));
    }
}
