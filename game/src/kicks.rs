//! Wall-kick offsets tried in order during rotation.
//!
//! Offsets are `(dx, dy)` in board coordinates, where `dy` grows downward.

use crate::shapes::ShapeClass;

type Kicks = [(i32, i32); 5];

// Indexed by the rotation being left.
const JLSTZ_CW: [Kicks; 4] = [
    [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
    [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
    [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
    [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
];

const JLSTZ_CCW: [Kicks; 4] = [
    [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
    [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
    [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
    [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
];

const I_CW: [Kicks; 4] = [
    [(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)],
    [(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)],
    [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)],
    [(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)],
];

const I_CCW: [Kicks; 4] = [
    [(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)],
    [(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)],
    [(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)],
    [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)],
];

/// Shapes outside the classic tetromino set: stay, nudge sideways, then up one.
pub const FALLBACK_KICKS: [(i32, i32); 6] = [(0, 0), (1, 0), (-1, 0), (2, 0), (-2, 0), (0, -1)];

/// Offsets for a `from -> to` transition. Transitions that are not a single quarter turn
/// have no entry and yield an empty list.
pub fn kick_offsets(class: ShapeClass, from: u8, to: u8) -> &'static [(i32, i32)] {
    let (from, to) = (from % 4, to % 4);
    let clockwise = to == (from + 1) % 4;
    let counter = to == (from + 3) % 4;
    if !clockwise && !counter {
        return &[];
    }

    let table = match (class, clockwise) {
        (ShapeClass::Other, _) => return &FALLBACK_KICKS,
        (ShapeClass::I, true) => &I_CW,
        (ShapeClass::I, false) => &I_CCW,
        (ShapeClass::Tetromino, true) => &JLSTZ_CW,
        (ShapeClass::Tetromino, false) => &JLSTZ_CCW,
    };
    &table[from as usize]
}
