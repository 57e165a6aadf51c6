use std::collections::BTreeSet;

use roguetris::{
    board::{Board, Cell},
    collision::{RotationDir, fits, pivot_after, try_rotate},
    kicks::kick_offsets,
    piece::Piece,
    shapes::PieceKind,
};

fn cell_set(cells: impl IntoIterator<Item = (i32, i32)>) -> BTreeSet<(i32, i32)> {
    cells.into_iter().collect()
}

/// Expected outcome by scanning the kick list the same way a player would reason about it.
fn expected_rotation(board: &Board, piece: &Piece, dir: RotationDir) -> Option<BTreeSet<(i32, i32)>> {
    let to = dir.apply(piece.rotation);
    let (_, (sx, sy)) = pivot_after(piece, dir);
    kick_offsets(piece.def().class, piece.rotation, to)
        .iter()
        .map(|&(kx, ky)| (sx + kx, sy + ky))
        .find(|&(dx, dy)| fits(board, piece, dx, dy, to))
        .map(|(dx, dy)| cell_set(piece.cells_at(dx, dy, to)))
}

fn cluttered_board() -> Board {
    let mut board = Board::new(10, 20);
    let filler = PieceKind::from_name("T").unwrap();
    for (r, c) in [(12, 2), (12, 6), (13, 4), (15, 1), (15, 7), (16, 3), (16, 5), (18, 0), (18, 9)] {
        board.set(r, c, Cell::Occupied(filler));
    }
    for c in 0..10 {
        if c != 4 {
            board.set(19, c, Cell::Obstacle(2));
        }
    }
    board
}

#[test]
fn every_shape_rotates_soundly_in_open_space_and_clutter() {
    let boards = [Board::new(10, 20), cluttered_board()];
    for board in &boards {
        for kind in PieceKind::all() {
            for rotation in 0..4u8 {
                for (x, y) in [(0, 10), (3, 11), (6, 14), (4, 16), (7, 2)] {
                    let mut piece = Piece::new(kind, x, y);
                    // Walk to the starting orientation through real rotations.
                    let mut reached = true;
                    for _ in 0..rotation {
                        if try_rotate(board, &mut piece, RotationDir::Cw).is_none() {
                            reached = false;
                            break;
                        }
                    }
                    if !reached || !fits(board, &piece, 0, 0, piece.rotation) {
                        continue;
                    }

                    for dir in [RotationDir::Cw, RotationDir::Ccw] {
                        let before = piece;
                        let expected = expected_rotation(board, &piece, dir);
                        let mut rotated = piece;
                        let outcome = try_rotate(board, &mut rotated, dir);
                        match expected {
                            Some(cells) => {
                                assert!(outcome.is_some(), "{kind} {rotation} {dir:?} rejected");
                                assert_eq!(rotated.rotation, dir.apply(before.rotation));
                                assert_eq!(cell_set(rotated.cells()), cells, "{kind} {dir:?}");
                                assert!(fits(board, &rotated, 0, 0, rotated.rotation));
                            }
                            None => {
                                assert!(outcome.is_none());
                                assert_eq!(rotated, before, "{kind} moved on a failed rotation");
                            }
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn rotated_cells_match_the_rotated_shape() {
    let board = Board::new(10, 20);
    for kind in PieceKind::all() {
        let mut piece = Piece::new(kind, 3, 8);
        for _ in 0..4 {
            let from = piece.rotation;
            if try_rotate(&board, &mut piece, RotationDir::Cw).is_none() {
                break;
            }
            let to = piece.rotation;
            assert_eq!(to, (from + 1) % 4);
            let origin = (piece.x, piece.y);
            let shape: BTreeSet<(i32, i32)> = kind
                .def()
                .blocks(to)
                .iter()
                .map(|&(c, r)| (origin.0 + c, origin.1 + r))
                .collect();
            assert_eq!(cell_set(piece.cells()), shape);
            assert_eq!(piece.cells().len(), kind.def().cell_count());
        }
    }
}

#[test]
fn rotation_blocked_everywhere_leaves_the_piece_alone() {
    let mut board = Board::new(4, 4);
    let filler = PieceKind::from_name("O").unwrap();
    for r in 0..4 {
        for c in 0..4 {
            if r != 3 {
                board.set(r, c, Cell::Occupied(filler));
            }
        }
    }
    let mut piece = Piece::new(PieceKind::from_name("I").unwrap(), 0, 3);
    let before = piece;
    assert!(try_rotate(&board, &mut piece, RotationDir::Cw).is_none());
    assert!(try_rotate(&board, &mut piece, RotationDir::Ccw).is_none());
    assert_eq!(piece, before);
}
