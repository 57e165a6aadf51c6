use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::piece::Piece;
use crate::shapes::PieceKind;

/// Lowest level a freshly injected obstacle may have.
pub const MIN_INJECTED_OBSTACLE_LEVEL: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Occupied(PieceKind),
    /// Toughness; always at least 1.
    Obstacle(u8),
}

impl Cell {
    pub fn obstacle(level: u8) -> Self {
        Cell::Obstacle(level.max(1))
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_obstacle(self) -> bool {
        matches!(self, Cell::Obstacle(_))
    }
}

/// Result of one `clear_lines` pass. Row indices are in pre-clear coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineClear {
    pub removed_rows: Vec<usize>,
    /// Parallel to `removed_rows`: whether that row held an obstacle.
    pub removed_had_obstacle: Vec<bool>,
    /// Full rows that only lost an obstacle level.
    pub degraded_rows: Vec<usize>,
}

impl LineClear {
    pub fn removed(&self) -> usize {
        self.removed_rows.len()
    }

    pub fn obstacle_rows_removed(&self) -> usize {
        self.removed_had_obstacle.iter().filter(|&&b| b).count()
    }

    pub fn any_obstacle(&self) -> bool {
        self.removed_had_obstacle.iter().any(|&b| b)
    }
}

/// Row-major grid, row 0 on top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    width: usize,
    height: usize,
    grid: Vec<Vec<Cell>>,
}

impl Board {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            grid: vec![vec![Cell::Empty; width]; height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.grid
    }

    pub fn in_bounds(&self, row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.height && (col as usize) < self.width
    }

    pub fn get(&self, row: i32, col: i32) -> Option<Cell> {
        if !self.in_bounds(row, col) {
            return None;
        }
        Some(self.grid[row as usize][col as usize])
    }

    pub fn set(&mut self, row: i32, col: i32, cell: Cell) {
        if !self.in_bounds(row, col) {
            return;
        }
        let cell = match cell {
            Cell::Obstacle(level) => Cell::obstacle(level),
            other => other,
        };
        self.grid[row as usize][col as usize] = cell;
    }

    pub fn is_empty_at(&self, row: i32, col: i32) -> bool {
        matches!(self.get(row, col), Some(Cell::Empty))
    }

    pub fn is_row_full(&self, row: usize) -> bool {
        self.grid[row].iter().all(|c| !c.is_empty())
    }

    pub fn top_row_occupied(&self) -> bool {
        self.grid
            .first()
            .is_some_and(|row| row.iter().any(|c| !c.is_empty()))
    }

    pub fn occupied_count(&self) -> usize {
        self.grid
            .iter()
            .flatten()
            .filter(|c| !c.is_empty())
            .count()
    }

    pub fn merge_piece(&mut self, piece: &Piece) {
        let kind = piece.kind;
        for (col, row) in piece.cells() {
            if row < 0 {
                continue;
            }
            self.set(row, col, Cell::Occupied(kind));
        }
    }

    /// Scans bottom-to-top. A full row holding an obstacle above level 1 survives: its
    /// obstacles lose a level and everything else empties. Other full rows are removed.
    pub fn clear_lines(&mut self) -> LineClear {
        let mut out = LineClear::default();
        let mut r = self.height as i64 - 1;
        while r >= 0 {
            let row = r as usize;
            if !self.is_row_full(row) {
                r -= 1;
                continue;
            }

            let original_index = row - out.removed_rows.len();
            let tough = self.grid[row]
                .iter()
                .any(|c| matches!(c, Cell::Obstacle(level) if *level > 1));
            if tough {
                for cell in &mut self.grid[row] {
                    *cell = match *cell {
                        Cell::Obstacle(level) if level > 1 => Cell::Obstacle(level - 1),
                        _ => Cell::Empty,
                    };
                }
                out.degraded_rows.push(original_index);
                r -= 1;
                continue;
            }

            let had_obstacle = self.grid[row].iter().any(|c| c.is_obstacle());
            self.grid.remove(row);
            self.grid.insert(0, vec![Cell::Empty; self.width]);
            out.removed_rows.push(original_index);
            out.removed_had_obstacle.push(had_obstacle);
            // The row above slid into `row`; look at the same index again.
        }
        out
    }

    /// Column compaction. Obstacles never move and act as a floor for the cells above them.
    pub fn apply_gravity(&mut self) {
        for col in 0..self.width {
            let mut write = self.height as i64 - 1;
            for row in (0..self.height).rev() {
                match self.grid[row][col] {
                    Cell::Empty => {}
                    Cell::Obstacle(_) => write = row as i64 - 1,
                    cell => {
                        let target = write as usize;
                        if target != row {
                            self.grid[target][col] = cell;
                            self.grid[row][col] = Cell::Empty;
                        }
                        write -= 1;
                    }
                }
            }
        }
    }

    /// Pushes everything up one row (row 0 is discarded) and inserts a bottom row with
    /// obstacles where `pattern` is set.
    pub fn add_obstacle_row_pattern(&mut self, pattern: &[bool], level: u8) {
        let level = level.max(MIN_INJECTED_OBSTACLE_LEVEL);
        let row = (0..self.width)
            .map(|c| {
                if pattern.get(c).copied().unwrap_or(false) {
                    Cell::Obstacle(level)
                } else {
                    Cell::Empty
                }
            })
            .collect();
        if !self.grid.is_empty() {
            self.grid.remove(0);
        }
        self.grid.push(row);
    }

    /// Pads every row with `extra` empty columns on the right.
    pub fn widen(&mut self, extra: usize) {
        self.width += extra;
        for row in &mut self.grid {
            row.resize(self.width, Cell::Empty);
        }
    }

    pub fn clear_top_rows(&mut self, count: usize) {
        for row in self.grid.iter_mut().take(count) {
            row.fill(Cell::Empty);
        }
    }

    /// Empties a random row that has at least one non-empty cell.
    pub fn clear_random_row<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        let rows: Vec<usize> = (0..self.height)
            .filter(|&r| self.grid[r].iter().any(|c| !c.is_empty()))
            .collect();
        if rows.is_empty() {
            return None;
        }
        let row = rows[rng.random_range(0..rows.len())];
        self.grid[row].fill(Cell::Empty);
        Some(row)
    }

    /// Empties a random column that has at least one non-empty cell.
    pub fn clear_random_column<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        let cols: Vec<usize> = (0..self.width)
            .filter(|&c| self.grid.iter().any(|row| !row[c].is_empty()))
            .collect();
        if cols.is_empty() {
            return None;
        }
        let col = cols[rng.random_range(0..cols.len())];
        for row in &mut self.grid {
            row[col] = Cell::Empty;
        }
        Some(col)
    }

    /// Empties the 3x3 neighborhood around a random non-empty cell. Returns `(row, col)`.
    pub fn clear_random_area<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<(usize, usize)> {
        let mut occupied = Vec::new();
        for (r, row) in self.grid.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if !cell.is_empty() {
                    occupied.push((r, c));
                }
            }
        }
        if occupied.is_empty() {
            return None;
        }
        let (row, col) = occupied[rng.random_range(0..occupied.len())];
        for dr in -1..=1 {
            for dc in -1..=1 {
                self.set(row as i32 + dr, col as i32 + dc, Cell::Empty);
            }
        }
        Some((row, col))
    }
}
