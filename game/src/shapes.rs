//! Static polyomino library.
//!
//! Every piece kind is a `ShapeDef` living for the whole process. Mono- through pentominoes
//! are listed by hand; the 35 free hexominoes are enumerated once on first access.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Which kick table a shape rotates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeClass {
    /// The four-cell bar.
    I,
    /// The remaining classic tetrominoes (O, T, S, Z, J, L).
    Tetromino,
    /// Everything else uses the fallback offsets.
    Other,
}

#[derive(Debug, Clone)]
pub struct ShapeDef {
    pub name: String,
    /// Row-major occupancy of the spawn orientation.
    pub grid: Vec<Vec<bool>>,
    /// Rotation center in grid coordinates `(x, y)`.
    pub center: (f32, f32),
    pub class: ShapeClass,
    rotations: [Vec<(i32, i32)>; 4],
    dims: [(i32, i32); 4],
}

impl ShapeDef {
    fn new(name: impl Into<String>, grid: Vec<Vec<bool>>, center: (f32, f32)) -> Self {
        let name = name.into();
        let class = match name.as_str() {
            "I" => ShapeClass::I,
            "O" | "T" | "S" | "Z" | "J" | "L" => ShapeClass::Tetromino,
            _ => ShapeClass::Other,
        };

        let mut grids = [grid.clone(), Vec::new(), Vec::new(), Vec::new()];
        for r in 1..4 {
            grids[r] = rotate_grid_cw(&grids[r - 1]);
        }
        let rotations = grids.clone().map(|g| occupied_offsets(&g));
        let dims = grids.map(|g| grid_dims(&g));

        Self {
            name,
            grid,
            center,
            class,
            rotations,
            dims,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.rotations[0].len()
    }

    /// `(col, row)` offsets of the occupied cells for `rotation` quarter turns clockwise.
    pub fn blocks(&self, rotation: u8) -> &[(i32, i32)] {
        &self.rotations[(rotation % 4) as usize]
    }

    /// Bounding box `(width, height)` for `rotation`.
    pub fn dims(&self, rotation: u8) -> (i32, i32) {
        self.dims[(rotation % 4) as usize]
    }

    /// Relative frequency in a bag: bigger polyominoes show up less often.
    pub fn weight(&self) -> u32 {
        7u32.saturating_sub(self.cell_count() as u32).max(1)
    }
}

/// Quarter turn clockwise by transposing and reversing each new row.
pub fn rotate_grid_cw(grid: &[Vec<bool>]) -> Vec<Vec<bool>> {
    let cols = grid.first().map(|row| row.len()).unwrap_or(0);
    (0..cols)
        .map(|c| grid.iter().rev().map(|row| row[c]).collect())
        .collect()
}

fn occupied_offsets(grid: &[Vec<bool>]) -> Vec<(i32, i32)> {
    let mut out = Vec::new();
    for (r, row) in grid.iter().enumerate() {
        for (c, &filled) in row.iter().enumerate() {
            if filled {
                out.push((c as i32, r as i32));
            }
        }
    }
    out
}

fn grid_dims(grid: &[Vec<bool>]) -> (i32, i32) {
    let h = grid.len() as i32;
    let w = grid.first().map(|row| row.len()).unwrap_or(0) as i32;
    (w, h)
}

const HAND_DRAWN: &[(&str, &[&[u8]], (f32, f32))] = &[
    ("M", &[&[1]], (0.5, 0.5)),
    ("D", &[&[1, 1]], (0.5, 0.5)),
    ("I3", &[&[1, 1, 1]], (1.0, 0.0)),
    ("L3", &[&[1, 0], &[1, 1]], (0.5, 0.5)),
    ("I", &[&[1, 1, 1, 1]], (1.5, 0.5)),
    ("O", &[&[1, 1], &[1, 1]], (1.0, 1.0)),
    ("T", &[&[0, 1, 0], &[1, 1, 1]], (1.0, 1.0)),
    ("S", &[&[0, 1, 1], &[1, 1, 0]], (1.0, 1.0)),
    ("Z", &[&[1, 1, 0], &[0, 1, 1]], (1.0, 1.0)),
    ("J", &[&[1, 0, 0], &[1, 1, 1]], (1.0, 1.0)),
    ("L", &[&[0, 0, 1], &[1, 1, 1]], (1.0, 1.0)),
    ("F", &[&[0, 1, 1], &[1, 1, 0], &[0, 1, 0]], (1.0, 1.0)),
    ("I5", &[&[1, 1, 1, 1, 1]], (2.5, 0.5)),
    ("L5", &[&[1, 0, 0, 0], &[1, 1, 1, 1]], (1.5, 0.5)),
    ("P", &[&[1, 1], &[1, 1], &[1, 0]], (1.0, 1.0)),
    ("T5", &[&[1, 1, 1], &[0, 1, 0], &[0, 1, 0]], (1.0, 1.0)),
    ("U", &[&[1, 0, 1], &[1, 1, 1]], (1.0, 1.0)),
    ("V", &[&[1, 0, 0], &[1, 0, 0], &[1, 1, 1]], (1.0, 1.0)),
    ("W", &[&[1, 0, 0], &[1, 1, 0], &[0, 1, 1]], (1.0, 1.0)),
    ("X", &[&[0, 1, 0], &[1, 1, 1], &[0, 1, 0]], (1.0, 1.0)),
    ("Y", &[&[0, 1, 0, 0], &[1, 1, 1, 1]], (1.5, 0.5)),
    ("Z5", &[&[1, 1, 0], &[0, 1, 0], &[0, 1, 1]], (1.0, 1.0)),
];

pub const STARTER_POOL: [&str; 7] = ["I", "O", "T", "L", "J", "S", "Z"];

static CATALOG: LazyLock<Vec<ShapeDef>> = LazyLock::new(build_catalog);

fn build_catalog() -> Vec<ShapeDef> {
    let mut defs: Vec<ShapeDef> = HAND_DRAWN
        .iter()
        .map(|(name, rows, center)| {
            let grid = rows
                .iter()
                .map(|row| row.iter().map(|&v| v != 0).collect())
                .collect();
            ShapeDef::new(*name, grid, *center)
        })
        .collect();

    for (i, coords) in free_polyominoes(6).into_iter().enumerate() {
        let (w, h) = coords
            .iter()
            .fold((0, 0), |(w, h), &(x, y)| (w.max(x + 1), h.max(y + 1)));
        let mut grid = vec![vec![false; w as usize]; h as usize];
        let (mut sx, mut sy) = (0.0f32, 0.0f32);
        for &(x, y) in &coords {
            grid[y as usize][x as usize] = true;
            sx += x as f32;
            sy += y as f32;
        }
        let n = coords.len() as f32;
        defs.push(ShapeDef::new(format!("H{}", i + 1), grid, (sx / n, sy / n)));
    }

    debug_assert!(defs.len() <= u8::MAX as usize);
    defs
}

type Coords = Vec<(i32, i32)>;

fn normalize(coords: &[(i32, i32)]) -> Coords {
    let min_x = coords.iter().map(|c| c.0).min().unwrap_or(0);
    let min_y = coords.iter().map(|c| c.1).min().unwrap_or(0);
    let mut out: Coords = coords.iter().map(|&(x, y)| (x - min_x, y - min_y)).collect();
    out.sort_unstable();
    out
}

/// Smallest normalized form among the eight rotations/reflections.
fn canonical(coords: &[(i32, i32)]) -> Coords {
    let mut best: Option<Coords> = None;
    let mut cur = normalize(coords);
    for _ in 0..2 {
        for _ in 0..4 {
            if best.as_ref().is_none_or(|b| cur < *b) {
                best = Some(cur.clone());
            }
            cur = normalize(&cur.iter().map(|&(x, y)| (y, -x)).collect::<Coords>());
        }
        cur = normalize(&cur.iter().map(|&(x, y)| (-x, y)).collect::<Coords>());
    }
    best.unwrap_or_default()
}

/// All free polyominoes of `size` cells, in canonical sort order.
fn free_polyominoes(size: usize) -> Vec<Coords> {
    let mut polys: BTreeSet<Coords> = BTreeSet::from([vec![(0, 0)]]);
    for _ in 1..size {
        let mut next = BTreeSet::new();
        for poly in &polys {
            for &(x, y) in poly {
                for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                    let cell = (x + dx, y + dy);
                    if poly.contains(&cell) {
                        continue;
                    }
                    let mut grown = poly.clone();
                    grown.push(cell);
                    next.insert(canonical(&grown));
                }
            }
        }
        polys = next;
    }
    polys.into_iter().collect()
}

/// Index into the shape catalog. Serializes as the shape's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PieceKind(u8);

impl PieceKind {
    pub fn all() -> impl Iterator<Item = PieceKind> {
        (0..CATALOG.len()).map(|i| PieceKind(i as u8))
    }

    pub fn from_name(name: &str) -> Option<PieceKind> {
        CATALOG
            .iter()
            .position(|def| def.name == name)
            .map(|i| PieceKind(i as u8))
    }

    pub fn def(self) -> &'static ShapeDef {
        &CATALOG[self.0 as usize]
    }

    pub fn name(self) -> &'static str {
        &self.def().name
    }

    pub fn starter_pool() -> Vec<PieceKind> {
        STARTER_POOL
            .iter()
            .filter_map(|name| PieceKind::from_name(name))
            .collect()
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown piece kind `{0}`")]
pub struct UnknownPieceKind(pub String);

impl TryFrom<String> for PieceKind {
    type Error = UnknownPieceKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PieceKind::from_name(&value).ok_or(UnknownPieceKind(value))
    }
}

impl From<PieceKind> for String {
    fn from(kind: PieceKind) -> Self {
        kind.name().to_string()
    }
}
