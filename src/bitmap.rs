//! Occupancy bitmap codec: pure conversions between world-coordinate
//! selections, the 64×64 cell bitmap, and its 512-byte persisted form.

use crate::types::{LandError, Vec3, CELL_AREA, CELL_COUNT, CELL_SIZE, GRID_DIM, REGION_SIZE};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Persisted/wire size of one bitmap (4096 cells, one bit each).
pub const BITMAP_BYTES: usize = CELL_COUNT / 8;

// ---------------------------------------------------------------------------
// LandBitmap
// ---------------------------------------------------------------------------

/// One bit per 4m×4m cell of the region, stored as one `u64` per grid row.
///
/// Bit `cx` of row `cy` covers world metres `[cx*4, cx*4+4) × [cy*4, cy*4+4)`.
/// The wire form is row-major and LSB-first per byte: bit `i` of the byte
/// stream is cell `(i % 64, i / 64)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandBitmap {
    rows: [u64; GRID_DIM],
}

impl LandBitmap {
    pub const fn empty() -> Self {
        Self {
            rows: [0; GRID_DIM],
        }
    }

    /// Bitmap covering the entire region.
    pub fn full() -> Self {
        Self {
            rows: [u64::MAX; GRID_DIM],
        }
    }

    /// Bitmap covering the world-coordinate rectangle `(x1, y1)-(x2, y2)`.
    ///
    /// Coordinates are metres; the start edge is inclusive and the end edge
    /// exclusive, so a 4m-aligned `(0,0)-(32,32)` selection covers exactly
    /// 8×8 cells. Unordered and out-of-region input is normalised/clamped.
    pub fn from_rect(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let mut bitmap = Self::empty();
        bitmap.set_rect(x1, y1, x2, y2, true);
        bitmap
    }

    pub fn get(&self, cx: usize, cy: usize) -> bool {
        cx < GRID_DIM && cy < GRID_DIM && self.rows[cy] & (1u64 << cx) != 0
    }

    pub fn set(&mut self, cx: usize, cy: usize, value: bool) {
        if cx >= GRID_DIM || cy >= GRID_DIM {
            return;
        }
        if value {
            self.rows[cy] |= 1u64 << cx;
        } else {
            self.rows[cy] &= !(1u64 << cx);
        }
    }

    /// Set or clear every cell in the world-coordinate rectangle.
    pub fn set_rect(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, value: bool) {
        let (sx, ex) = cell_span(x1, x2);
        let (sy, ey) = cell_span(y1, y2);
        for cy in sy..ey {
            for cx in sx..ex {
                self.set(cx, cy, value);
            }
        }
    }

    pub fn clear_rect(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.set_rect(x1, y1, x2, y2, false);
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.union_with(other);
        out
    }

    pub fn union_with(&mut self, other: &Self) {
        for (row, other_row) in self.rows.iter_mut().zip(other.rows.iter()) {
            *row |= other_row;
        }
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.rows
            .iter()
            .zip(other.rows.iter())
            .any(|(a, b)| a & b != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| *r == 0)
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(|r| r.count_ones() as usize).sum()
    }

    /// Ground area in square metres.
    pub fn area(&self) -> i32 {
        self.cell_count() as i32 * CELL_AREA
    }

    /// Axis-aligned bounding box of the occupied cells in world metres,
    /// `None` when the bitmap is empty. The max corner is exclusive (the far
    /// edge of the last occupied cell).
    pub fn aabb(&self) -> Option<(Vec3, Vec3)> {
        let mut min_x = GRID_DIM;
        let mut min_y = GRID_DIM;
        let mut max_x = 0usize;
        let mut max_y = 0usize;
        let mut any = false;

        for (cy, row) in self.rows.iter().enumerate() {
            if *row == 0 {
                continue;
            }
            any = true;
            min_y = min_y.min(cy);
            max_y = max_y.max(cy);
            min_x = min_x.min(row.trailing_zeros() as usize);
            max_x = max_x.max(63 - row.leading_zeros() as usize);
        }

        if !any {
            return None;
        }
        let cell = CELL_SIZE as f32;
        Some((
            Vec3::new(min_x as f32 * cell, min_y as f32 * cell, 0.0),
            Vec3::new((max_x + 1) as f32 * cell, (max_y + 1) as f32 * cell, 0.0),
        ))
    }

    /// Iterate occupied cells as `(cx, cy)` in row-major order.
    pub fn iter_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().enumerate().flat_map(|(cy, row)| {
            (0..GRID_DIM)
                .filter(move |cx| row & (1u64 << cx) != 0)
                .map(move |cx| (cx, cy))
        })
    }

    // -----------------------------------------------------------------------
    // Wire form
    // -----------------------------------------------------------------------

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(BITMAP_BYTES);
        for row in &self.rows {
            out.extend_from_slice(&row.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LandError> {
        if bytes.len() != BITMAP_BYTES {
            return Err(LandError::BadBitmapLength {
                expected: BITMAP_BYTES,
                actual: bytes.len(),
            });
        }
        let mut rows = [0u64; GRID_DIM];
        for (cy, chunk) in bytes.chunks_exact(8).enumerate() {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            rows[cy] = u64::from_le_bytes(raw);
        }
        Ok(Self { rows })
    }
}

impl Default for LandBitmap {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for LandBitmap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_bytes().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LandBitmap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Self::from_bytes(&bytes).map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Convert one world-coordinate span into a half-open cell range, clamped to
/// the region.
fn cell_span(a: f32, b: f32) -> (usize, usize) {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let lo = lo.clamp(0.0, REGION_SIZE as f32);
    let hi = hi.clamp(0.0, REGION_SIZE as f32);
    let start = (lo / CELL_SIZE as f32).floor() as usize;
    let end = (hi / CELL_SIZE as f32).ceil() as usize;
    (start.min(GRID_DIM), end.min(GRID_DIM))
}
