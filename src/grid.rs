//! Region land grid: the authoritative 64×64 table mapping each 4m cell to
//! the local id of the parcel occupying it, plus the id → parcel map.
//!
//! All mutation goes through [`crate::service::LandService`] so the
//! "exactly one owner per cell" invariant survives multi-step operations.

use crate::bitmap::LandBitmap;
use crate::parcel::{LandData, LandParcel};
use crate::types::{LandError, CELL_COUNT, CELL_SIZE, GRID_DIM, REGION_SIZE};
use log::warn;
use std::collections::HashMap;

/// Cell value meaning "no parcel assigned yet" — only ever observed during
/// bootstrap or mid-operation, never after initialization completes.
const UNASSIGNED: i32 = 0;

pub struct LandGrid {
    /// Row-major cell table, `cells[cy * GRID_DIM + cx]`.
    cells: Vec<i32>,
    parcels: HashMap<i32, LandParcel>,
    /// Monotonic id source. Never decremented, never reused within a
    /// region's lifetime.
    next_local_id: i32,
}

impl LandGrid {
    pub fn new() -> Self {
        Self {
            cells: vec![UNASSIGNED; CELL_COUNT],
            parcels: HashMap::new(),
            next_local_id: 1,
        }
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Cell coordinates for a world position, `None` outside `[0, 256)`.
    pub fn cell_of(x: f32, y: f32) -> Option<(usize, usize)> {
        let size = REGION_SIZE as f32;
        if !(0.0..size).contains(&x) || !(0.0..size).contains(&y) {
            return None;
        }
        let cell = CELL_SIZE as f32;
        Some(((x / cell).floor() as usize, (y / cell).floor() as usize))
    }

    pub fn local_id_at(&self, x: f32, y: f32) -> Option<i32> {
        let (cx, cy) = Self::cell_of(x, y)?;
        self.local_id_at_cell(cx, cy)
    }

    pub fn local_id_at_cell(&self, cx: usize, cy: usize) -> Option<i32> {
        if cx >= GRID_DIM || cy >= GRID_DIM {
            return None;
        }
        match self.cells[cy * GRID_DIM + cx] {
            UNASSIGNED => None,
            id => Some(id),
        }
    }

    pub fn parcel_at(&self, x: f32, y: f32) -> Option<&LandParcel> {
        self.local_id_at(x, y).and_then(|id| self.parcels.get(&id))
    }

    pub fn parcel_at_mut(&mut self, x: f32, y: f32) -> Option<&mut LandParcel> {
        let id = self.local_id_at(x, y)?;
        self.parcels.get_mut(&id)
    }

    pub fn parcel_at_cell(&self, cx: usize, cy: usize) -> Option<&LandParcel> {
        self.local_id_at_cell(cx, cy)
            .and_then(|id| self.parcels.get(&id))
    }

    pub fn by_local_id(&self, local_id: i32) -> Option<&LandParcel> {
        self.parcels.get(&local_id)
    }

    pub fn by_local_id_mut(&mut self, local_id: i32) -> Option<&mut LandParcel> {
        self.parcels.get_mut(&local_id)
    }

    pub fn parcels(&self) -> impl Iterator<Item = &LandParcel> {
        self.parcels.values()
    }

    pub fn parcels_mut(&mut self) -> impl Iterator<Item = &mut LandParcel> {
        self.parcels.values_mut()
    }

    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    pub fn next_local_id(&self) -> i32 {
        self.next_local_id
    }

    /// How many grid cells currently reference this local id.
    pub fn references(&self, local_id: i32) -> usize {
        self.cells.iter().filter(|c| **c == local_id).count()
    }

    /// Cells not yet claimed by any parcel. Non-zero after initialization
    /// means the persisted data was incomplete.
    pub fn unassigned_cells(&self) -> usize {
        self.references(UNASSIGNED)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Register a new parcel: assign the next local id, stamp its bitmap
    /// into the cell table, and index it. Returns the assigned id.
    pub fn insert(&mut self, mut data: LandData) -> i32 {
        let id = self.next_local_id;
        self.next_local_id += 1;
        data.local_id = id;
        let bitmap = data.bitmap.clone();
        self.stamp(id, &bitmap);
        self.parcels.insert(id, LandParcel::new(data));
        id
    }

    /// Re-register a persisted parcel under its stored local id, bumping the
    /// id source past it. Falls back to a fresh id when the stored id is
    /// unusable (unset or already taken).
    pub fn restore(&mut self, mut data: LandData) -> i32 {
        let stored = data.local_id;
        let id = if stored > 0 && !self.parcels.contains_key(&stored) {
            stored
        } else {
            if stored > 0 {
                warn!(
                    "stored local id {} unusable for parcel {} – assigning a fresh one",
                    stored, data.parcel_id
                );
            }
            self.next_local_id
        };
        self.next_local_id = self.next_local_id.max(id + 1);
        data.local_id = id;
        let bitmap = data.bitmap.clone();
        self.stamp(id, &bitmap);
        self.parcels.insert(id, LandParcel::new(data));
        id
    }

    /// Remove a parcel from the id map.
    ///
    /// Refused while any cell still references the id – the caller must
    /// reassign or clear those cells first. This is a defensive check, not
    /// an expected path.
    pub fn remove(&mut self, local_id: i32) -> Result<LandParcel, LandError> {
        let cells = self.references(local_id);
        if cells > 0 {
            warn!(
                "refusing to remove parcel {}: still referenced by {} cells",
                local_id, cells
            );
            return Err(LandError::StillReferenced { local_id, cells });
        }
        self.parcels
            .remove(&local_id)
            .ok_or(LandError::UnknownParcel(local_id))
    }

    /// Point every cell set in `bitmap` at `local_id`.
    pub fn stamp(&mut self, local_id: i32, bitmap: &LandBitmap) {
        for (cx, cy) in bitmap.iter_cells() {
            self.cells[cy * GRID_DIM + cx] = local_id;
        }
    }

    /// Repoint every cell referencing `from` at `to`. Returns how many cells
    /// moved.
    pub fn reassign(&mut self, from: i32, to: i32) -> usize {
        let mut moved = 0;
        for cell in self.cells.iter_mut() {
            if *cell == from {
                *cell = to;
                moved += 1;
            }
        }
        moved
    }

    /// Drop every parcel and unassign every cell. The local id source is
    /// deliberately preserved — ids are never reused within a region's
    /// lifetime, even across a reset.
    pub fn clear(&mut self) {
        self.cells.fill(UNASSIGNED);
        self.parcels.clear();
    }
}

impl Default for LandGrid {
    fn default() -> Self {
        Self::new()
    }
}
