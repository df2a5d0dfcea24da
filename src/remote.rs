//! Cross-region parcel lookup: the fake-parcel-id codec and the bounded
//! TTL cache that keeps neighbor-service round trips off the movement hot
//! path.

use crate::parcel::LandData;
use crate::protocol::ParcelInfoData;
use crate::types::{LandError, GRID_DIM};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Fake parcel id codec
// ---------------------------------------------------------------------------

/// Build a fake parcel id for a cell of a region.
///
/// Layout: `u128 = region_handle << 64 | cell_x << 32 | cell_y`, carried as
/// a uuid. Deterministic, needs no parcel directory, and decodes back to a
/// lookup key on any region.
pub fn encode_fake_parcel_id(region_handle: u64, cell_x: u32, cell_y: u32) -> Uuid {
    Uuid::from_u128(
        (u128::from(region_handle) << 64) | (u128::from(cell_x) << 32) | u128::from(cell_y),
    )
}

/// Decode a fake parcel id into `(region_handle, cell_x, cell_y)`.
///
/// Cell coordinates outside the grid mark a malformed payload – typically a
/// real parcel uuid mistakenly sent down this path.
pub fn decode_fake_parcel_id(id: Uuid) -> Result<(u64, u32, u32), LandError> {
    let raw = id.as_u128();
    let handle = (raw >> 64) as u64;
    let cell_x = (raw >> 32) as u32;
    let cell_y = raw as u32;
    if cell_x >= GRID_DIM as u32 || cell_y >= GRID_DIM as u32 {
        return Err(LandError::MalformedParcelId(id));
    }
    Ok((handle, cell_x, cell_y))
}

// ---------------------------------------------------------------------------
// ExtendedLandData
// ---------------------------------------------------------------------------

/// Parcel data joined with where it lives – enough to answer an
/// about-landmark query without a grid-wide parcel directory. Cache-only,
/// never persisted.
#[derive(Debug, Clone)]
pub struct ExtendedLandData {
    pub data: LandData,
    pub region_handle: u64,
    pub cell_x: u32,
    pub cell_y: u32,
}

impl ExtendedLandData {
    /// Wire summary for a parcel-info reply.
    pub fn info_data(&self) -> ParcelInfoData {
        ParcelInfoData {
            parcel_id: self.data.parcel_id,
            region_handle: self.region_handle,
            cell_x: self.cell_x,
            cell_y: self.cell_y,
            name: self.data.name.clone(),
            description: self.data.description.clone(),
            owner_id: self.data.owner_id,
            area: self.data.area,
            sale_price: self.data.sale_price,
            category: self.data.category,
        }
    }
}

// ---------------------------------------------------------------------------
// ParcelInfoCache
// ---------------------------------------------------------------------------

struct CacheEntry {
    stored_at: Instant,
    info: ExtendedLandData,
}

/// Bounded TTL cache for resolved cross-region parcel info, keyed by fake
/// parcel id.
///
/// Only successful resolutions are inserted, so an unknown region stays
/// retryable. When full, the oldest entry makes room.
pub struct ParcelInfoCache {
    entries: RwLock<HashMap<Uuid, CacheEntry>>,
    capacity: usize,
    ttl: Duration,
}

impl ParcelInfoCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<ExtendedLandData> {
        let mut entries = self.entries.write();
        match entries.get(id) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.info.clone()),
            Some(_) => {
                entries.remove(id);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, id: Uuid, info: ExtendedLandData) {
        let mut entries = self.entries.write();
        let now = Instant::now();
        entries.retain(|_, e| now.duration_since(e.stored_at) < self.ttl);
        if entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| *k);
            if let Some(key) = oldest {
                entries.remove(&key);
            }
        }
        entries.insert(
            id,
            CacheEntry {
                stored_at: now,
                info,
            },
        );
    }

    /// Drop expired entries. Called from the periodic maintenance tick.
    pub fn purge_expired(&self) {
        let mut entries = self.entries.write();
        let now = Instant::now();
        entries.retain(|_, e| now.duration_since(e.stored_at) < self.ttl);
    }

    /// Current entry count, expired stragglers included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
