//! Core land types shared across all modules.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Region geometry
// ---------------------------------------------------------------------------

/// Width/height of one region in metres.
pub const REGION_SIZE: u32 = 256;

/// Width/height of one land cell in metres.
pub const CELL_SIZE: u32 = 4;

/// Cells per grid axis (64).
pub const GRID_DIM: usize = (REGION_SIZE / CELL_SIZE) as usize;

/// Total cells in one region (4096).
pub const CELL_COUNT: usize = GRID_DIM * GRID_DIM;

/// Ground area of one cell in square metres.
pub const CELL_AREA: i32 = (CELL_SIZE * CELL_SIZE) as i32;

/// Build a region handle from global grid coordinates.
///
/// The upper 32 bits carry the region's world-space X origin in metres, the
/// lower 32 its Y origin – the canonical packing used by landmark payloads.
pub fn region_handle(grid_x: u32, grid_y: u32) -> u64 {
    (u64::from(grid_x * REGION_SIZE) << 32) | u64::from(grid_y * REGION_SIZE)
}

/// Recover global grid coordinates from a region handle.
pub fn region_handle_coords(handle: u64) -> (u32, u32) {
    (
        ((handle >> 32) as u32) / REGION_SIZE,
        (handle as u32) / REGION_SIZE,
    )
}

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifier of an avatar or group.
///
/// The nil uuid doubles as "nobody" – publicly owned land carries it as the
/// owner id.
#[derive(
    Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub const NIL: AgentId = AgentId(Uuid::nil());

    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique parcel identifier, distinct from the region-scoped
/// local id assigned by the grid.
#[derive(
    Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct ParcelUuid(pub Uuid);

impl ParcelUuid {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ParcelUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Seconds since the unix epoch, for access-list expiry checks.
pub fn unix_now() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything the land engine can refuse to do.
///
/// Coordinate lookups never produce an error – out-of-region input yields
/// `None` on every public path. These variants cover mutating operations and
/// payload decoding; the protocol layer swallows most of them into silent
/// no-ops, which is what legacy clients expect.
#[derive(Debug, Error)]
pub enum LandError {
    #[error("parcel {0} not found")]
    UnknownParcel(i32),

    #[error("parcel {local_id} is still referenced by {cells} grid cells")]
    StillReferenced { local_id: i32, cells: usize },

    #[error("agent {0} lacks permission for this operation")]
    PermissionDenied(AgentId),

    #[error("selection does not cover exactly one parcel")]
    NotSingleParcel,

    #[error("selection does not span multiple parcels")]
    NothingToJoin,

    #[error("parcels in selection have different owners")]
    OwnerMismatch,

    #[error("subdividing would leave parcel {0} without any cells")]
    WouldEmptyParcel(i32),

    #[error("parcel {0} is not for sale")]
    NotForSale(i32),

    #[error("malformed parcel id {0}")]
    MalformedParcelId(Uuid),

    #[error("bitmap payload must be {expected} bytes, got {actual}")]
    BadBitmapLength { expected: usize, actual: usize },
}

// ---------------------------------------------------------------------------
// Stats & config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandStats {
    pub parcels: usize,
    pub next_local_id: i32,
    pub tracked_avatars: usize,
    pub prim_counts_tainted: bool,
    pub cached_parcel_info: usize,
    pub movement_events: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandServiceConfig {
    /// Display name of the region, used as the bootstrap parcel name.
    pub region_name: String,
    /// Handle of the region this engine is authoritative for.
    pub region_handle: u64,
    /// Owner of the bootstrap parcel and target of abandon/reclaim.
    pub estate_owner: AgentId,
    /// When false, banned avatars receive warnings but are never repositioned.
    pub forceful_bans: bool,
    /// Ban lines only apply below this altitude.
    pub ban_line_safety_height: f32,
    /// Cells carried per overlay wire chunk.
    pub overlay_cells_per_chunk: usize,
    /// Time-to-live for cached cross-region parcel info, in seconds.
    pub parcel_info_ttl_secs: u64,
    /// Maximum cached cross-region parcel info entries.
    pub parcel_info_capacity: usize,
}

impl Default for LandServiceConfig {
    fn default() -> Self {
        Self {
            region_name: "Meridian".to_string(),
            region_handle: region_handle(1000, 1000),
            estate_owner: AgentId::NIL,
            forceful_bans: true,
            ban_line_safety_height: 100.0,
            overlay_cells_per_chunk: 1024,
            parcel_info_ttl_secs: 30,
            parcel_info_capacity: 128,
        }
    }
}
