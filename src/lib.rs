//! Meridian Land Engine
//!
//! Land partitioning & access-control for one 256×256 m region of a
//! persistent multi-user world, running as a standalone service.
//!
//! ## Architecture
//!
//! ```text
//! LandService  (service.rs)  ← subdivide/join, enforcement, prim counts
//!   ├── LandGrid  (grid.rs)  ← 64×64 cell table + id→parcel map
//!   │     └── LandParcel  (parcel.rs)  ← LandData + derived counters
//!   │           └── LandBitmap  (bitmap.rs)  ← occupancy codec
//!   ├── ParcelInfoCache  (remote.rs)  ← fake-parcel-id codec + TTL cache
//!   └── collaborators  (scene.rs)  ← permissions, store, directory, census
//! ```
//!
//! The embedding scene consumes the engine through the
//! [`scene::LandChannel`] capability trait and feeds it avatar-movement and
//! object-lifecycle notifications; everything else (physics, assets,
//! transport) stays outside.

// Protocol and value types are always available (no server feature needed).
pub mod bitmap;
pub mod parcel;
pub mod protocol;
pub mod types;

// Server-side modules require the `server` feature.
#[cfg(feature = "server")]
pub mod grid;
#[cfg(feature = "server")]
pub mod overlay;
#[cfg(feature = "server")]
pub mod remote;
#[cfg(feature = "server")]
pub mod scene;
#[cfg(feature = "server")]
pub mod service;

// Convenience re-exports (server only)
#[cfg(feature = "server")]
pub use grid::LandGrid;
#[cfg(feature = "server")]
pub use overlay::{chunk_overlay, encode_overlay};
#[cfg(feature = "server")]
pub use remote::{
    decode_fake_parcel_id, encode_fake_parcel_id, ExtendedLandData, ParcelInfoCache,
};
#[cfg(feature = "server")]
pub use scene::{
    EstateGate, GridDirectory, LandChannel, LandListener, MemoryStore, NoNeighbors, NullListener,
    ObjectCensus, ParcelStore, PermissionGate, PrimObject, RegionInfo, StaticCensus,
};
#[cfg(feature = "server")]
pub use service::{AvatarLandState, LandService};

pub use bitmap::LandBitmap;
pub use parcel::{
    AccessEntry, AccessFlags, LandData, LandParcel, LandingType, ParcelCategory, ParcelFlags,
    ParcelStatus,
};
pub use types::{
    AgentId, LandError, LandServiceConfig, LandStats, ParcelUuid, Vec3, CELL_COUNT, CELL_SIZE,
    GRID_DIM, REGION_SIZE,
};
