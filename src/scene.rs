//! Collaborator seams between the land engine and the embedding scene.
//!
//! The engine never talks to physics, persistence, or the wider grid
//! directly — it consumes these traits, registered once at construction.
//! In-memory implementations ship for the server binary and for tests.

use crate::parcel::{LandData, LandParcel};
use crate::protocol::{
    LandNotice, OverlayChunk, ParcelAccessListUpdate, ParcelProperties, ParcelPropertiesUpdate,
    RemoteParcelReply, RemoteParcelRequest,
};
use crate::remote::ExtendedLandData;
use crate::types::{AgentId, LandError, LandStats, ParcelUuid, Vec3};
use parking_lot::RwLock;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Consumed traits
// ---------------------------------------------------------------------------

/// Delegated permission checks. The engine never decides rights itself.
pub trait PermissionGate: Send + Sync {
    fn can_edit_parcel(&self, agent: AgentId, parcel: &LandData) -> bool;
    fn can_abandon_parcel(&self, agent: AgentId, parcel: &LandData) -> bool;
    fn can_reclaim_parcel(&self, agent: AgentId, parcel: &LandData) -> bool;
    fn can_deed_parcel(&self, agent: AgentId, parcel: &LandData) -> bool;
}

/// Parcel persistence. `save` is called after every mutating operation;
/// `load_all` once at region start.
pub trait ParcelStore: Send + Sync {
    fn load_all(&self) -> Vec<LandData>;
    fn save(&self, data: &LandData);
    fn remove(&self, parcel_id: ParcelUuid);
}

/// A remote region known to the grid service.
#[derive(Debug, Clone)]
pub struct RegionInfo {
    pub handle: u64,
    pub name: String,
    pub grid_x: u32,
    pub grid_y: u32,
}

/// Cross-region lookups, the only potentially long-latency calls the engine
/// makes. Kept off the movement hot path by the parcel-info cache.
pub trait GridDirectory: Send + Sync {
    fn region_by_handle(&self, handle: u64) -> Option<RegionInfo>;
    fn land_at(&self, handle: u64, cell_x: u32, cell_y: u32) -> Option<LandData>;
}

/// One countable object in the scene, as seen by the prim-count pass.
#[derive(Debug, Clone)]
pub struct PrimObject {
    pub owner_id: AgentId,
    pub group_id: AgentId,
    pub position: Vec3,
    pub prim_count: i32,
    pub is_attachment: bool,
    pub is_selected: bool,
}

/// Source of the live object set for prim-count accumulation.
pub trait ObjectCensus: Send + Sync {
    fn live_objects(&self) -> Vec<PrimObject>;
}

/// Parcel lifecycle notifications, registered once at initialization.
pub trait LandListener: Send + Sync {
    fn parcel_added(&self, _parcel: &LandData) {}
    fn parcel_removed(&self, _parcel: &LandData) {}
    fn parcel_changed(&self, _parcel: &LandData) {}
}

// ---------------------------------------------------------------------------
// Exposed capability
// ---------------------------------------------------------------------------

/// The capability interface the scene consumes.
///
/// Implemented by [`crate::service::LandService`]; scenes hold this rather
/// than the concrete engine so tests and alternative frontends can swap it.
pub trait LandChannel {
    // Queries
    fn parcel_at(&self, x: f32, y: f32) -> Option<&LandParcel>;
    fn parcel_by_local_id(&self, local_id: i32) -> Option<&LandParcel>;
    fn all_parcels(&self) -> Vec<&LandParcel>;
    fn parcels_near(&self, position: Vec3) -> Vec<&LandParcel>;
    fn parcel_properties(&self, local_id: i32, sequence_id: i32) -> Option<ParcelProperties>;
    fn overlay_chunks(&self, requester: AgentId) -> Vec<OverlayChunk>;
    fn stats(&self) -> LandStats;

    // Requests
    fn subdivide(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        requester: AgentId,
    ) -> Result<i32, LandError>;
    fn join(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        requester: AgentId,
    ) -> Result<i32, LandError>;
    fn update_parcel_properties(
        &mut self,
        requester: AgentId,
        update: &ParcelPropertiesUpdate,
    ) -> Result<(), LandError>;
    fn update_access_list(
        &mut self,
        requester: AgentId,
        update: ParcelAccessListUpdate,
    ) -> Result<(), LandError>;
    fn remote_parcel_request(&self, request: &RemoteParcelRequest) -> RemoteParcelReply;
    fn parcel_info(&self, parcel_id: Uuid) -> Option<ExtendedLandData>;

    // Movement hooks
    fn avatar_moved(&mut self, agent: AgentId, position: Vec3) -> Vec<LandNotice>;
    fn avatar_moved_significantly(&mut self, agent: AgentId, position: Vec3) -> Vec<LandNotice>;

    // Object lifecycle hook – any add/remove/move invalidates prim counts.
    fn object_changed(&mut self);

    // Console / administrative
    fn reset_to_single_parcel(&mut self, owner: AgentId);
    fn force_owner_change(&mut self, local_id: i32, new_owner: AgentId) -> Result<(), LandError>;
    fn set_forceful_bans(&mut self, enabled: bool);
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

/// Estate-based permissions: the parcel owner and the estate owner (plus
/// any listed managers) may edit; reclaim is estate-only.
pub struct EstateGate {
    estate_owner: AgentId,
    managers: Vec<AgentId>,
}

impl EstateGate {
    pub fn new(estate_owner: AgentId) -> Self {
        Self {
            estate_owner,
            managers: Vec::new(),
        }
    }

    pub fn with_managers(estate_owner: AgentId, managers: Vec<AgentId>) -> Self {
        Self {
            estate_owner,
            managers,
        }
    }

    fn is_estate(&self, agent: AgentId) -> bool {
        agent == self.estate_owner || self.managers.contains(&agent)
    }
}

impl PermissionGate for EstateGate {
    fn can_edit_parcel(&self, agent: AgentId, parcel: &LandData) -> bool {
        agent == parcel.owner_id || self.is_estate(agent)
    }

    fn can_abandon_parcel(&self, agent: AgentId, parcel: &LandData) -> bool {
        agent == parcel.owner_id || self.is_estate(agent)
    }

    fn can_reclaim_parcel(&self, agent: AgentId, _parcel: &LandData) -> bool {
        self.is_estate(agent)
    }

    fn can_deed_parcel(&self, agent: AgentId, parcel: &LandData) -> bool {
        agent == parcel.owner_id
    }
}

/// Keeps parcels in a map; what a database-backed store would do, minus the
/// database. Also handy for asserting persistence behavior in tests.
#[derive(Default)]
pub struct MemoryStore {
    parcels: RwLock<std::collections::HashMap<ParcelUuid, LandData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.parcels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.read().is_empty()
    }
}

impl ParcelStore for MemoryStore {
    fn load_all(&self) -> Vec<LandData> {
        self.parcels.read().values().cloned().collect()
    }

    fn save(&self, data: &LandData) {
        self.parcels.write().insert(data.parcel_id, data.clone());
    }

    fn remove(&self, parcel_id: ParcelUuid) {
        self.parcels.write().remove(&parcel_id);
    }
}

/// A region with no reachable neighbors – every remote lookup misses.
pub struct NoNeighbors;

impl GridDirectory for NoNeighbors {
    fn region_by_handle(&self, _handle: u64) -> Option<RegionInfo> {
        None
    }

    fn land_at(&self, _handle: u64, _cell_x: u32, _cell_y: u32) -> Option<LandData> {
        None
    }
}

/// A census over an externally maintained object list.
#[derive(Default)]
pub struct StaticCensus {
    objects: RwLock<Vec<PrimObject>>,
}

impl StaticCensus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_objects(&self, objects: Vec<PrimObject>) {
        *self.objects.write() = objects;
    }

    pub fn push(&self, object: PrimObject) {
        self.objects.write().push(object);
    }
}

impl ObjectCensus for StaticCensus {
    fn live_objects(&self) -> Vec<PrimObject> {
        self.objects.read().clone()
    }
}

/// Listener that ignores everything.
pub struct NullListener;

impl LandListener for NullListener {}
