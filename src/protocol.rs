//! `land.*` wire protocol.
//!
//! This module owns **every message that crosses the service boundary**
//! between the land engine and any consumer (viewer bridge, web client,
//! another server…).
//!
//! ## Channel namespaces
//!
//! | Namespace      | Direction          | Carried by          |
//! |----------------|--------------------|---------------------|
//! | `land.*`       | server → client    | event publication   |
//! | `land.cmd.*`   | client → server    | request-reply       |
//! | `land.mgmt.*`  | scene → server     | management command  |
//!
//! ## Design rules
//!
//! 1. Every struct must be `Serialize + Deserialize` with snake_case JSON.
//! 2. No engine-layer types leak out (`LandGrid`, cell tables, cache
//!    entries…). Bitmaps cross the wire only in their 512-byte form.
//! 3. Overlay data is **never** sent whole — only fixed-size
//!    [`OverlayChunk`]s with a sequence number.
//! 4. Every outbound event includes `frame: u64` and `session: String`.

use crate::parcel::{
    AccessEntry, AccessFlags, LandingType, ParcelCategory, ParcelFlags, ParcelStatus,
};
use crate::types::{AgentId, ParcelUuid, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Common envelope
// ---------------------------------------------------------------------------

/// Every outbound message is wrapped in this envelope.
///
/// The `session` field lets multiplexed clients distinguish regions.
/// The `frame` field lets clients timestamp-sort interleaved streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandEvent<T> {
    pub session: String,
    pub frame: u64,
    pub payload: T,
}

impl<T> LandEvent<T> {
    pub fn new(session: impl Into<String>, frame: u64, payload: T) -> Self {
        Self {
            session: session.into(),
            frame,
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// Overlay  (subject: land.overlay)
// ---------------------------------------------------------------------------

/// One slice of the per-cell ownership overlay.
///
/// A full region overlay is 4096 bytes; chunks carry a fixed number of cells
/// each and a monotonically increasing `sequence_id` so clients can assemble
/// them in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayChunk {
    pub sequence_id: i32,
    /// Chunk count for this overlay snapshot.
    pub total: i32,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Parcel properties  (subjects: land.parcel.properties, land.cmd.*)
// ---------------------------------------------------------------------------

/// Client asks for the properties of the parcel under a point or with a
/// known local id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelPropertiesRequest {
    pub sequence_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(default)]
    pub snap_selection: bool,
}

/// Full parcel description sent in reply to a properties request and after
/// every mutation a client should see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelProperties {
    pub sequence_id: i32,
    pub local_id: i32,
    pub parcel_id: ParcelUuid,
    pub owner_id: AgentId,
    pub is_group_owned: bool,
    pub group_id: AgentId,
    pub flags: ParcelFlags,
    pub area: i32,
    pub aabb_min: Vec3,
    pub aabb_max: Vec3,
    /// 512-byte occupancy bitmap, row-major, LSB-first.
    pub bitmap: Vec<u8>,
    pub name: String,
    pub description: String,
    pub media_url: String,
    pub music_url: String,
    pub sale_price: i32,
    pub auction_id: u32,
    pub authorized_buyer: AgentId,
    pub category: ParcelCategory,
    pub status: ParcelStatus,
    pub landing_type: LandingType,
    pub user_location: Vec3,
    pub user_look_at: Vec3,
    pub pass_price: i32,
    pub pass_hours: f32,
    pub dwell: f32,
    pub other_clean_time: i32,
    pub owner_prims: i32,
    pub group_prims: i32,
    pub other_prims: i32,
    pub selected_prims: i32,
    pub total_prims: i32,
    pub simwide_prims: i32,
    pub simwide_area: i32,
    /// Free-form extension data (media settings, experience keys…).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Owner-initiated property update. Legacy clients send the full record, so
/// every field is concrete — absent knobs arrive as their current values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelPropertiesUpdate {
    pub local_id: i32,
    pub name: String,
    pub description: String,
    pub flags: ParcelFlags,
    pub media_url: String,
    pub music_url: String,
    pub sale_price: i32,
    pub authorized_buyer: AgentId,
    pub category: ParcelCategory,
    pub landing_type: LandingType,
    pub user_location: Vec3,
    pub user_look_at: Vec3,
    pub pass_price: i32,
    pub pass_hours: f32,
    pub other_clean_time: i32,
}

/// Replace one of a parcel's access sub-lists (allow and/or ban).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelAccessListUpdate {
    pub local_id: i32,
    pub flags: AccessFlags,
    pub entries: Vec<AccessEntry>,
}

// ---------------------------------------------------------------------------
// Reshaping  (subjects: land.cmd.divide, land.cmd.join)
// ---------------------------------------------------------------------------

/// Split the selected rectangle off the parcel under it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelDivideRequest {
    pub west: f32,
    pub south: f32,
    pub east: f32,
    pub north: f32,
}

/// Merge every parcel under the selected rectangle into the first one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelJoinRequest {
    pub west: f32,
    pub south: f32,
    pub east: f32,
    pub north: f32,
}

// ---------------------------------------------------------------------------
// Remote parcel lookup  (subjects: land.cmd.remote_parcel, land.cmd.parcel_info)
// ---------------------------------------------------------------------------

/// Ask for a fake parcel id, either from a region cell or by echoing a
/// previously issued id for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteParcelRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_handle: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_x: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_y: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parcel_id: Option<Uuid>,
}

/// `parcel_id` is `None` when the request was malformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteParcelReply {
    pub parcel_id: Option<Uuid>,
}

/// About-landmark query keyed by a fake parcel id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelInfoRequest {
    pub parcel_id: Uuid,
}

/// Parcel summary for landmark/about-land display. Everything a viewer
/// card needs without another round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelInfoData {
    pub parcel_id: ParcelUuid,
    pub region_handle: u64,
    pub cell_x: u32,
    pub cell_y: u32,
    pub name: String,
    pub description: String,
    pub owner_id: AgentId,
    pub area: i32,
    pub sale_price: i32,
    pub category: ParcelCategory,
}

/// `parcel` is `None` when the id was malformed or the region unreachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelInfoReply {
    pub parcel: Option<ParcelInfoData>,
}

// ---------------------------------------------------------------------------
// Dwell  (subject: land.cmd.dwell)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelDwellRequest {
    pub local_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelDwellReply {
    pub local_id: i32,
    pub dwell: f32,
}

// ---------------------------------------------------------------------------
// Enforcement notices  (subject: land.notice)
// ---------------------------------------------------------------------------

/// Outcome of a movement check the scene must act on or forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LandNotice {
    /// Move the avatar to `position`; `zero_velocity` kills its momentum so
    /// it does not immediately re-cross the ban line.
    ForcePosition {
        agent_id: AgentId,
        position: Vec3,
        zero_velocity: bool,
    },
    /// Plain warning text shown to the avatar.
    Alert { agent_id: AgentId, message: String },
    /// The nearest neighboring parcel that bans (`banned == true`) or
    /// restricts this avatar, reported once per approach.
    BanLine {
        agent_id: AgentId,
        parcel_local_id: i32,
        banned: bool,
    },
}

// ---------------------------------------------------------------------------
// Snapshot  (subject: land.snapshot)
// ---------------------------------------------------------------------------

/// Full land state sent on initial connect or after reconnect.
///
/// Clients should hydrate their parcel cache from this before processing
/// incremental events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandSnapshot {
    pub parcels: Vec<ParcelProperties>,
    pub overlay: Vec<OverlayChunk>,
}

// ---------------------------------------------------------------------------
// Subject helpers
// ---------------------------------------------------------------------------

/// All subjects used by the land protocol, as constants.
pub mod subjects {
    pub const OVERLAY: &str = "land.overlay";
    pub const PARCEL_PROPERTIES: &str = "land.parcel.properties";
    pub const NOTICE: &str = "land.notice";
    pub const SNAPSHOT: &str = "land.snapshot";

    pub const CMD_PROPERTIES: &str = "land.cmd.properties";
    pub const CMD_UPDATE: &str = "land.cmd.update";
    pub const CMD_ACCESS_LIST: &str = "land.cmd.access_list";
    pub const CMD_DIVIDE: &str = "land.cmd.divide";
    pub const CMD_JOIN: &str = "land.cmd.join";
    pub const CMD_REMOTE_PARCEL: &str = "land.cmd.remote_parcel";
    pub const CMD_PARCEL_INFO: &str = "land.cmd.parcel_info";
    pub const CMD_DWELL: &str = "land.cmd.dwell";
    pub const CMD_STATS: &str = "land.cmd.stats";

    /// Management commands sent by the scene/coordinator → land service.
    /// (Not used directly by clients.)
    pub mod mgmt {
        pub const AVATAR_JOIN: &str = "land.mgmt.avatar.join";
        pub const AVATAR_LEAVE: &str = "land.mgmt.avatar.leave";
        pub const AVATAR_MOVED: &str = "land.mgmt.avatar.moved";
        pub const AVATAR_MOVED_SIGNIFICANTLY: &str = "land.mgmt.avatar.moved_significantly";
        pub const OBJECT_CHANGED: &str = "land.mgmt.object.changed";
        pub const RESET_REGION: &str = "land.mgmt.reset_region";
        pub const FORCE_OWNER: &str = "land.mgmt.force_owner";
        pub const BAN_POLICY: &str = "land.mgmt.ban_policy";
    }
}
