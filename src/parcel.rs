//! Parcel data layer: the persisted `LandData` record, its flag words and
//! enums, and the `LandParcel` runtime wrapper carrying derived prim
//! counters.

use crate::bitmap::LandBitmap;
use crate::protocol::ParcelPropertiesUpdate;
use crate::types::{AgentId, ParcelUuid, Vec3};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Flag words
// ---------------------------------------------------------------------------

bitflags! {
    /// Per-parcel behaviour flags carried on the wire and persisted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ParcelFlags: u32 {
        const ALLOW_FLY                = 0x0000_0001;
        const ALLOW_OTHER_SCRIPTS      = 0x0000_0002;
        const FOR_SALE                 = 0x0000_0004;
        const ALLOW_LANDMARK           = 0x0000_0008;
        const ALLOW_TERRAFORM          = 0x0000_0010;
        const ALLOW_DAMAGE             = 0x0000_0020;
        const CREATE_OBJECTS           = 0x0000_0040;
        const USE_ACCESS_GROUP         = 0x0000_0100;
        const USE_ACCESS_LIST          = 0x0000_0200;
        const USE_BAN_LIST             = 0x0000_0400;
        const USE_PASS_LIST            = 0x0000_0800;
        const SHOW_DIRECTORY           = 0x0000_1000;
        const ALLOW_DEED_TO_GROUP      = 0x0000_2000;
        const CONTRIBUTE_WITH_DEED     = 0x0000_4000;
        const SOUND_LOCAL              = 0x0000_8000;
        const SELL_PARCEL_OBJECTS      = 0x0001_0000;
        const ALLOW_PUBLISH            = 0x0002_0000;
        const DENY_ANONYMOUS           = 0x0004_0000;
        const ALLOW_GROUP_SCRIPTS      = 0x0008_0000;
        const RESTRICT_PUSH_OBJECT     = 0x0020_0000;
        const ALLOW_GROUP_OBJECT_ENTRY = 0x0040_0000;
        const ALLOW_ALL_OBJECT_ENTRY   = 0x0080_0000;
    }
}

impl ParcelFlags {
    /// Flags applied to freshly created parcels.
    pub fn fresh() -> Self {
        Self::ALLOW_FLY
            | Self::ALLOW_LANDMARK
            | Self::ALLOW_OTHER_SCRIPTS
            | Self::CREATE_OBJECTS
            | Self::ALLOW_DEED_TO_GROUP
            | Self::ALLOW_ALL_OBJECT_ENTRY
    }
}

bitflags! {
    /// Which sub-list an access entry belongs to. A parcel's access list is
    /// both the allow list and the ban list, disambiguated by these bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct AccessFlags: u32 {
        const ACCESS = 0x1;
        const BANNED = 0x2;
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParcelCategory {
    #[default]
    None,
    Linden,
    Adult,
    Arts,
    Business,
    Educational,
    Gaming,
    Hangout,
    Newcomer,
    Park,
    Residential,
    Shopping,
    Stage,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    #[default]
    Leased,
    LeasePending,
    Abandoned,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LandingType {
    Blocked,
    LandingPoint,
    #[default]
    Anywhere,
}

// ---------------------------------------------------------------------------
// Access entries
// ---------------------------------------------------------------------------

/// One allow- or ban-list entry. `expires` is a unix timestamp; zero means
/// the entry never expires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccessEntry {
    pub agent_id: AgentId,
    pub flags: AccessFlags,
    pub expires: i64,
}

impl AccessEntry {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires != 0 && self.expires <= now
    }
}

// ---------------------------------------------------------------------------
// LandData
// ---------------------------------------------------------------------------

/// The persisted value record describing one parcel.
///
/// `aabb_min`/`aabb_max` and `area` are derived from the bitmap – mutate the
/// bitmap only through [`LandData::set_bitmap`] so they stay in sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandData {
    pub parcel_id: ParcelUuid,
    /// Region-scoped id, assigned by the grid at add time. Never reused.
    pub local_id: i32,
    pub owner_id: AgentId,
    pub is_group_owned: bool,
    pub group_id: AgentId,
    pub flags: ParcelFlags,
    pub sale_price: i32,
    pub auction_id: u32,
    pub authorized_buyer: AgentId,
    pub category: ParcelCategory,
    pub status: ParcelStatus,
    pub aabb_min: Vec3,
    pub aabb_max: Vec3,
    pub area: i32,
    pub bitmap: LandBitmap,
    pub name: String,
    pub description: String,
    pub media_url: String,
    pub music_url: String,
    pub landing_type: LandingType,
    pub user_location: Vec3,
    pub user_look_at: Vec3,
    pub pass_price: i32,
    pub pass_hours: f32,
    pub access_list: Vec<AccessEntry>,
    pub dwell: f32,
    /// Auto-return timer for other residents' objects, in minutes. Zero
    /// disables auto-return.
    pub other_clean_time: i32,
}

impl LandData {
    pub fn new(owner_id: AgentId, bitmap: LandBitmap) -> Self {
        let mut data = Self {
            parcel_id: ParcelUuid::random(),
            local_id: 0,
            owner_id,
            is_group_owned: false,
            group_id: AgentId::NIL,
            flags: ParcelFlags::fresh(),
            sale_price: 0,
            auction_id: 0,
            authorized_buyer: AgentId::NIL,
            category: ParcelCategory::None,
            status: ParcelStatus::Leased,
            aabb_min: Vec3::zero(),
            aabb_max: Vec3::zero(),
            area: 0,
            bitmap: LandBitmap::empty(),
            name: "New Parcel".to_string(),
            description: String::new(),
            media_url: String::new(),
            music_url: String::new(),
            landing_type: LandingType::Anywhere,
            user_location: Vec3::zero(),
            user_look_at: Vec3::zero(),
            pass_price: 0,
            pass_hours: 0.0,
            access_list: Vec::new(),
            dwell: 0.0,
            other_clean_time: 0,
        };
        data.set_bitmap(bitmap);
        data
    }

    /// Install a new bitmap and rederive the bounding box and area.
    pub fn set_bitmap(&mut self, bitmap: LandBitmap) {
        match bitmap.aabb() {
            Some((min, max)) => {
                self.aabb_min = min;
                self.aabb_max = max;
            }
            None => {
                self.aabb_min = Vec3::zero();
                self.aabb_max = Vec3::zero();
            }
        }
        self.area = bitmap.area();
        self.bitmap = bitmap;
    }

    /// Copy of this record for the piece split off by a subdivision: fresh
    /// global id, empty bitmap, dwell reset, everything else inherited.
    pub fn clone_for_subdivision(&self) -> Self {
        let mut data = self.clone();
        data.parcel_id = ParcelUuid::random();
        data.local_id = 0;
        data.dwell = 0.0;
        data.set_bitmap(LandBitmap::empty());
        data
    }

    /// Apply an owner-initiated property update. Permission checks happen
    /// before this is called.
    pub fn apply_update(&mut self, update: &ParcelPropertiesUpdate) {
        self.name = update.name.clone();
        self.description = update.description.clone();
        self.flags = update.flags;
        self.media_url = update.media_url.clone();
        self.music_url = update.music_url.clone();
        self.sale_price = update.sale_price;
        self.authorized_buyer = update.authorized_buyer;
        self.category = update.category;
        self.landing_type = update.landing_type;
        self.user_location = update.user_location;
        self.user_look_at = update.user_look_at;
        self.pass_price = update.pass_price;
        self.pass_hours = update.pass_hours;
        self.other_clean_time = update.other_clean_time;
    }
}

// ---------------------------------------------------------------------------
// LandParcel
// ---------------------------------------------------------------------------

/// A parcel's runtime wrapper: the persisted record plus derived prim
/// counters. The counters are only meaningful after the engine's prim-count
/// pass has run with no intervening taint.
#[derive(Debug, Clone)]
pub struct LandParcel {
    pub data: LandData,
    pub owner_prims: i32,
    pub group_prims: i32,
    pub other_prims: i32,
    pub selected_prims: i32,
    /// Summed prims across every parcel of this parcel's owner, region-wide.
    pub simwide_prims: i32,
    /// Summed area across every parcel of this parcel's owner, region-wide.
    pub simwide_area: i32,
}

impl LandParcel {
    pub fn new(data: LandData) -> Self {
        Self {
            data,
            owner_prims: 0,
            group_prims: 0,
            other_prims: 0,
            selected_prims: 0,
            simwide_prims: 0,
            simwide_area: 0,
        }
    }

    pub fn local_id(&self) -> i32 {
        self.data.local_id
    }

    pub fn set_bitmap(&mut self, bitmap: LandBitmap) {
        self.data.set_bitmap(bitmap);
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        let cell = crate::types::CELL_SIZE as f32;
        if x < 0.0 || y < 0.0 {
            return false;
        }
        self.data
            .bitmap
            .get((x / cell).floor() as usize, (y / cell).floor() as usize)
    }

    pub fn total_prims(&self) -> i32 {
        self.owner_prims + self.group_prims + self.other_prims + self.selected_prims
    }

    pub fn reset_prim_counts(&mut self) {
        self.owner_prims = 0;
        self.group_prims = 0;
        self.other_prims = 0;
        self.selected_prims = 0;
        self.simwide_prims = 0;
        self.simwide_area = 0;
    }

    // -----------------------------------------------------------------------
    // Access control
    // -----------------------------------------------------------------------

    /// True when the parcel's ban list is active and carries a live entry
    /// for this agent. Owners are never banned from their own land.
    pub fn is_banned(&self, agent: AgentId, now: i64) -> bool {
        if agent == self.data.owner_id {
            return false;
        }
        self.data.flags.contains(ParcelFlags::USE_BAN_LIST)
            && self.data.access_list.iter().any(|e| {
                e.agent_id == agent && e.flags.contains(AccessFlags::BANNED) && !e.is_expired(now)
            })
    }

    /// True when the parcel restricts entry to its allow list and this agent
    /// has no live entry on it.
    pub fn denies_access(&self, agent: AgentId, now: i64) -> bool {
        if agent == self.data.owner_id {
            return false;
        }
        if !self.data.flags.contains(ParcelFlags::USE_ACCESS_LIST) {
            return false;
        }
        !self.data.access_list.iter().any(|e| {
            e.agent_id == agent && e.flags.contains(AccessFlags::ACCESS) && !e.is_expired(now)
        })
    }

    /// Replace the sub-list selected by `flags` (allow and/or ban) with the
    /// given entries. Entries not carrying one of the selected bits are
    /// dropped rather than misfiled.
    pub fn replace_access_entries(&mut self, flags: AccessFlags, entries: Vec<AccessEntry>) {
        self.data.access_list.retain(|e| !e.flags.intersects(flags));
        self.data
            .access_list
            .extend(entries.into_iter().filter(|e| e.flags.intersects(flags)));
    }

    /// Drop expired allow/ban entries.
    pub fn prune_expired_access(&mut self, now: i64) {
        self.data.access_list.retain(|e| !e.is_expired(now));
    }

    // -----------------------------------------------------------------------
    // Tenure transfers
    // -----------------------------------------------------------------------

    /// Finalise a sale whose economic validation already happened upstream.
    pub fn complete_sale(&mut self, buyer: AgentId, group_id: AgentId, group_owned: bool) {
        self.data.owner_id = buyer;
        self.data.is_group_owned = group_owned;
        self.data.group_id = group_id;
        self.clear_sale_state();
        self.data.status = ParcelStatus::Leased;
    }

    pub fn clear_sale_state(&mut self) {
        self.data
            .flags
            .remove(ParcelFlags::FOR_SALE | ParcelFlags::SELL_PARCEL_OBJECTS);
        self.data.sale_price = 0;
        self.data.auction_id = 0;
        self.data.authorized_buyer = AgentId::NIL;
    }
}
