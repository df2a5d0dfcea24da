//! LandService – parcel lifecycle, subdivision/join, ban-line enforcement,
//! prim-count accounting, overlay snapshots, and cross-region parcel info.
//!
//! The service is a plain `&mut self` state machine: linearizability of the
//! mutating operations comes from the single lock the embedding scene (or
//! the server binary) wraps it in. Nothing in here blocks on I/O – the
//! store and directory collaborators decide their own latency, and the
//! parcel-info cache keeps the directory off the movement hot path.

use crate::bitmap::LandBitmap;
use crate::grid::LandGrid;
use crate::parcel::{LandData, LandParcel, ParcelFlags};
use crate::protocol::{
    LandNotice, LandSnapshot, OverlayChunk, ParcelAccessListUpdate, ParcelProperties,
    ParcelPropertiesUpdate, RemoteParcelReply, RemoteParcelRequest,
};
use crate::remote::{self, ExtendedLandData, ParcelInfoCache};
use crate::scene::{
    GridDirectory, LandChannel, LandListener, ObjectCensus, ParcelStore, PermissionGate,
};
use crate::types::{
    unix_now, AgentId, LandError, LandServiceConfig, LandStats, Vec3, CELL_SIZE, GRID_DIM,
};
use crate::overlay;
use bytes::Bytes;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// The 8 cell-sized offsets probed for nearby ban lines.
const NEIGHBOR_OFFSETS: [(f32, f32); 8] = [
    (-(CELL_SIZE as f32), -(CELL_SIZE as f32)),
    (0.0, -(CELL_SIZE as f32)),
    (CELL_SIZE as f32, -(CELL_SIZE as f32)),
    (-(CELL_SIZE as f32), 0.0),
    (CELL_SIZE as f32, 0.0),
    (-(CELL_SIZE as f32), CELL_SIZE as f32),
    (0.0, CELL_SIZE as f32),
    (CELL_SIZE as f32, CELL_SIZE as f32),
];

// ---------------------------------------------------------------------------
// Per-avatar state
// ---------------------------------------------------------------------------

/// Enforcement state carried per tracked avatar.
#[derive(Debug)]
pub struct AvatarLandState {
    pub position: Vec3,
    /// Most recent position where the avatar stood unchallenged – the
    /// return point for forceful ban enforcement.
    pub last_safe_position: Option<Vec3>,
    pub current_parcel: Option<i32>,
    last_dwell_parcel: Option<i32>,
    /// Parcels already warned about restricted access since entry.
    warned_restricted: HashSet<i32>,
    /// Last parcel reported through a ban-line notice, so each approach is
    /// reported exactly once.
    last_ban_notice: Option<i32>,
}

impl AvatarLandState {
    fn new(position: Vec3) -> Self {
        Self {
            position,
            last_safe_position: None,
            current_parcel: None,
            last_dwell_parcel: None,
            warned_restricted: HashSet::new(),
            last_ban_notice: None,
        }
    }
}

// ---------------------------------------------------------------------------
// LandService
// ---------------------------------------------------------------------------

pub struct LandService {
    config: LandServiceConfig,
    grid: LandGrid,
    avatars: HashMap<AgentId, AvatarLandState>,
    prim_counts_tainted: bool,
    movement_events: u64,
    info_cache: ParcelInfoCache,
    permissions: Arc<dyn PermissionGate>,
    store: Arc<dyn ParcelStore>,
    directory: Arc<dyn GridDirectory>,
    census: Arc<dyn ObjectCensus>,
    listener: Arc<dyn LandListener>,
}

impl LandService {
    pub fn new(
        config: LandServiceConfig,
        permissions: Arc<dyn PermissionGate>,
        store: Arc<dyn ParcelStore>,
        directory: Arc<dyn GridDirectory>,
        census: Arc<dyn ObjectCensus>,
        listener: Arc<dyn LandListener>,
    ) -> Self {
        let info_cache = ParcelInfoCache::new(
            config.parcel_info_capacity,
            Duration::from_secs(config.parcel_info_ttl_secs),
        );
        Self {
            config,
            grid: LandGrid::new(),
            avatars: HashMap::new(),
            prim_counts_tainted: false,
            movement_events: 0,
            info_cache,
            permissions,
            store,
            directory,
            census,
            listener,
        }
    }

    pub fn config(&self) -> &LandServiceConfig {
        &self.config
    }

    /// Load persisted parcels, or create the bootstrap parcel covering the
    /// whole region when the store is empty or inconsistent.
    pub fn bootstrap(&mut self) {
        let stored = self.store.load_all();
        if stored.is_empty() {
            info!("no persisted parcels – creating the bootstrap parcel");
            let owner = self.config.estate_owner;
            self.reset_to_single_parcel(owner);
            return;
        }

        info!("restoring {} persisted parcels", stored.len());
        for data in stored {
            let id = self.grid.restore(data);
            if let Some(parcel) = self.grid.by_local_id(id) {
                self.listener.parcel_added(&parcel.data);
            }
        }

        let missing = self.grid.unassigned_cells();
        if missing > 0 {
            warn!(
                "persisted parcels leave {} cells unowned – resetting region",
                missing
            );
            let owner = self.config.estate_owner;
            self.reset_to_single_parcel(owner);
            return;
        }
        self.prim_counts_tainted = true;
    }

    // -----------------------------------------------------------------------
    // Parcel lifecycle
    // -----------------------------------------------------------------------

    /// Register a parcel, stamp its bitmap into the grid, persist it, and
    /// notify the listener. Returns the assigned local id.
    pub fn add_parcel(&mut self, data: LandData) -> i32 {
        let id = self.grid.insert(data);
        if let Some(parcel) = self.grid.by_local_id(id) {
            self.store.save(&parcel.data);
            self.listener.parcel_added(&parcel.data);
        }
        debug!("added parcel {}", id);
        id
    }

    /// Remove a parcel from the region. Refused while any grid cell still
    /// references it.
    pub fn remove_parcel(&mut self, local_id: i32) -> Result<(), LandError> {
        let removed = self.grid.remove(local_id)?;
        self.store.remove(removed.data.parcel_id);
        self.listener.parcel_removed(&removed.data);
        self.prim_counts_tainted = true;
        info!("removed parcel {}", local_id);
        Ok(())
    }

    /// Replace every parcel with a single one covering the whole region.
    pub fn reset_to_single_parcel(&mut self, owner: AgentId) {
        let old: Vec<LandData> = self.grid.parcels().map(|p| p.data.clone()).collect();
        for data in &old {
            self.store.remove(data.parcel_id);
            self.listener.parcel_removed(data);
        }
        self.grid.clear();

        let mut data = LandData::new(owner, LandBitmap::full());
        data.name = self.config.region_name.clone();
        let id = self.add_parcel(data);
        self.prim_counts_tainted = true;
        info!("region reset to single parcel {} owned by {}", id, owner);
    }

    // -----------------------------------------------------------------------
    // Subdivide / join
    // -----------------------------------------------------------------------

    /// Split the 4m-aligned rectangle off the parcel under it into a new
    /// parcel owned by the same resident.
    ///
    /// Every precondition is validated before the first mutation; a failure
    /// leaves the region untouched.
    pub fn subdivide(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        requester: AgentId,
    ) -> Result<i32, LandError> {
        let rect = LandBitmap::from_rect(x1, y1, x2, y2);
        if rect.is_empty() {
            return Err(LandError::NotSingleParcel);
        }

        // The whole selection must sit inside one parcel.
        let mut source_id = None;
        for (cx, cy) in rect.iter_cells() {
            match self.grid.local_id_at_cell(cx, cy) {
                Some(id) => match source_id {
                    None => source_id = Some(id),
                    Some(prev) if prev != id => return Err(LandError::NotSingleParcel),
                    _ => {}
                },
                None => return Err(LandError::NotSingleParcel),
            }
        }
        let source_id = source_id.ok_or(LandError::NotSingleParcel)?;

        let (allowed, mut new_data, mut remainder) = {
            let source = self
                .grid
                .by_local_id(source_id)
                .ok_or(LandError::UnknownParcel(source_id))?;
            (
                self.permissions.can_edit_parcel(requester, &source.data),
                source.data.clone_for_subdivision(),
                source.data.bitmap.clone(),
            )
        };
        if !allowed {
            debug!("subdivide on parcel {} refused for {}", source_id, requester);
            return Err(LandError::PermissionDenied(requester));
        }

        remainder.clear_rect(x1, y1, x2, y2);
        if remainder.is_empty() {
            debug!("subdivide covers all of parcel {} – ignored", source_id);
            return Err(LandError::WouldEmptyParcel(source_id));
        }

        new_data.set_bitmap(rect);
        if let Some(source) = self.grid.by_local_id_mut(source_id) {
            source.set_bitmap(remainder);
            self.store.save(&source.data);
            self.listener.parcel_changed(&source.data);
        }
        let new_id = self.add_parcel(new_data);
        self.prim_counts_tainted = true;
        info!("subdivided parcel {} – new parcel {}", source_id, new_id);
        Ok(new_id)
    }

    /// Merge every parcel under the rectangle into the one found first in
    /// row-major scan order. All parcels must share identical ownership and
    /// the requester must be able to edit the surviving parcel.
    pub fn join(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        requester: AgentId,
    ) -> Result<i32, LandError> {
        let rect = LandBitmap::from_rect(x1, y1, x2, y2);
        let mut ordered = Vec::new();
        for (cx, cy) in rect.iter_cells() {
            if let Some(id) = self.grid.local_id_at_cell(cx, cy) {
                if !ordered.contains(&id) {
                    ordered.push(id);
                }
            }
        }
        if ordered.len() < 2 {
            return Err(LandError::NothingToJoin);
        }
        let master_id = ordered[0];

        {
            let master = self
                .grid
                .by_local_id(master_id)
                .ok_or(LandError::UnknownParcel(master_id))?;
            if !self.permissions.can_edit_parcel(requester, &master.data) {
                debug!("join into parcel {} refused for {}", master_id, requester);
                return Err(LandError::PermissionDenied(requester));
            }
            for &slave_id in &ordered[1..] {
                let slave = self
                    .grid
                    .by_local_id(slave_id)
                    .ok_or(LandError::UnknownParcel(slave_id))?;
                if slave.data.owner_id != master.data.owner_id
                    || slave.data.is_group_owned != master.data.is_group_owned
                    || slave.data.group_id != master.data.group_id
                {
                    debug!(
                        "join refused: parcel {} and {} have different owners",
                        master_id, slave_id
                    );
                    return Err(LandError::OwnerMismatch);
                }
            }
        }

        let mut merged = self
            .grid
            .by_local_id(master_id)
            .map(|p| p.data.bitmap.clone())
            .ok_or(LandError::UnknownParcel(master_id))?;
        for &slave_id in &ordered[1..] {
            let slave_bitmap = self
                .grid
                .by_local_id(slave_id)
                .map(|p| p.data.bitmap.clone())
                .ok_or(LandError::UnknownParcel(slave_id))?;
            merged.union_with(&slave_bitmap);
            self.grid.reassign(slave_id, master_id);
            let removed = self.grid.remove(slave_id)?;
            self.store.remove(removed.data.parcel_id);
            self.listener.parcel_removed(&removed.data);
        }

        if let Some(master) = self.grid.by_local_id_mut(master_id) {
            master.set_bitmap(merged);
            self.store.save(&master.data);
            self.listener.parcel_changed(&master.data);
        }
        self.prim_counts_tainted = true;
        info!(
            "joined {} parcels into parcel {}",
            ordered.len(),
            master_id
        );
        Ok(master_id)
    }

    // -----------------------------------------------------------------------
    // Movement enforcement
    // -----------------------------------------------------------------------

    pub fn avatar_connected(&mut self, agent: AgentId, position: Vec3) {
        self.avatars.insert(agent, AvatarLandState::new(position));
        debug!("tracking avatar {} at {}", agent, position);
    }

    pub fn avatar_disconnected(&mut self, agent: AgentId) {
        self.avatars.remove(&agent);
        debug!("stopped tracking avatar {}", agent);
    }

    pub fn tracked_avatars(&self) -> usize {
        self.avatars.len()
    }

    /// Fine-grained movement check, run on every position update.
    ///
    /// Returns the notices the scene must act on: a warning, and – when
    /// forceful bans are enabled and the avatar is below the ban-line
    /// altitude on land that bans it – a reposition to its last safe spot
    /// with velocity zeroed.
    pub fn avatar_moved(&mut self, agent: AgentId, position: Vec3) -> Vec<LandNotice> {
        self.movement_events += 1;
        let mut notices = Vec::new();
        let now = unix_now();

        let verdict = self
            .grid
            .parcel_at(position.x, position.y)
            .map(|p| (p.local_id(), p.is_banned(agent, now), p.denies_access(agent, now)));

        let below = position.z < self.config.ban_line_safety_height;
        let forceful = self.config.forceful_bans;

        let state = self
            .avatars
            .entry(agent)
            .or_insert_with(|| AvatarLandState::new(position));
        state.position = position;

        let Some((parcel_id, banned, restricted)) = verdict else {
            // Outside [0, region) – edge callers clamp before asking.
            return notices;
        };

        if state.current_parcel != Some(parcel_id) {
            state.current_parcel = Some(parcel_id);
            state.warned_restricted.clear();
        }

        if banned && below {
            notices.push(LandNotice::Alert {
                agent_id: agent,
                message: "You are banned from this parcel.".to_string(),
            });
            if forceful {
                if let Some(safe) = state.last_safe_position {
                    notices.push(LandNotice::ForcePosition {
                        agent_id: agent,
                        position: safe,
                        zero_velocity: true,
                    });
                } else {
                    debug!("no safe position recorded for {} – warning only", agent);
                }
            }
        } else if restricted {
            if state.warned_restricted.insert(parcel_id) {
                notices.push(LandNotice::Alert {
                    agent_id: agent,
                    message: "You do not have access to this parcel.".to_string(),
                });
            }
        } else {
            state.last_safe_position = Some(position);
        }

        notices
    }

    /// Coarse-grained movement check. Runs the fine-grained enforcement,
    /// accumulates parcel dwell on entry, and reports the nearest
    /// neighboring parcel that bans or restricts the avatar – once per
    /// approach.
    pub fn avatar_moved_significantly(&mut self, agent: AgentId, position: Vec3) -> Vec<LandNotice> {
        let mut notices = self.avatar_moved(agent, position);
        let now = unix_now();

        // Dwell bumps once per parcel entry.
        let current = self.avatars.get(&agent).and_then(|s| s.current_parcel);
        let last_dwell = self.avatars.get(&agent).and_then(|s| s.last_dwell_parcel);
        if current != last_dwell {
            if let Some(state) = self.avatars.get_mut(&agent) {
                state.last_dwell_parcel = current;
            }
            if let Some(id) = current {
                if let Some(parcel) = self.grid.by_local_id_mut(id) {
                    parcel.data.dwell += 1.0;
                }
            }
        }

        // Nearest hostile neighbor cell, if any.
        let mut nearest: Option<(f32, i32, bool)> = None;
        for (dx, dy) in NEIGHBOR_OFFSETS {
            let Some(parcel) = self.grid.parcel_at(position.x + dx, position.y + dy) else {
                continue;
            };
            let banned = parcel.is_banned(agent, now);
            if !banned && !parcel.denies_access(agent, now) {
                continue;
            }
            let dist = dx * dx + dy * dy;
            if nearest.map_or(true, |(best, _, _)| dist < best) {
                nearest = Some((dist, parcel.local_id(), banned));
            }
        }

        if let Some(state) = self.avatars.get_mut(&agent) {
            match nearest {
                Some((_, parcel_id, banned)) => {
                    if state.last_ban_notice != Some(parcel_id) {
                        state.last_ban_notice = Some(parcel_id);
                        notices.push(LandNotice::BanLine {
                            agent_id: agent,
                            parcel_local_id: parcel_id,
                            banned,
                        });
                    }
                }
                None => state.last_ban_notice = None,
            }
        }

        notices
    }

    // -----------------------------------------------------------------------
    // Prim-count accounting
    // -----------------------------------------------------------------------

    /// Mark the per-parcel prim counters stale. Called from every
    /// object-added/removed/moved notification and after parcel reshaping.
    pub fn taint_prim_counts(&mut self) {
        self.prim_counts_tainted = true;
    }

    pub fn prim_counts_tainted(&self) -> bool {
        self.prim_counts_tainted
    }

    /// Recompute every parcel's prim counters from the live object census.
    ///
    /// A full reset → accumulate → finalize pass over the scene; skipped
    /// entirely while the counters are clean. Returns whether a pass ran.
    pub fn refresh_prim_counts(&mut self) -> bool {
        if !self.prim_counts_tainted {
            return false;
        }

        for parcel in self.grid.parcels_mut() {
            parcel.reset_prim_counts();
        }

        let objects = self.census.live_objects();
        for object in &objects {
            if object.is_attachment {
                continue;
            }
            let Some(parcel) = self.grid.parcel_at_mut(object.position.x, object.position.y)
            else {
                continue;
            };
            if object.is_selected {
                parcel.selected_prims += object.prim_count;
            } else if object.owner_id == parcel.data.owner_id {
                parcel.owner_prims += object.prim_count;
            } else if !object.group_id.is_nil() && object.group_id == parcel.data.group_id {
                parcel.group_prims += object.prim_count;
            } else {
                parcel.other_prims += object.prim_count;
            }
        }

        // Region-wide per-owner totals, written back into every parcel of
        // that owner so per-owner caps work independently of boundaries.
        let mut totals: HashMap<AgentId, (i32, i32)> = HashMap::new();
        for parcel in self.grid.parcels() {
            let entry = totals.entry(parcel.data.owner_id).or_insert((0, 0));
            entry.0 += parcel.data.area;
            entry.1 += parcel.total_prims();
        }
        for parcel in self.grid.parcels_mut() {
            if let Some(&(area, prims)) = totals.get(&parcel.data.owner_id) {
                parcel.simwide_area = area;
                parcel.simwide_prims = prims;
            }
        }

        self.prim_counts_tainted = false;
        debug!("prim counts refreshed over {} objects", objects.len());
        true
    }

    // -----------------------------------------------------------------------
    // Property updates & tenure
    // -----------------------------------------------------------------------

    pub fn update_parcel_properties(
        &mut self,
        requester: AgentId,
        update: &ParcelPropertiesUpdate,
    ) -> Result<(), LandError> {
        let allowed = {
            let parcel = self
                .grid
                .by_local_id(update.local_id)
                .ok_or(LandError::UnknownParcel(update.local_id))?;
            self.permissions.can_edit_parcel(requester, &parcel.data)
        };
        if !allowed {
            debug!(
                "property update on parcel {} refused for {}",
                update.local_id, requester
            );
            return Err(LandError::PermissionDenied(requester));
        }
        if let Some(parcel) = self.grid.by_local_id_mut(update.local_id) {
            parcel.data.apply_update(update);
            self.store.save(&parcel.data);
            self.listener.parcel_changed(&parcel.data);
        }
        Ok(())
    }

    /// Replace one of a parcel's access sub-lists (allow and/or ban).
    pub fn update_access_list(
        &mut self,
        requester: AgentId,
        update: ParcelAccessListUpdate,
    ) -> Result<(), LandError> {
        let allowed = {
            let parcel = self
                .grid
                .by_local_id(update.local_id)
                .ok_or(LandError::UnknownParcel(update.local_id))?;
            self.permissions.can_edit_parcel(requester, &parcel.data)
        };
        if !allowed {
            debug!(
                "access-list update on parcel {} refused for {}",
                update.local_id, requester
            );
            return Err(LandError::PermissionDenied(requester));
        }
        if let Some(parcel) = self.grid.by_local_id_mut(update.local_id) {
            parcel.replace_access_entries(update.flags, update.entries);
            self.store.save(&parcel.data);
            self.listener.parcel_changed(&parcel.data);
        }
        Ok(())
    }

    /// Finalise a purchase. Economic validation (balance, escrow) happened
    /// upstream – this only checks the parcel is actually on offer to this
    /// buyer, then transfers tenure.
    pub fn complete_sale(
        &mut self,
        local_id: i32,
        buyer: AgentId,
        group_id: AgentId,
        group_owned: bool,
    ) -> Result<(), LandError> {
        let parcel = self
            .grid
            .by_local_id_mut(local_id)
            .ok_or(LandError::UnknownParcel(local_id))?;
        if !parcel.data.flags.contains(ParcelFlags::FOR_SALE) {
            return Err(LandError::NotForSale(local_id));
        }
        if !parcel.data.authorized_buyer.is_nil() && parcel.data.authorized_buyer != buyer {
            debug!(
                "sale of parcel {} refused: {} is not the authorized buyer",
                local_id, buyer
            );
            return Err(LandError::PermissionDenied(buyer));
        }
        parcel.complete_sale(buyer, group_id, group_owned);
        self.store.save(&parcel.data);
        self.listener.parcel_changed(&parcel.data);
        self.prim_counts_tainted = true;
        info!("parcel {} sold to {}", local_id, buyer);
        Ok(())
    }

    pub fn abandon_parcel(&mut self, local_id: i32, requester: AgentId) -> Result<(), LandError> {
        let allowed = {
            let parcel = self
                .grid
                .by_local_id(local_id)
                .ok_or(LandError::UnknownParcel(local_id))?;
            self.permissions.can_abandon_parcel(requester, &parcel.data)
        };
        if !allowed {
            return Err(LandError::PermissionDenied(requester));
        }
        let estate_owner = self.config.estate_owner;
        if let Some(parcel) = self.grid.by_local_id_mut(local_id) {
            parcel.data.owner_id = estate_owner;
            parcel.data.is_group_owned = false;
            parcel.data.group_id = AgentId::NIL;
            parcel.data.status = crate::parcel::ParcelStatus::Abandoned;
            parcel.clear_sale_state();
            self.store.save(&parcel.data);
            self.listener.parcel_changed(&parcel.data);
        }
        self.prim_counts_tainted = true;
        info!("parcel {} abandoned to the estate", local_id);
        Ok(())
    }

    pub fn reclaim_parcel(&mut self, local_id: i32, requester: AgentId) -> Result<(), LandError> {
        let allowed = {
            let parcel = self
                .grid
                .by_local_id(local_id)
                .ok_or(LandError::UnknownParcel(local_id))?;
            self.permissions.can_reclaim_parcel(requester, &parcel.data)
        };
        if !allowed {
            return Err(LandError::PermissionDenied(requester));
        }
        let estate_owner = self.config.estate_owner;
        if let Some(parcel) = self.grid.by_local_id_mut(local_id) {
            parcel.data.owner_id = estate_owner;
            parcel.data.is_group_owned = false;
            parcel.data.group_id = AgentId::NIL;
            parcel.data.status = crate::parcel::ParcelStatus::Leased;
            parcel.clear_sale_state();
            self.store.save(&parcel.data);
            self.listener.parcel_changed(&parcel.data);
        }
        self.prim_counts_tainted = true;
        info!("parcel {} reclaimed by the estate", local_id);
        Ok(())
    }

    pub fn deed_to_group(
        &mut self,
        local_id: i32,
        requester: AgentId,
        group_id: AgentId,
    ) -> Result<(), LandError> {
        let allowed = {
            let parcel = self
                .grid
                .by_local_id(local_id)
                .ok_or(LandError::UnknownParcel(local_id))?;
            self.permissions.can_deed_parcel(requester, &parcel.data)
        };
        if !allowed {
            return Err(LandError::PermissionDenied(requester));
        }
        if let Some(parcel) = self.grid.by_local_id_mut(local_id) {
            parcel.data.owner_id = group_id;
            parcel.data.group_id = group_id;
            parcel.data.is_group_owned = true;
            self.store.save(&parcel.data);
            self.listener.parcel_changed(&parcel.data);
        }
        self.prim_counts_tainted = true;
        info!("parcel {} deeded to group {}", local_id, group_id);
        Ok(())
    }

    /// Administrative owner change, no permission gate – console only.
    pub fn force_owner_change(
        &mut self,
        local_id: i32,
        new_owner: AgentId,
    ) -> Result<(), LandError> {
        let parcel = self
            .grid
            .by_local_id_mut(local_id)
            .ok_or(LandError::UnknownParcel(local_id))?;
        parcel.data.owner_id = new_owner;
        parcel.data.is_group_owned = false;
        parcel.data.group_id = AgentId::NIL;
        parcel.data.status = crate::parcel::ParcelStatus::Leased;
        parcel.clear_sale_state();
        self.store.save(&parcel.data);
        self.listener.parcel_changed(&parcel.data);
        self.prim_counts_tainted = true;
        info!("parcel {} owner forced to {}", local_id, new_owner);
        Ok(())
    }

    /// Region-wide ban policy switch – console only.
    pub fn set_forceful_bans(&mut self, enabled: bool) {
        self.config.forceful_bans = enabled;
        info!("forceful bans {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn forceful_bans(&self) -> bool {
        self.config.forceful_bans
    }

    // -----------------------------------------------------------------------
    // Remote parcel info
    // -----------------------------------------------------------------------

    /// Issue (or validate) a fake parcel id for later about-landmark
    /// queries.
    pub fn remote_parcel_request(&self, request: &RemoteParcelRequest) -> RemoteParcelReply {
        if let Some(id) = request.parcel_id {
            return match remote::decode_fake_parcel_id(id) {
                Ok(_) => RemoteParcelReply { parcel_id: Some(id) },
                Err(err) => {
                    warn!("remote parcel request rejected: {}", err);
                    RemoteParcelReply { parcel_id: None }
                }
            };
        }
        match (request.cell_x, request.cell_y) {
            (Some(cx), Some(cy)) if (cx as usize) < GRID_DIM && (cy as usize) < GRID_DIM => {
                let handle = request.region_handle.unwrap_or(self.config.region_handle);
                RemoteParcelReply {
                    parcel_id: Some(remote::encode_fake_parcel_id(handle, cx, cy)),
                }
            }
            _ => {
                warn!("remote parcel request without usable coordinates");
                RemoteParcelReply { parcel_id: None }
            }
        }
    }

    /// Resolve a fake parcel id to parcel data.
    ///
    /// Local handles read the grid directly; remote handles go through the
    /// directory with successful answers cached. Failures are never cached,
    /// so an unreachable region stays retryable.
    pub fn parcel_info(&self, fake_id: Uuid) -> Option<ExtendedLandData> {
        let (handle, cell_x, cell_y) = match remote::decode_fake_parcel_id(fake_id) {
            Ok(parts) => parts,
            Err(err) => {
                warn!("parcel info request rejected: {}", err);
                return None;
            }
        };

        if handle == self.config.region_handle {
            return self
                .grid
                .parcel_at_cell(cell_x as usize, cell_y as usize)
                .map(|parcel| ExtendedLandData {
                    data: parcel.data.clone(),
                    region_handle: handle,
                    cell_x,
                    cell_y,
                });
        }

        if let Some(hit) = self.info_cache.get(&fake_id) {
            return Some(hit);
        }

        let Some(region) = self.directory.region_by_handle(handle) else {
            debug!("parcel info for unknown region handle {} – not cached", handle);
            return None;
        };
        match self.directory.land_at(handle, cell_x, cell_y) {
            Some(data) => {
                let info = ExtendedLandData {
                    data,
                    region_handle: handle,
                    cell_x,
                    cell_y,
                };
                self.info_cache.insert(fake_id, info.clone());
                debug!(
                    "cached parcel info for cell ({}, {}) of {}",
                    cell_x, cell_y, region.name
                );
                Some(info)
            }
            None => {
                debug!(
                    "no parcel data at ({}, {}) of {} – not cached",
                    cell_x, cell_y, region.name
                );
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn parcel_at(&self, x: f32, y: f32) -> Option<&LandParcel> {
        self.grid.parcel_at(x, y)
    }

    pub fn parcel_by_local_id(&self, local_id: i32) -> Option<&LandParcel> {
        self.grid.by_local_id(local_id)
    }

    /// Every parcel, ordered by local id.
    pub fn all_parcels(&self) -> Vec<&LandParcel> {
        let mut parcels: Vec<_> = self.grid.parcels().collect();
        parcels.sort_by_key(|p| p.local_id());
        parcels
    }

    /// Distinct parcels under the 3×3 cell neighborhood of a position.
    pub fn parcels_near(&self, position: Vec3) -> Vec<&LandParcel> {
        let cell = CELL_SIZE as f32;
        let mut ids = Vec::new();
        for dy in -1..=1i32 {
            for dx in -1..=1i32 {
                let x = position.x + dx as f32 * cell;
                let y = position.y + dy as f32 * cell;
                if let Some(id) = self.grid.local_id_at(x, y) {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }
        ids.iter()
            .filter_map(|id| self.grid.by_local_id(*id))
            .collect()
    }

    pub fn parcel_properties(&self, local_id: i32, sequence_id: i32) -> Option<ParcelProperties> {
        self.grid
            .by_local_id(local_id)
            .map(|p| build_properties(p, sequence_id))
    }

    pub fn parcel_dwell(&self, local_id: i32) -> Option<f32> {
        self.grid.by_local_id(local_id).map(|p| p.data.dwell)
    }

    /// Full 4096-byte overlay snapshot for one requester.
    pub fn overlay(&self, requester: AgentId) -> Bytes {
        overlay::encode_overlay(&self.grid, requester)
    }

    pub fn overlay_chunks(&self, requester: AgentId) -> Vec<OverlayChunk> {
        overlay::chunk_overlay(&self.overlay(requester), self.config.overlay_cells_per_chunk)
    }

    /// Build a full-state [`LandSnapshot`] for a reconnecting client.
    pub fn build_snapshot(&self, requester: AgentId) -> LandSnapshot {
        LandSnapshot {
            parcels: self
                .all_parcels()
                .into_iter()
                .map(|p| build_properties(p, 0))
                .collect(),
            overlay: self.overlay_chunks(requester),
        }
    }

    pub fn stats(&self) -> LandStats {
        LandStats {
            parcels: self.grid.len(),
            next_local_id: self.grid.next_local_id(),
            tracked_avatars: self.avatars.len(),
            prim_counts_tainted: self.prim_counts_tainted,
            cached_parcel_info: self.info_cache.len(),
            movement_events: self.movement_events,
        }
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Drop expired allow/ban entries from every parcel.
    pub fn prune_access_lists(&mut self) {
        let now = unix_now();
        for parcel in self.grid.parcels_mut() {
            parcel.prune_expired_access(now);
        }
    }

    pub fn purge_parcel_info_cache(&self) {
        self.info_cache.purge_expired();
    }
}

// ---------------------------------------------------------------------------
// Properties assembly
// ---------------------------------------------------------------------------

fn build_properties(parcel: &LandParcel, sequence_id: i32) -> ParcelProperties {
    let data = &parcel.data;
    ParcelProperties {
        sequence_id,
        local_id: data.local_id,
        parcel_id: data.parcel_id,
        owner_id: data.owner_id,
        is_group_owned: data.is_group_owned,
        group_id: data.group_id,
        flags: data.flags,
        area: data.area,
        aabb_min: data.aabb_min,
        aabb_max: data.aabb_max,
        bitmap: data.bitmap.to_bytes(),
        name: data.name.clone(),
        description: data.description.clone(),
        media_url: data.media_url.clone(),
        music_url: data.music_url.clone(),
        sale_price: data.sale_price,
        auction_id: data.auction_id,
        authorized_buyer: data.authorized_buyer,
        category: data.category,
        status: data.status,
        landing_type: data.landing_type,
        user_location: data.user_location,
        user_look_at: data.user_look_at,
        pass_price: data.pass_price,
        pass_hours: data.pass_hours,
        dwell: data.dwell,
        other_clean_time: data.other_clean_time,
        owner_prims: parcel.owner_prims,
        group_prims: parcel.group_prims,
        other_prims: parcel.other_prims,
        selected_prims: parcel.selected_prims,
        total_prims: parcel.total_prims(),
        simwide_prims: parcel.simwide_prims,
        simwide_area: parcel.simwide_area,
        metadata: serde_json::Value::Null,
    }
}

// ---------------------------------------------------------------------------
// LandChannel impl
// ---------------------------------------------------------------------------

impl LandChannel for LandService {
    fn parcel_at(&self, x: f32, y: f32) -> Option<&LandParcel> {
        LandService::parcel_at(self, x, y)
    }

    fn parcel_by_local_id(&self, local_id: i32) -> Option<&LandParcel> {
        LandService::parcel_by_local_id(self, local_id)
    }

    fn all_parcels(&self) -> Vec<&LandParcel> {
        LandService::all_parcels(self)
    }

    fn parcels_near(&self, position: Vec3) -> Vec<&LandParcel> {
        LandService::parcels_near(self, position)
    }

    fn parcel_properties(&self, local_id: i32, sequence_id: i32) -> Option<ParcelProperties> {
        LandService::parcel_properties(self, local_id, sequence_id)
    }

    fn overlay_chunks(&self, requester: AgentId) -> Vec<OverlayChunk> {
        LandService::overlay_chunks(self, requester)
    }

    fn stats(&self) -> LandStats {
        LandService::stats(self)
    }

    fn subdivide(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        requester: AgentId,
    ) -> Result<i32, LandError> {
        LandService::subdivide(self, x1, y1, x2, y2, requester)
    }

    fn join(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        requester: AgentId,
    ) -> Result<i32, LandError> {
        LandService::join(self, x1, y1, x2, y2, requester)
    }

    fn update_parcel_properties(
        &mut self,
        requester: AgentId,
        update: &ParcelPropertiesUpdate,
    ) -> Result<(), LandError> {
        LandService::update_parcel_properties(self, requester, update)
    }

    fn update_access_list(
        &mut self,
        requester: AgentId,
        update: ParcelAccessListUpdate,
    ) -> Result<(), LandError> {
        LandService::update_access_list(self, requester, update)
    }

    fn remote_parcel_request(&self, request: &RemoteParcelRequest) -> RemoteParcelReply {
        LandService::remote_parcel_request(self, request)
    }

    fn parcel_info(&self, parcel_id: Uuid) -> Option<ExtendedLandData> {
        LandService::parcel_info(self, parcel_id)
    }

    fn avatar_moved(&mut self, agent: AgentId, position: Vec3) -> Vec<LandNotice> {
        LandService::avatar_moved(self, agent, position)
    }

    fn avatar_moved_significantly(&mut self, agent: AgentId, position: Vec3) -> Vec<LandNotice> {
        LandService::avatar_moved_significantly(self, agent, position)
    }

    fn object_changed(&mut self) {
        self.taint_prim_counts();
    }

    fn reset_to_single_parcel(&mut self, owner: AgentId) {
        LandService::reset_to_single_parcel(self, owner)
    }

    fn force_owner_change(&mut self, local_id: i32, new_owner: AgentId) -> Result<(), LandError> {
        LandService::force_owner_change(self, local_id, new_owner)
    }

    fn set_forceful_bans(&mut self, enabled: bool) {
        LandService::set_forceful_bans(self, enabled)
    }
}
