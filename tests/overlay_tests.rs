//! Overlay encoding unit tests

#[cfg(test)]
mod tests {
    use meridian_land::overlay::{
        OVERLAY_BORDER_SOUTH, OVERLAY_BORDER_WEST, OVERLAY_TYPE_FOR_SALE, OVERLAY_TYPE_MASK,
        OVERLAY_TYPE_OWNED_BY_OTHER, OVERLAY_TYPE_OWNED_BY_REQUESTER, OVERLAY_TYPE_PUBLIC,
    };
    use meridian_land::protocol::ParcelPropertiesUpdate;
    use meridian_land::scene::{EstateGate, MemoryStore, NoNeighbors, NullListener, StaticCensus};
    use meridian_land::{
        AgentId, LandService, LandServiceConfig, ParcelFlags, CELL_COUNT, GRID_DIM,
    };
    use std::sync::Arc;

    fn make_service(estate_owner: AgentId) -> LandService {
        let config = LandServiceConfig {
            estate_owner,
            ..Default::default()
        };
        let mut service = LandService::new(
            config,
            Arc::new(EstateGate::new(estate_owner)),
            Arc::new(MemoryStore::new()),
            Arc::new(NoNeighbors),
            Arc::new(StaticCensus::new()),
            Arc::new(NullListener),
        );
        service.bootstrap();
        service
    }

    fn cell(overlay: &[u8], cx: usize, cy: usize) -> u8 {
        overlay[cy * GRID_DIM + cx]
    }

    fn mark_for_sale(service: &mut LandService, owner: AgentId, local_id: i32, buyer: AgentId) {
        let data = &service.parcel_by_local_id(local_id).unwrap().data;
        let update = ParcelPropertiesUpdate {
            local_id,
            name: data.name.clone(),
            description: data.description.clone(),
            flags: data.flags | ParcelFlags::FOR_SALE,
            media_url: data.media_url.clone(),
            music_url: data.music_url.clone(),
            sale_price: 100,
            authorized_buyer: buyer,
            category: data.category,
            landing_type: data.landing_type,
            user_location: data.user_location,
            user_look_at: data.user_look_at,
            pass_price: data.pass_price,
            pass_hours: data.pass_hours,
            other_clean_time: data.other_clean_time,
        };
        service.update_parcel_properties(owner, &update).unwrap();
    }

    // -----------------------------------------------------------------------
    // Determinism
    // -----------------------------------------------------------------------

    #[test]
    fn overlay_is_deterministic() {
        let owner = AgentId::random();
        let viewer = AgentId::random();
        let mut service = make_service(owner);
        service.subdivide(0.0, 0.0, 32.0, 32.0, owner).unwrap();

        assert_eq!(service.overlay(viewer), service.overlay(viewer));
    }

    // -----------------------------------------------------------------------
    // Cell types
    // -----------------------------------------------------------------------

    #[test]
    fn owners_and_strangers_see_different_types() {
        let owner = AgentId::random();
        let stranger = AgentId::random();
        let service = make_service(owner);

        let for_owner = service.overlay(owner);
        let for_stranger = service.overlay(stranger);
        assert_eq!(
            cell(&for_owner, 10, 10) & OVERLAY_TYPE_MASK,
            OVERLAY_TYPE_OWNED_BY_REQUESTER
        );
        assert_eq!(
            cell(&for_stranger, 10, 10) & OVERLAY_TYPE_MASK,
            OVERLAY_TYPE_OWNED_BY_OTHER
        );
    }

    #[test]
    fn for_sale_shows_only_to_eligible_buyers() {
        let owner = AgentId::random();
        let chosen = AgentId::random();
        let passerby = AgentId::random();
        let mut service = make_service(owner);
        let piece = service.subdivide(0.0, 0.0, 32.0, 32.0, owner).unwrap();
        mark_for_sale(&mut service, owner, piece, chosen);

        let for_chosen = service.overlay(chosen);
        let for_passerby = service.overlay(passerby);
        assert_eq!(
            cell(&for_chosen, 2, 2) & OVERLAY_TYPE_MASK,
            OVERLAY_TYPE_FOR_SALE
        );
        assert_eq!(
            cell(&for_passerby, 2, 2) & OVERLAY_TYPE_MASK,
            OVERLAY_TYPE_OWNED_BY_OTHER
        );
        // Cells outside the sale parcel are unaffected.
        assert_eq!(
            cell(&for_chosen, 20, 20) & OVERLAY_TYPE_MASK,
            OVERLAY_TYPE_OWNED_BY_OTHER
        );
    }

    #[test]
    fn ownership_outranks_for_sale() {
        let owner = AgentId::random();
        let mut service = make_service(owner);
        let piece = service.subdivide(0.0, 0.0, 32.0, 32.0, owner).unwrap();
        mark_for_sale(&mut service, owner, piece, AgentId::NIL);

        let overlay = service.overlay(owner);
        assert_eq!(
            cell(&overlay, 2, 2) & OVERLAY_TYPE_MASK,
            OVERLAY_TYPE_OWNED_BY_REQUESTER
        );
    }

    #[test]
    fn unowned_land_reads_as_public() {
        let owner = AgentId::random();
        let viewer = AgentId::random();
        let mut service = make_service(owner);
        let id = service.all_parcels()[0].local_id();
        service.force_owner_change(id, AgentId::NIL).unwrap();

        let overlay = service.overlay(viewer);
        assert_eq!(cell(&overlay, 30, 30) & OVERLAY_TYPE_MASK, OVERLAY_TYPE_PUBLIC);
    }

    // -----------------------------------------------------------------------
    // Border bits
    // -----------------------------------------------------------------------

    #[test]
    fn region_edges_carry_border_bits() {
        let owner = AgentId::random();
        let service = make_service(owner);
        let overlay = service.overlay(owner);

        let corner = cell(&overlay, 0, 0);
        assert_ne!(corner & OVERLAY_BORDER_WEST, 0);
        assert_ne!(corner & OVERLAY_BORDER_SOUTH, 0);

        // One cell east: same parcel to the west, region edge to the south.
        let east = cell(&overlay, 1, 0);
        assert_eq!(east & OVERLAY_BORDER_WEST, 0);
        assert_ne!(east & OVERLAY_BORDER_SOUTH, 0);

        // Interior of a single-parcel region has no borders at all.
        let interior = cell(&overlay, 10, 10);
        assert_eq!(interior & (OVERLAY_BORDER_WEST | OVERLAY_BORDER_SOUTH), 0);
    }

    #[test]
    fn parcel_boundaries_carry_border_bits() {
        let owner = AgentId::random();
        let mut service = make_service(owner);
        service.subdivide(0.0, 0.0, 32.0, 32.0, owner).unwrap();
        let overlay = service.overlay(owner);

        // First remainder cell east of the new parcel: west border.
        assert_ne!(cell(&overlay, 8, 0) & OVERLAY_BORDER_WEST, 0);
        // First remainder cell north of it: south border.
        assert_ne!(cell(&overlay, 0, 8) & OVERLAY_BORDER_SOUTH, 0);
        // Inside the new parcel: no internal borders.
        assert_eq!(
            cell(&overlay, 3, 3) & (OVERLAY_BORDER_WEST | OVERLAY_BORDER_SOUTH),
            0
        );
    }

    // -----------------------------------------------------------------------
    // Chunking
    // -----------------------------------------------------------------------

    #[test]
    fn chunks_are_sequenced_and_reassemble_exactly() {
        let owner = AgentId::random();
        let service = make_service(owner);

        let overlay = service.overlay(owner);
        let chunks = service.overlay_chunks(owner);
        assert_eq!(chunks.len(), 4);

        let mut assembled = Vec::with_capacity(CELL_COUNT);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence_id, i as i32);
            assert_eq!(chunk.total, 4);
            assert_eq!(chunk.data.len(), 1024);
            assembled.extend_from_slice(&chunk.data);
        }
        assert_eq!(assembled, overlay.to_vec());
    }
}
