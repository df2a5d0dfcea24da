//! Occupancy bitmap unit tests

#[cfg(test)]
mod tests {
    use meridian_land::bitmap::BITMAP_BYTES;
    use meridian_land::{LandBitmap, CELL_COUNT};

    // -----------------------------------------------------------------------
    // Rect stamping
    // -----------------------------------------------------------------------

    #[test]
    fn rect_covers_expected_cells() {
        // (0,0)-(32,32) metres is exactly 8×8 cells.
        let bitmap = LandBitmap::from_rect(0.0, 0.0, 32.0, 32.0);
        assert_eq!(bitmap.cell_count(), 64);
        assert!(bitmap.get(0, 0));
        assert!(bitmap.get(7, 7));
        assert!(!bitmap.get(8, 0));
        assert!(!bitmap.get(0, 8));
    }

    #[test]
    fn rect_coordinates_are_normalised_and_clamped() {
        let forward = LandBitmap::from_rect(16.0, 16.0, 48.0, 48.0);
        let backward = LandBitmap::from_rect(48.0, 48.0, 16.0, 16.0);
        assert_eq!(forward, backward);

        let clamped = LandBitmap::from_rect(-100.0, -100.0, 1000.0, 1000.0);
        assert_eq!(clamped.cell_count(), CELL_COUNT);
    }

    #[test]
    fn full_covers_every_cell() {
        assert_eq!(LandBitmap::full().cell_count(), CELL_COUNT);
        assert!(LandBitmap::empty().is_empty());
    }

    // -----------------------------------------------------------------------
    // Area / AABB derivation
    // -----------------------------------------------------------------------

    #[test]
    fn area_is_sixteen_square_metres_per_cell() {
        let bitmap = LandBitmap::from_rect(0.0, 0.0, 32.0, 32.0);
        assert_eq!(bitmap.area(), 1024);
        assert_eq!(LandBitmap::full().area(), 256 * 256);
    }

    #[test]
    fn aabb_tracks_occupied_cells() {
        let bitmap = LandBitmap::from_rect(16.0, 32.0, 48.0, 64.0);
        let (min, max) = bitmap.aabb().expect("non-empty bitmap");
        assert_eq!((min.x, min.y), (16.0, 32.0));
        assert_eq!((max.x, max.y), (48.0, 64.0));

        assert!(LandBitmap::empty().aabb().is_none());
    }

    // -----------------------------------------------------------------------
    // Union / clear
    // -----------------------------------------------------------------------

    #[test]
    fn union_is_commutative() {
        let a = LandBitmap::from_rect(0.0, 0.0, 32.0, 32.0);
        let b = LandBitmap::from_rect(32.0, 0.0, 64.0, 32.0);
        assert_eq!(a.union(&b), b.union(&a));
        assert_eq!(a.union(&b).cell_count(), 128);
    }

    #[test]
    fn clear_rect_inverts_stamp() {
        let mut bitmap = LandBitmap::full();
        bitmap.clear_rect(0.0, 0.0, 32.0, 32.0);
        assert_eq!(bitmap.cell_count(), CELL_COUNT - 64);
        assert!(!bitmap.get(0, 0));
        assert!(bitmap.get(8, 0));

        bitmap.set_rect(0.0, 0.0, 32.0, 32.0, true);
        assert_eq!(bitmap, LandBitmap::full());
    }

    #[test]
    fn overlap_detection() {
        let a = LandBitmap::from_rect(0.0, 0.0, 32.0, 32.0);
        let b = LandBitmap::from_rect(28.0, 28.0, 64.0, 64.0);
        let c = LandBitmap::from_rect(32.0, 32.0, 64.0, 64.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    // -----------------------------------------------------------------------
    // Wire form
    // -----------------------------------------------------------------------

    #[test]
    fn byte_form_is_512_bytes_and_round_trips() {
        let bitmap = LandBitmap::from_rect(4.0, 8.0, 44.0, 52.0);
        let bytes = bitmap.to_bytes();
        assert_eq!(bytes.len(), BITMAP_BYTES);

        let decoded = LandBitmap::from_bytes(&bytes).expect("valid payload");
        assert_eq!(decoded, bitmap);
    }

    #[test]
    fn byte_form_is_row_major_lsb_first() {
        let mut bitmap = LandBitmap::empty();
        bitmap.set(0, 0, true); // bit 0 of byte 0
        bitmap.set(9, 1, true); // row 1 starts at byte 8; cell 9 is bit 1 of byte 9
        let bytes = bitmap.to_bytes();
        assert_eq!(bytes[0], 0b0000_0001);
        assert_eq!(bytes[9], 0b0000_0010);
    }

    #[test]
    fn wrong_length_payload_is_rejected() {
        assert!(LandBitmap::from_bytes(&[0u8; 100]).is_err());
        assert!(LandBitmap::from_bytes(&[]).is_err());
    }

    #[test]
    fn iter_cells_matches_count() {
        let bitmap = LandBitmap::from_rect(0.0, 0.0, 16.0, 8.0);
        let cells: Vec<_> = bitmap.iter_cells().collect();
        assert_eq!(cells.len(), bitmap.cell_count());
        assert!(cells.contains(&(0, 0)));
        assert!(cells.contains(&(3, 1)));
    }
}
