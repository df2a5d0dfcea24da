//! Parcel overlay encoding: one byte per grid cell, describing ownership
//! relative to a requesting agent plus parcel-boundary bits, chunked into
//! fixed-size wire packets.

use crate::grid::LandGrid;
use crate::parcel::{LandParcel, ParcelFlags};
use crate::protocol::OverlayChunk;
use crate::types::{AgentId, CELL_COUNT, GRID_DIM};
use bytes::Bytes;

// Low bits: mutually exclusive cell type, first match wins.
pub const OVERLAY_TYPE_PUBLIC: u8 = 0x00;
pub const OVERLAY_TYPE_OWNED_BY_OTHER: u8 = 0x01;
pub const OVERLAY_TYPE_FOR_SALE: u8 = 0x02;
pub const OVERLAY_TYPE_OWNED_BY_REQUESTER: u8 = 0x03;

/// Mask selecting the type code out of an overlay byte.
pub const OVERLAY_TYPE_MASK: u8 = 0x0F;

// High bits: parcel boundary markers.
pub const OVERLAY_BORDER_WEST: u8 = 0x40;
pub const OVERLAY_BORDER_SOUTH: u8 = 0x80;

/// Encode the full 4096-byte overlay for one requester.
///
/// Deterministic for a fixed grid state: same requester, same bytes.
pub fn encode_overlay(grid: &LandGrid, requester: AgentId) -> Bytes {
    let mut out = Vec::with_capacity(CELL_COUNT);
    for cy in 0..GRID_DIM {
        for cx in 0..GRID_DIM {
            let id = grid.local_id_at_cell(cx, cy);
            let mut byte = match id.and_then(|i| grid.by_local_id(i)) {
                Some(parcel) => cell_type(parcel, requester),
                None => OVERLAY_TYPE_PUBLIC,
            };
            // Border bits fire against the region edge too.
            if cx == 0 || grid.local_id_at_cell(cx - 1, cy) != id {
                byte |= OVERLAY_BORDER_WEST;
            }
            if cy == 0 || grid.local_id_at_cell(cx, cy - 1) != id {
                byte |= OVERLAY_BORDER_SOUTH;
            }
            out.push(byte);
        }
    }
    Bytes::from(out)
}

/// Slice an overlay snapshot into wire chunks of `cells_per_chunk` bytes.
pub fn chunk_overlay(overlay: &Bytes, cells_per_chunk: usize) -> Vec<OverlayChunk> {
    let cells_per_chunk = cells_per_chunk.max(1);
    let total = overlay.len().div_ceil(cells_per_chunk) as i32;
    overlay
        .chunks(cells_per_chunk)
        .enumerate()
        .map(|(i, chunk)| OverlayChunk {
            sequence_id: i as i32,
            total,
            data: chunk.to_vec(),
        })
        .collect()
}

fn cell_type(parcel: &LandParcel, requester: AgentId) -> u8 {
    let data = &parcel.data;
    if data.owner_id == requester {
        OVERLAY_TYPE_OWNED_BY_REQUESTER
    } else if data.flags.contains(ParcelFlags::FOR_SALE)
        && (data.authorized_buyer.is_nil() || data.authorized_buyer == requester)
    {
        OVERLAY_TYPE_FOR_SALE
    } else if data.owner_id.is_nil() {
        OVERLAY_TYPE_PUBLIC
    } else {
        OVERLAY_TYPE_OWNED_BY_OTHER
    }
}
