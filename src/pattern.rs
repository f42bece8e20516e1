//! Synthetic payload used for every entry of the archive.

use crate::error::{Result, ZiplodeError};

/// Distance between structure markers.
pub const MARKER_STRIDE: usize = 1024;
/// Marker written at each stride so the payload layout is visible in a hex dump.
pub const MARKER: [u8; 3] = *b"ZIP";

/// Build `len` bytes of `fill` with [`MARKER`] stamped every [`MARKER_STRIDE`]
/// bytes. A marker is only written when more than three bytes remain from its
/// position.
pub fn generate_pattern(len: usize, fill: u8) -> Vec<u8> {
    let mut data = vec![fill; len];
    stamp_markers(&mut data);
    data
}

/// Same as [`generate_pattern`] but reports allocation failure instead of
/// aborting.
pub fn try_generate_pattern(len: usize, fill: u8) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|e| ZiplodeError::Memory(format!("{len} byte payload: {e}")))?;
    data.resize(len, fill);
    stamp_markers(&mut data);
    Ok(data)
}

fn stamp_markers(data: &mut [u8]) {
    let len = data.len();
    for pos in (0..len).step_by(MARKER_STRIDE) {
        if pos + MARKER.len() < len {
            data[pos..pos + MARKER.len()].copy_from_slice(&MARKER);
        }
    }
}
