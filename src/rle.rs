//! Run-length pseudo-compression.
//!
//! Runs longer than [`MIN_RUN`] bytes become a three byte tuple
//! `[ESCAPE, length, value]`; shorter runs are copied through. Literal
//! `ESCAPE` bytes are not escaped, so an input containing `0xFF` in a short
//! run cannot be recovered by [`pseudo_expand`]. This is not deflate.

use crate::error::{Result, ZiplodeError};

/// Marker byte that opens an encoded run.
pub const ESCAPE: u8 = 0xFF;
/// Longest run a single tuple can describe.
pub const MAX_RUN: usize = 255;
/// Runs of this length or shorter are emitted literally.
pub const MIN_RUN: usize = 3;

/// Apply the run-length transform to `input`.
pub fn pseudo_compress(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() / 64 + 16);
    let mut i = 0;
    while i < input.len() {
        let value = input[i];
        let run = input[i..]
            .iter()
            .take(MAX_RUN)
            .take_while(|&&b| b == value)
            .count();
        if run > MIN_RUN {
            out.extend_from_slice(&[ESCAPE, run as u8, value]);
        } else {
            out.extend(std::iter::repeat(value).take(run));
        }
        i += run;
    }
    out
}

/// Undo [`pseudo_compress`]. Every `ESCAPE` byte is read as the start of a
/// tuple, so the result only matches the original when the original had no
/// short `0xFF` runs.
pub fn pseudo_expand(encoded: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded.len());
    let mut i = 0;
    while i < encoded.len() {
        if encoded[i] == ESCAPE {
            let tuple = encoded.get(i..i + 3).ok_or_else(|| {
                ZiplodeError::Format(format!("truncated run tuple at byte {i}"))
            })?;
            out.extend(std::iter::repeat(tuple[2]).take(tuple[1] as usize));
            i += 3;
        } else {
            out.push(encoded[i]);
            i += 1;
        }
    }
    Ok(out)
}
