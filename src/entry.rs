use std::io::Write;

use serde::Serialize;
use tracing::trace;

use crate::config::MethodTagPolicy;
use crate::crc::crc32;
use crate::error::{Result, ZiplodeError};
use crate::header::{LocalFileHeader, METHOD_DEFLATED, METHOD_STORED};
use crate::rle::pseudo_compress;
use crate::writer::CountingWriter;

/// Metadata for one written entry, consumed by the directory writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryRecord {
    pub name: String,
    /// Stream position of the local header.
    pub offset: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub crc32: u32,
    pub compression_method: u16,
}

/// Name of the entry at `index`.
pub fn entry_name(index: usize) -> String {
    format!("bomb_data_{index}.txt")
}

/// Method tag for a payload of `original` bytes transformed to `transformed`.
pub fn method_for(policy: MethodTagPolicy, original: usize, transformed: usize) -> u16 {
    match policy {
        MethodTagPolicy::Stored => METHOD_STORED,
        MethodTagPolicy::Legacy if transformed < original => METHOD_DEFLATED,
        MethodTagPolicy::Legacy => METHOD_STORED,
    }
}

fn fit_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| ZiplodeError::Limit(format!("{what} {value} exceeds the 32-bit field")))
}

/// Write one local header, the entry name and the transformed payload.
///
/// Nothing is written when a size or the current offset does not fit its
/// 32-bit field.
pub fn write_entry<W: Write>(
    out: &mut CountingWriter<W>,
    name: &str,
    payload: &[u8],
    policy: MethodTagPolicy,
) -> Result<EntryRecord> {
    let checksum = crc32(payload);
    let transformed = pseudo_compress(payload);

    let offset = fit_u32(out.position(), "local header offset")?;
    let name_len = u16::try_from(name.len())
        .map_err(|_| ZiplodeError::Limit(format!("entry name of {} bytes", name.len())))?;
    let compressed_size = fit_u32(transformed.len() as u64, "compressed size")?;
    let uncompressed_size = fit_u32(payload.len() as u64, "uncompressed size")?;
    let compression_method = method_for(policy, payload.len(), transformed.len());

    LocalFileHeader::new(
        compression_method,
        checksum,
        compressed_size,
        uncompressed_size,
        name_len,
    )
    .write_to(out)?;
    out.write_all(name.as_bytes())?;
    out.write_all(&transformed)?;

    trace!(
        entry = name,
        offset,
        compressed_size,
        uncompressed_size,
        crc = checksum,
        "entry written"
    );

    Ok(EntryRecord {
        name: name.to_string(),
        offset,
        compressed_size,
        uncompressed_size,
        crc32: checksum,
        compression_method,
    })
}
