use std::io::Write;

use serde::Serialize;
use tracing::debug;

use crate::entry::EntryRecord;
use crate::error::{Result, ZiplodeError};
use crate::header::{CentralDirectoryHeader, EndOfCentralDirectory};
use crate::writer::CountingWriter;

/// Where the central directory landed and how large it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DirectorySummary {
    pub entries: u16,
    pub offset: u32,
    pub size: u32,
}

/// Central directory record for a written entry.
pub fn central_header_for(entry: &EntryRecord) -> Result<CentralDirectoryHeader> {
    let file_name_length = u16::try_from(entry.name.len())
        .map_err(|_| ZiplodeError::Limit(format!("entry name of {} bytes", entry.name.len())))?;
    Ok(CentralDirectoryHeader::new(
        entry.compression_method,
        entry.crc32,
        entry.compressed_size,
        entry.uncompressed_size,
        file_name_length,
        entry.offset,
    ))
}

/// Write one central record per entry, in order, followed by the end record.
///
/// Must be called once, after the last entry payload.
pub fn write_central_directory<W: Write>(
    out: &mut CountingWriter<W>,
    entries: &[EntryRecord],
) -> Result<DirectorySummary> {
    let count = u16::try_from(entries.len())
        .map_err(|_| ZiplodeError::Limit(format!("{} entries exceed 65535", entries.len())))?;
    let start = out.position();
    let offset = u32::try_from(start)
        .map_err(|_| ZiplodeError::Limit(format!("central directory offset {start}")))?;

    for entry in entries {
        central_header_for(entry)?.write_to(out)?;
        out.write_all(entry.name.as_bytes())?;
    }

    let written = out.position() - start;
    let size = u32::try_from(written)
        .map_err(|_| ZiplodeError::Limit(format!("central directory size {written}")))?;

    EndOfCentralDirectory::new(count, size, offset).write_to(out)?;

    debug!(entries = count, offset, size, "central directory written");
    Ok(DirectorySummary {
        entries: count,
        offset,
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, offset: u32) -> EntryRecord {
        EntryRecord {
            name: name.into(),
            offset,
            compressed_size: 3,
            uncompressed_size: 10,
            crc32: 0x1234_5678,
            compression_method: 0,
        }
    }

    #[test]
    fn directory_sizes_add_up() {
        let mut out = CountingWriter::new(Vec::new());
        out.write_all(&[0u8; 100]).unwrap();
        let entries = [record("a.txt", 0), record("bb.txt", 50)];
        let summary = write_central_directory(&mut out, &entries).unwrap();
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.offset, 100);
        assert_eq!(summary.size as usize, 2 * CentralDirectoryHeader::SIZE + 5 + 6);

        let bytes = out.into_inner();
        let end = EndOfCentralDirectory::parse(&bytes[bytes.len() - EndOfCentralDirectory::SIZE..])
            .unwrap();
        assert_eq!(end.total_entries.get(), 2);
        assert_eq!(end.entries_on_disk.get(), 2);
        assert_eq!(end.central_dir_offset.get(), 100);

        let second = CentralDirectoryHeader::parse(&bytes[100 + 46 + 5..]).unwrap();
        assert_eq!(second.local_header_offset.get(), 50);
        assert_eq!(second.crc32.get(), 0x1234_5678);
    }

    #[test]
    fn empty_directory_still_has_end_record() {
        let mut out = CountingWriter::new(Vec::new());
        let summary = write_central_directory(&mut out, &[]).unwrap();
        assert_eq!(summary.size, 0);
        assert_eq!(out.position() as usize, EndOfCentralDirectory::SIZE);
    }
}
