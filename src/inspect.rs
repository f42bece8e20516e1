//! Read a finished container back and check its bookkeeping.
//!
//! The end record is located by scanning backwards from the end of the data,
//! the central directory is walked in order and every central record is
//! compared with the local header it points at.
//!
//! A deep read also expands every payload. The run-length transform leaves
//! short `0xFF` runs unescaped, so a payload holding `0xFF` bytes that does
//! not expand to its recorded length and CRC cannot be told apart from one
//! whose source contained such runs. Those entries are reported as
//! unverifiable rather than as inconsistencies.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::crc::crc32;
use crate::error::{Result, ZiplodeError};
use crate::header::{CentralDirectoryHeader, EndOfCentralDirectory, LocalFileHeader};
use crate::rle::{pseudo_expand, ESCAPE};

/// One entry as recorded in the central directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedEntry {
    pub name: String,
    pub offset: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub crc32: u32,
    pub compression_method: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveListing {
    pub total_entries: u16,
    pub central_dir_offset: u32,
    pub central_dir_size: u32,
    pub entries: Vec<ListedEntry>,
    /// Invariant violations found while reading; empty for a sound archive.
    pub issues: Vec<String>,
    /// Entries whose payload could not be checked by a deep read.
    pub unverifiable: Vec<String>,
}

impl ArchiveListing {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn uncompressed_total(&self) -> u64 {
        self.entries.iter().map(|e| e.uncompressed_size as u64).sum()
    }
}

/// Position of the end record, searching backwards over a possible comment.
fn find_end_record(data: &[u8]) -> Result<usize> {
    if data.len() < EndOfCentralDirectory::SIZE {
        return Err(ZiplodeError::Format(format!(
            "{} bytes is too short for an archive",
            data.len()
        )));
    }
    let last = data.len() - EndOfCentralDirectory::SIZE;
    let first = last.saturating_sub(u16::MAX as usize);
    let magic = EndOfCentralDirectory::SIGNATURE.to_le_bytes();
    (first..=last)
        .rev()
        .find(|&pos| data[pos..pos + 4] == magic)
        .ok_or_else(|| ZiplodeError::Format("end of central directory not found".into()))
}

/// Expand `payload` and compare it with the recorded length and CRC.
fn check_payload(
    payload: &[u8],
    uncompressed_size: u32,
    crc: u32,
) -> std::result::Result<(), String> {
    let expanded = pseudo_expand(payload).map_err(|e| e.to_string())?;
    if expanded.len() != uncompressed_size as usize {
        return Err(format!(
            "expands to {} bytes, header says {uncompressed_size}",
            expanded.len()
        ));
    }
    if crc32(&expanded) != crc {
        return Err("CRC mismatch after expansion".into());
    }
    Ok(())
}

fn slice<'a>(data: &'a [u8], start: usize, len: usize, what: &str) -> Result<&'a [u8]> {
    start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| ZiplodeError::Format(format!("{what} at {start} runs past the end")))
}

/// Parse `data` as a container. Structural damage is an error; bookkeeping
/// mismatches are collected in [`ArchiveListing::issues`].
pub fn read_archive(data: &[u8]) -> Result<ArchiveListing> {
    read_archive_inner(data, false)
}

/// Like [`read_archive`], additionally expanding every payload and checking
/// its length and CRC.
pub fn read_archive_deep(data: &[u8]) -> Result<ArchiveListing> {
    read_archive_inner(data, true)
}

pub fn read_archive_file<P: AsRef<Path>>(path: P, deep: bool) -> Result<ArchiveListing> {
    let data = fs::read(path)?;
    read_archive_inner(&data, deep)
}

fn read_archive_inner(data: &[u8], deep: bool) -> Result<ArchiveListing> {
    let end_pos = find_end_record(data)?;
    let end = EndOfCentralDirectory::parse(&data[end_pos..])?;
    let mut issues = Vec::new();
    let mut unverifiable = Vec::new();

    let total_entries = end.total_entries.get();
    let central_dir_offset = end.central_dir_offset.get();
    let central_dir_size = end.central_dir_size.get();
    let dir_start = central_dir_offset as usize;
    let dir_end = dir_start + central_dir_size as usize;
    if dir_end != end_pos {
        issues.push(format!(
            "central directory ends at {dir_end} but end record starts at {end_pos}"
        ));
    }
    if end.entries_on_disk != end.total_entries {
        issues.push(format!(
            "entries on disk {} differs from total {total_entries}",
            end.entries_on_disk.get()
        ));
    }

    let mut entries = Vec::with_capacity(total_entries as usize);
    let mut pos = dir_start;
    let mut expected_next = 0u64;
    while pos < dir_end {
        let central = CentralDirectoryHeader::parse(slice(
            data,
            pos,
            CentralDirectoryHeader::SIZE,
            "central directory header",
        )?)?;
        let name_at = pos + CentralDirectoryHeader::SIZE;
        let name_len = central.file_name_length.get() as usize;
        let name_bytes = slice(data, name_at, name_len, "entry name")?;
        let name = String::from_utf8_lossy(name_bytes).into_owned();
        pos = name_at + central.variable_len();

        let offset = central.local_header_offset.get();
        if (offset as u64) != expected_next {
            issues.push(format!(
                "{name}: local header at {offset}, previous entry ended at {expected_next}"
            ));
        }

        let local = LocalFileHeader::parse(slice(
            data,
            offset as usize,
            LocalFileHeader::SIZE,
            "local header",
        )?)?;
        let local_name = slice(
            data,
            offset as usize + LocalFileHeader::SIZE,
            local.file_name_length.get() as usize,
            "local name",
        )?;
        if local_name != name_bytes {
            issues.push(format!("{name}: local header names a different entry"));
        }
        if local.crc32 != central.crc32
            || local.compressed_size != central.compressed_size
            || local.uncompressed_size != central.uncompressed_size
            || local.compression_method != central.compression_method
        {
            issues.push(format!("{name}: local and central headers disagree"));
        }

        let payload_at = offset as usize
            + LocalFileHeader::SIZE
            + local.file_name_length.get() as usize
            + local.extra_field_length.get() as usize;
        let payload = slice(data, payload_at, local.compressed_size.get() as usize, "payload")?;
        expected_next = (payload_at + payload.len()) as u64;

        let listed = ListedEntry {
            name,
            offset,
            compressed_size: central.compressed_size.get(),
            uncompressed_size: central.uncompressed_size.get(),
            crc32: central.crc32.get(),
            compression_method: central.compression_method.get(),
        };
        if deep {
            if let Err(problem) = check_payload(payload, listed.uncompressed_size, listed.crc32) {
                if payload.contains(&ESCAPE) {
                    unverifiable.push(format!(
                        "{}: {problem}; payload may hold unescaped 0xFF bytes",
                        listed.name
                    ));
                } else {
                    issues.push(format!("{}: {problem}", listed.name));
                }
            }
        }
        entries.push(listed);
    }

    if expected_next != central_dir_offset as u64 {
        issues.push(format!(
            "central directory at {central_dir_offset} but last entry ended at {expected_next}"
        ));
    }
    if entries.len() != total_entries as usize {
        issues.push(format!(
            "end record counts {total_entries} entries, directory holds {}",
            entries.len()
        ));
    }

    Ok(ArchiveListing {
        total_entries,
        central_dir_offset,
        central_dir_size,
        entries,
        issues,
        unverifiable,
    })
}

#[cfg(test)]
mod tests {
    use zerocopy::IntoBytes;

    use super::*;
    use crate::config::MethodTagPolicy;
    use crate::directory::write_central_directory;
    use crate::entry::write_entry;
    use crate::writer::CountingWriter;

    #[test]
    fn empty_archive_is_consistent() {
        let end = EndOfCentralDirectory::new(0, 0, 0);
        let listing = read_archive(end.as_bytes()).unwrap();
        assert!(listing.entries.is_empty());
        assert!(listing.is_consistent());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(read_archive(b"not an archive at all, really").is_err());
        assert!(read_archive(&[]).is_err());
    }

    #[test]
    fn dangling_directory_offset_is_an_error() {
        let end = EndOfCentralDirectory::new(1, 46, 0);
        assert!(read_archive(end.as_bytes()).is_err());
    }

    fn single_entry(payload: &[u8]) -> Vec<u8> {
        let mut out = CountingWriter::new(Vec::new());
        let rec = write_entry(&mut out, "a.txt", payload, MethodTagPolicy::Stored).unwrap();
        write_central_directory(&mut out, &[rec]).unwrap();
        out.into_inner()
    }

    #[test]
    fn corrupted_literal_payload_is_an_issue() {
        let mut bytes = single_entry(b"abcdef");
        bytes[LocalFileHeader::SIZE + 5] = b'z';
        let listing = read_archive_deep(&bytes).unwrap();
        assert_eq!(listing.issues.len(), 1);
        assert!(listing.issues[0].contains("CRC mismatch"));
        assert!(listing.unverifiable.is_empty());
    }

    #[test]
    fn short_ff_runs_are_unverifiable_not_inconsistent() {
        let bytes = single_entry(&[0xFF, b'a', b'b', b'c']);
        assert!(read_archive(&bytes).unwrap().unverifiable.is_empty());
        let listing = read_archive_deep(&bytes).unwrap();
        assert!(listing.is_consistent(), "{:?}", listing.issues);
        assert_eq!(listing.unverifiable.len(), 1);
        assert!(listing.unverifiable[0].starts_with("a.txt: "));
    }
}
