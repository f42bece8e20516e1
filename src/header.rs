//! Fixed-layout records of the container.
//!
//! All integers are little endian and the records are tightly packed:
//!
//! ```text
//! local header      30 bytes  + name + payload
//! central header    46 bytes  + name
//! end of directory  22 bytes
//! ```
//!
//! Each record is a packed struct of little-endian fields, so its bytes in
//! memory are its bytes on disk regardless of the host.

use std::io::Write;
use std::mem::size_of;

use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Result, ZiplodeError};

/// Compression method 0.
pub const METHOD_STORED: u16 = 0;
/// Compression method 8. Written for pseudo-compressed entries under the
/// legacy policy only.
pub const METHOD_DEFLATED: u16 = 8;
/// Version needed to extract / version made by.
pub const VERSION: u16 = 20;

/// Copy a record from the front of `data`, then check its signature.
fn read_record<T: FromBytes>(
    data: &[u8],
    what: &str,
    expected: u32,
    signature: impl Fn(&T) -> u32,
) -> Result<T> {
    let (record, _) = T::read_from_prefix(data).map_err(|_| {
        ZiplodeError::Format(format!(
            "{what} needs {} bytes, found {}",
            size_of::<T>(),
            data.len()
        ))
    })?;
    let found = signature(&record);
    if found != expected {
        return Err(ZiplodeError::Format(format!(
            "bad {what} signature {found:#010x}, expected {expected:#010x}"
        )));
    }
    Ok(record)
}

/// Header preceding every entry's name and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct LocalFileHeader {
    pub signature: U32,
    pub version_needed: U16,
    pub flags: U16,
    pub compression_method: U16,
    pub mod_time: U16,
    pub mod_date: U16,
    pub crc32: U32,
    pub compressed_size: U32,
    pub uncompressed_size: U32,
    pub file_name_length: U16,
    pub extra_field_length: U16,
}

impl LocalFileHeader {
    pub const SIGNATURE: u32 = 0x0403_4b50;
    pub const SIZE: usize = size_of::<Self>();

    /// Header for an entry without timestamps, flags or extra field.
    pub fn new(
        compression_method: u16,
        crc32: u32,
        compressed_size: u32,
        uncompressed_size: u32,
        file_name_length: u16,
    ) -> Self {
        Self {
            signature: U32::new(Self::SIGNATURE),
            version_needed: U16::new(VERSION),
            flags: U16::new(0),
            compression_method: U16::new(compression_method),
            mod_time: U16::new(0),
            mod_date: U16::new(0),
            crc32: U32::new(crc32),
            compressed_size: U32::new(compressed_size),
            uncompressed_size: U32::new(uncompressed_size),
            file_name_length: U16::new(file_name_length),
            extra_field_length: U16::new(0),
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(self.as_bytes())
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        read_record(data, "local header", Self::SIGNATURE, |h: &Self| h.signature.get())
    }
}

/// Per-entry record of the central directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct CentralDirectoryHeader {
    pub signature: U32,
    pub version_made_by: U16,
    pub version_needed: U16,
    pub flags: U16,
    pub compression_method: U16,
    pub mod_time: U16,
    pub mod_date: U16,
    pub crc32: U32,
    pub compressed_size: U32,
    pub uncompressed_size: U32,
    pub file_name_length: U16,
    pub extra_field_length: U16,
    pub comment_length: U16,
    pub disk_start: U16,
    pub internal_attributes: U16,
    pub external_attributes: U32,
    pub local_header_offset: U32,
}

impl CentralDirectoryHeader {
    pub const SIGNATURE: u32 = 0x0201_4b50;
    pub const SIZE: usize = size_of::<Self>();

    /// Central record mirroring a local header written at
    /// `local_header_offset`.
    pub fn new(
        compression_method: u16,
        crc32: u32,
        compressed_size: u32,
        uncompressed_size: u32,
        file_name_length: u16,
        local_header_offset: u32,
    ) -> Self {
        Self {
            signature: U32::new(Self::SIGNATURE),
            version_made_by: U16::new(VERSION),
            version_needed: U16::new(VERSION),
            flags: U16::new(0),
            compression_method: U16::new(compression_method),
            mod_time: U16::new(0),
            mod_date: U16::new(0),
            crc32: U32::new(crc32),
            compressed_size: U32::new(compressed_size),
            uncompressed_size: U32::new(uncompressed_size),
            file_name_length: U16::new(file_name_length),
            extra_field_length: U16::new(0),
            comment_length: U16::new(0),
            disk_start: U16::new(0),
            internal_attributes: U16::new(0),
            external_attributes: U32::new(0),
            local_header_offset: U32::new(local_header_offset),
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(self.as_bytes())
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        read_record(data, "central directory header", Self::SIGNATURE, |h: &Self| {
            h.signature.get()
        })
    }

    /// Bytes following the fixed part: name, extra field and comment.
    pub fn variable_len(&self) -> usize {
        self.file_name_length.get() as usize
            + self.extra_field_length.get() as usize
            + self.comment_length.get() as usize
    }
}

/// Trailing summary of the central directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct EndOfCentralDirectory {
    pub signature: U32,
    pub disk_number: U16,
    pub central_dir_disk: U16,
    pub entries_on_disk: U16,
    pub total_entries: U16,
    pub central_dir_size: U32,
    pub central_dir_offset: U32,
    pub comment_length: U16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: u32 = 0x0605_4b50;
    pub const SIZE: usize = size_of::<Self>();

    /// Single-disk end record without a comment.
    pub fn new(entries: u16, central_dir_size: u32, central_dir_offset: u32) -> Self {
        Self {
            signature: U32::new(Self::SIGNATURE),
            disk_number: U16::new(0),
            central_dir_disk: U16::new(0),
            entries_on_disk: U16::new(entries),
            total_entries: U16::new(entries),
            central_dir_size: U32::new(central_dir_size),
            central_dir_offset: U32::new(central_dir_offset),
            comment_length: U16::new(0),
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(self.as_bytes())
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        read_record(data, "end record", Self::SIGNATURE, |h: &Self| h.signature.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sizes() {
        assert_eq!(LocalFileHeader::SIZE, 30);
        assert_eq!(CentralDirectoryHeader::SIZE, 46);
        assert_eq!(EndOfCentralDirectory::SIZE, 22);
    }

    #[test]
    fn local_header_layout() {
        let h = LocalFileHeader::new(
            METHOD_DEFLATED,
            0xAABB_CCDD,
            0x0102_0304,
            0x0506_0708,
            0x0A09,
        );
        let bytes = h.as_bytes();
        assert_eq!(&bytes[0..4], b"PK\x03\x04");
        assert_eq!(&bytes[4..6], &[20, 0]);
        assert_eq!(&bytes[8..10], &[8, 0]);
        assert_eq!(&bytes[14..18], &[0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(&bytes[18..22], &[4, 3, 2, 1]);
        assert_eq!(&bytes[22..26], &[8, 7, 6, 5]);
        assert_eq!(&bytes[26..28], &[9, 10]);
        assert_eq!(LocalFileHeader::parse(bytes).unwrap(), h);
    }

    #[test]
    fn parse_ignores_trailing_bytes() {
        let h = LocalFileHeader::new(METHOD_STORED, 7, 3, 3, 5);
        let mut bytes = h.as_bytes().to_vec();
        bytes.extend_from_slice(b"a.txtabc");
        let parsed = LocalFileHeader::parse(&bytes).unwrap();
        assert_eq!(parsed.crc32.get(), 7);
        assert_eq!(parsed.file_name_length.get(), 5);
    }

    #[test]
    fn central_header_offset_is_last_field() {
        let h = CentralDirectoryHeader::new(METHOD_STORED, 1, 2, 3, 4, 0xDEAD_BEEF);
        let bytes = h.as_bytes();
        assert_eq!(&bytes[0..4], b"PK\x01\x02");
        assert_eq!(&bytes[4..8], &[20, 0, 20, 0]);
        assert_eq!(&bytes[42..46], &0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(h.variable_len(), 4);
        assert_eq!(CentralDirectoryHeader::parse(bytes).unwrap(), h);
    }

    #[test]
    fn end_record_rejects_wrong_signature() {
        let mut bytes = EndOfCentralDirectory::new(1, 60, 100).as_bytes().to_vec();
        assert_eq!(&bytes[0..4], b"PK\x05\x06");
        assert_eq!(&bytes[8..12], &[1, 0, 1, 0]);
        bytes[0] = b'X';
        assert!(EndOfCentralDirectory::parse(&bytes).is_err());
        assert!(EndOfCentralDirectory::parse(&bytes[..10]).is_err());
    }
}
