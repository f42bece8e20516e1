//! Writer for compact containers that expand far beyond their own size.
//!
//! Intended for security education: the output shows how an archive's
//! directory can describe much more data than the file itself holds. The
//! payload transform is a toy run-length scheme, not deflate.
//!
//! ```no_run
//! use ziplode::{generate_file, ArchiveConfig};
//!
//! let config = ArchiveConfig { target_size_mb: 100, ..ArchiveConfig::default() };
//! let report = generate_file("demo.zip", &config, |_| {})?;
//! println!("{report}");
//! # Ok::<(), ziplode::ZiplodeError>(())
//! ```

pub mod bomb;
pub mod config;
pub mod crc;
pub mod directory;
pub mod entry;
pub mod error;
pub mod fs_utils;
pub mod header;
pub mod inspect;
pub mod logging;
pub mod pattern;
pub mod rle;
pub mod writer;

pub use bomb::{
    generate_file, generate_file_with_parents, generate_to_writer, plan_entries, ArchiveLayout,
    BombGenerator, EntryPlan, EntryProgress, GenerationReport, Stage, MAX_ENTRIES,
};
pub use config::{ArchiveConfig, MethodTagPolicy};
pub use crc::{crc32, Crc32};
pub use directory::{write_central_directory, DirectorySummary};
pub use entry::{entry_name, write_entry, EntryRecord};
pub use error::{ErrorCode, Result, ZiplodeError};
pub use header::{CentralDirectoryHeader, EndOfCentralDirectory, LocalFileHeader};
pub use inspect::{read_archive, read_archive_deep, read_archive_file, ArchiveListing};
pub use pattern::generate_pattern;
pub use rle::{pseudo_compress, pseudo_expand};
pub use writer::CountingWriter;
