//! Filesystem collaborators and CLI error formatting.
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sysinfo::{DiskExt, System, SystemExt};
use tracing::{debug, warn};

use crate::error::ZiplodeError;

/// Outcome of a free space query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskSpace {
    Sufficient,
    Insufficient { available: u64 },
    Unknown,
}

pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists()
}

/// Size of a regular file in bytes.
pub fn file_size<P: AsRef<Path>>(path: P) -> io::Result<u64> {
    let meta = fs::metadata(path)?;
    if !meta.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        ));
    }
    Ok(meta.len())
}

/// Create `path` and its parents. Succeeds if it already is a directory.
pub fn create_directory<P: AsRef<Path>>(path: P) -> io::Result<()> {
    let path = path.as_ref();
    if path.exists() && !path.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("'{}' exists and is not a directory", path.display()),
        ));
    }
    fs::create_dir_all(path)
}

/// Check whether the disk holding `path` has `required` free bytes.
///
/// The disk is the one whose mount point is the longest prefix of the
/// canonical path (or of its parent when the path does not exist yet).
pub fn check_disk_space<P: AsRef<Path>>(path: P, required: u64) -> DiskSpace {
    let Some(dir) = existing_ancestor(path.as_ref()) else {
        return DiskSpace::Unknown;
    };
    let mut sys = System::new();
    sys.refresh_disks_list();
    let disk = sys
        .disks()
        .iter()
        .filter(|d| dir.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len());
    match disk {
        Some(d) => {
            let available = d.available_space();
            debug!(mount = %d.mount_point().display(), available, required, "disk space");
            if available >= required {
                DiskSpace::Sufficient
            } else {
                DiskSpace::Insufficient { available }
            }
        }
        None => {
            warn!(path = %dir.display(), "no disk found for path");
            DiskSpace::Unknown
        }
    }
}

fn existing_ancestor(path: &Path) -> Option<PathBuf> {
    let start = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };
    start
        .ancestors()
        .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
        .find_map(|p| fs::canonicalize(p).ok())
}

/// Human readable size with base-1024 units.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.2} {}", UNITS[unit])
    }
}

#[derive(Debug)]
pub struct CliError {
    pub msg: String,
    pub code: i32,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.msg.fmt(f)
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Explain why the output archive at `path` could not be opened.
pub fn describe_create_error(path: &Path, err: &io::Error) -> String {
    const ENOSPC: i32 = 28;
    const EROFS: i32 = 30;
    let suggestion = if path.is_dir() {
        "The output path is a directory. Add a file name such as bomb.zip."
    } else {
        match (err.kind(), err.raw_os_error()) {
            (io::ErrorKind::NotFound, _) => {
                "The parent directory is missing. `ziplode generate` creates it; \
                 library callers can use `generate_file_with_parents`."
            }
            (io::ErrorKind::PermissionDenied, _) => {
                "The output directory is not writable. Pick another output path."
            }
            (_, Some(ENOSPC)) => "The destination disk is full. Lower --target-mb or free space.",
            (_, Some(EROFS)) => "The destination file system is read-only.",
            _ => "Check the output path.",
        }
    };
    format!("cannot create '{}': {err}. {suggestion}", path.display())
}

/// Simple CLI error from string.
pub fn simple_cli_error(msg: &str) -> CliError {
    CliError {
        msg: msg.to_string(),
        code: 1,
        source: None,
    }
}

/// Convert a library error into a CLI error with a hint. The exit code is the
/// magnitude of the stable error code.
pub fn ziplode_cli_error(context: &str, err: ZiplodeError) -> CliError {
    CliError {
        msg: format!("{}: {}", context, cli_hint(&err)),
        code: err.code().as_i32().abs(),
        source: Some(Box::new(err)),
    }
}

/// Return an actionable hint for a library error variant.
pub fn cli_hint(err: &ZiplodeError) -> String {
    use ZiplodeError::*;
    match err {
        InvalidParameter(msg) => format!("{msg}. Check the command line or config file."),
        FileCreate { path, source } => describe_create_error(path, source),
        Write(io) => format!("{io}. The output may be left incomplete."),
        Limit(msg) => format!("{msg}. Lower the target size or pattern size."),
        Compress(msg) => msg.clone(),
        Memory(msg) => format!("{msg}. Try a smaller pattern size."),
        Format(msg) => format!("{msg}. Verify the file is intact."),
    }
}
