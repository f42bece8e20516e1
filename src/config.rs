use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ZiplodeError};

pub const DEFAULT_TARGET_SIZE_MB: u32 = 10_240;
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 6;
pub const DEFAULT_PATTERN_SIZE: u32 = 1_048_576;
pub const DEFAULT_PATTERN_CHAR: u8 = b'A';

pub const MAX_TARGET_SIZE_MB: u32 = 100_000;
pub const MAX_PATTERN_SIZE: u32 = 100 * 1024 * 1024;
pub const MAX_FILENAME_LENGTH: usize = 512;

/// Characters rejected in the final component of an output path.
const UNSAFE_FILENAME_CHARS: &[char] = &['\\', ':', '*', '?', '"', '<', '>', '|'];

/// How entries are labelled in the `compression method` header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodTagPolicy {
    /// Always write method 0.
    #[default]
    Stored,
    /// Write method 8 whenever the transformed payload is shorter than the
    /// original, even though the bytes are not deflate output.
    Legacy,
}

/// Parameters for one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Nominal expanded size in MiB.
    pub target_size_mb: u32,
    /// Advisory only; recorded in logs.
    pub compression_level: u8,
    /// Bytes of synthetic payload per entry before clamping.
    pub pattern_size: u32,
    /// Fill byte for the payload.
    pub pattern_char: u8,
    /// Reserved.
    pub nested_compression: bool,
    /// Reserved.
    pub nested_levels: u32,
    pub method_tag: MethodTagPolicy,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            target_size_mb: DEFAULT_TARGET_SIZE_MB,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            pattern_size: DEFAULT_PATTERN_SIZE,
            pattern_char: DEFAULT_PATTERN_CHAR,
            nested_compression: false,
            nested_levels: 1,
            method_tag: MethodTagPolicy::Stored,
        }
    }
}

impl ArchiveConfig {
    /// Load a configuration from a JSON file. Missing fields take their
    /// default values; the result is not validated.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            ZiplodeError::InvalidParameter(format!("reading config '{}': {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            ZiplodeError::InvalidParameter(format!("parsing config '{}': {e}", path.display()))
        })
    }

    /// Target expanded size in bytes.
    pub fn target_bytes(&self) -> u64 {
        self.target_size_mb as u64 * 1024 * 1024
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if self.target_size_mb == 0 || self.target_size_mb > MAX_TARGET_SIZE_MB {
            return Err(ZiplodeError::InvalidParameter(format!(
                "target size must be within 1..={MAX_TARGET_SIZE_MB} MB, got {}",
                self.target_size_mb
            )));
        }
        if !(1..=9).contains(&self.compression_level) {
            return Err(ZiplodeError::InvalidParameter(format!(
                "compression level must be within 1..=9, got {}",
                self.compression_level
            )));
        }
        if self.pattern_size == 0 || self.pattern_size > MAX_PATTERN_SIZE {
            return Err(ZiplodeError::InvalidParameter(format!(
                "pattern size must be within 1..={MAX_PATTERN_SIZE} bytes, got {}",
                self.pattern_size
            )));
        }
        Ok(())
    }

    /// Validate the configuration together with the output path.
    pub fn validate_for(&self, output: &Path) -> Result<()> {
        validate_filename(output)?;
        self.validate()
    }
}

/// Reject empty, overlong or unsafe output paths.
pub fn validate_filename(path: &Path) -> Result<()> {
    let raw = path.as_os_str();
    if raw.is_empty() {
        return Err(ZiplodeError::InvalidParameter("filename is empty".into()));
    }
    if raw.len() >= MAX_FILENAME_LENGTH {
        return Err(ZiplodeError::InvalidParameter(format!(
            "filename is longer than {} bytes",
            MAX_FILENAME_LENGTH - 1
        )));
    }
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => {
            return Err(ZiplodeError::InvalidParameter(format!(
                "'{}' does not name a file",
                path.display()
            )))
        }
    };
    if let Some(c) = name.chars().find(|c| UNSAFE_FILENAME_CHARS.contains(c)) {
        return Err(ZiplodeError::InvalidParameter(format!(
            "filename '{name}' contains unsafe character '{c}'"
        )));
    }
    if name.starts_with('.') {
        warn!(file = %name, "filename starts with '.', output will be hidden");
    }
    Ok(())
}
