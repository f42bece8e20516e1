use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Stable numeric result codes shared with callers that only see integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,
    FileCreate = -1,
    WriteFailed = -2,
    CompressFailed = -3,
    InvalidParam = -4,
    MemoryAlloc = -5,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Map a raw integer back to a code. Unknown values yield `None`.
    pub fn from_i32(value: i32) -> Option<Self> {
        use ErrorCode::*;
        match value {
            0 => Some(Success),
            -1 => Some(FileCreate),
            -2 => Some(WriteFailed),
            -3 => Some(CompressFailed),
            -4 => Some(InvalidParam),
            -5 => Some(MemoryAlloc),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        use ErrorCode::*;
        match self {
            Success => "operation succeeded",
            FileCreate => "failed to create output file",
            WriteFailed => "failed to write output file",
            CompressFailed => "compression failed",
            InvalidParam => "invalid parameter",
            MemoryAlloc => "memory allocation failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_i32())
    }
}

#[derive(Error, Debug)]
pub enum ZiplodeError {
    /// Bad configuration value or output filename.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The output file could not be opened for writing.
    #[error("cannot create '{}': {source}", .path.display())]
    FileCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A write to the output stream failed after generation started.
    #[error("write error: {0}")]
    Write(#[from] std::io::Error),

    /// A record field does not fit the zip32 layout.
    #[error("write error: {0}")]
    Limit(String),

    /// Reserved; the pseudo-compressor itself never fails.
    #[error("compression error: {0}")]
    Compress(String),

    #[error("memory allocation failed: {0}")]
    Memory(String),

    /// Malformed container encountered while reading one back.
    #[error("format error: {0}")]
    Format(String),
}

impl ZiplodeError {
    pub fn code(&self) -> ErrorCode {
        use ZiplodeError::*;
        match self {
            InvalidParameter(_) | Format(_) => ErrorCode::InvalidParam,
            FileCreate { .. } => ErrorCode::FileCreate,
            Write(_) | Limit(_) => ErrorCode::WriteFailed,
            Compress(_) => ErrorCode::CompressFailed,
            Memory(_) => ErrorCode::MemoryAlloc,
        }
    }
}

pub type Result<T> = std::result::Result<T, ZiplodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::Success.as_i32(), 0);
        assert_eq!(ErrorCode::FileCreate.as_i32(), -1);
        assert_eq!(ErrorCode::WriteFailed.as_i32(), -2);
        assert_eq!(ErrorCode::CompressFailed.as_i32(), -3);
        assert_eq!(ErrorCode::InvalidParam.as_i32(), -4);
        assert_eq!(ErrorCode::MemoryAlloc.as_i32(), -5);
        for v in -5..=0 {
            assert_eq!(ErrorCode::from_i32(v).unwrap().as_i32(), v);
        }
        assert_eq!(ErrorCode::from_i32(-6), None);
    }

    #[test]
    fn limit_errors_report_as_write_failures() {
        let err = ZiplodeError::Limit("offset exceeds 4 GiB".into());
        assert_eq!(err.code(), ErrorCode::WriteFailed);
    }
}
