use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Parameters and outcome of the last encode attempt before a search gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptReport {
    pub size_bytes: u64,
    pub width: u32,
    pub quality: u8,
}

impl fmt::Display for AttemptReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes at width {} quality {}",
            self.size_bytes, self.width, self.quality
        )
    }
}

#[derive(Debug, Error)]
pub enum ReencodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid source image: {0}")]
    InvalidSource(image::ImageError),

    #[error("JPEG encoding failed: {0}")]
    Encode(String),

    #[error("size lock failed after {attempts} attempts{}", describe_last(.last))]
    SizeLockFailed {
        attempts: u32,
        last: Option<AttemptReport>,
    },

    #[error("Invalid target range: {min}..={max} bytes. Bounds must be positive and min <= max")]
    InvalidTargetRange { min: u64, max: u64 },

    #[error("Invalid tuning configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse tuning configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid byte size: {0:?}")]
    InvalidByteSize(String),

    #[error("Invalid image dimensions: {0}x{1}. Maximum allowed: {2}x{2}")]
    InvalidDimensions(u32, u32, u32),

    #[error("File too large: {0} bytes. Maximum allowed: {1} bytes")]
    FileTooLarge(u64, u64),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to create output directory: {0}")]
    DirectoryCreationFailed(PathBuf),

    #[error("No image files found in input path: {0}")]
    NoImageFilesFound(String),

    #[error("Output {output:?} for {input:?} is already written by {first:?}")]
    OutputCollision {
        input: PathBuf,
        output: PathBuf,
        first: PathBuf,
    },

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Batch memory limit exceeded: estimated {0}MB, maximum allowed {1}MB")]
    BatchMemoryLimitExceeded(u64, u64),

    #[error("Batch file count limit exceeded: {0} files, maximum allowed {1}")]
    BatchFileLimitExceeded(usize, usize),

    #[error(
        "Insufficient available memory: estimated batch requires {0}MB, but only {1}MB available"
    )]
    InsufficientMemory(u64, u64),
}

fn describe_last(last: &Option<AttemptReport>) -> String {
    match last {
        Some(report) => format!(" (last: {})", report),
        None => String::new(),
    }
}

impl ReencodeError {
    /// True when the search ran but never reached the target window.
    pub fn is_convergence_failure(&self) -> bool {
        matches!(self, ReencodeError::SizeLockFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, ReencodeError>;
