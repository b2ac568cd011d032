use crate::constants::{
    DEFAULT_MAX_BYTES, DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_BYTES, DEFAULT_QUALITY_CEILING,
    DEFAULT_QUALITY_FLOOR, DEFAULT_QUALITY_SHRINK_THRESHOLD, DEFAULT_QUALITY_STEP_DOWN,
    DEFAULT_QUALITY_STEP_UP, DEFAULT_START_QUALITY, DEFAULT_START_WIDTH, DEFAULT_WIDTH_FLOOR,
    DEFAULT_WIDTH_STEP, MAX_QUALITY,
};
use crate::error::{ReencodeError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Inclusive byte window an encoded image must land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetRange {
    min_bytes: u64,
    max_bytes: u64,
}

impl TargetRange {
    pub fn new(min_bytes: u64, max_bytes: u64) -> Result<Self> {
        if min_bytes == 0 || min_bytes > max_bytes {
            return Err(ReencodeError::InvalidTargetRange {
                min: min_bytes,
                max: max_bytes,
            });
        }
        Ok(Self {
            min_bytes,
            max_bytes,
        })
    }

    pub fn min_bytes(&self) -> u64 {
        self.min_bytes
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn contains(&self, size: u64) -> bool {
        (self.min_bytes..=self.max_bytes).contains(&size)
    }
}

impl Default for TargetRange {
    fn default() -> Self {
        Self {
            min_bytes: DEFAULT_MIN_BYTES,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Tuning constants for the size-lock search.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```
/// use sizelock::SizeLockConfig;
///
/// let config = SizeLockConfig::from_toml_str("start_width = 3200\nmax_iterations = 10").unwrap();
/// assert_eq!(config.start_width, 3200);
/// assert_eq!(config.max_iterations, 10);
/// assert_eq!(config.start_quality, 94);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizeLockConfig {
    pub start_width: u32,
    pub start_quality: u8,
    /// Number of encode attempts. Zero means the search fails without encoding.
    pub max_iterations: u32,
    pub width_step: u32,
    pub quality_step_up: u8,
    pub quality_step_down: u8,
    /// Oversized results only trade width once quality is at or below this.
    pub quality_shrink_threshold: u8,
    pub quality_floor: u8,
    pub quality_ceiling: u8,
    pub width_floor: u32,
}

impl Default for SizeLockConfig {
    fn default() -> Self {
        Self {
            start_width: DEFAULT_START_WIDTH,
            start_quality: DEFAULT_START_QUALITY,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            width_step: DEFAULT_WIDTH_STEP,
            quality_step_up: DEFAULT_QUALITY_STEP_UP,
            quality_step_down: DEFAULT_QUALITY_STEP_DOWN,
            quality_shrink_threshold: DEFAULT_QUALITY_SHRINK_THRESHOLD,
            quality_floor: DEFAULT_QUALITY_FLOOR,
            quality_ceiling: DEFAULT_QUALITY_CEILING,
            width_floor: DEFAULT_WIDTH_FLOOR,
        }
    }
}

impl SizeLockConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SizeLockConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReencodeError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_width == 0 {
            return Err(invalid("start_width must be positive"));
        }
        if self.width_floor == 0 {
            return Err(invalid("width_floor must be positive"));
        }
        if self.width_step == 0 {
            return Err(invalid("width_step must be positive"));
        }
        if self.quality_ceiling > MAX_QUALITY {
            return Err(invalid(format!(
                "quality_ceiling {} exceeds {}",
                self.quality_ceiling, MAX_QUALITY
            )));
        }
        if self.quality_floor > self.quality_ceiling {
            return Err(invalid(format!(
                "quality_floor {} is above quality_ceiling {}",
                self.quality_floor, self.quality_ceiling
            )));
        }
        if !(self.quality_floor..=self.quality_ceiling).contains(&self.start_quality) {
            return Err(invalid(format!(
                "start_quality {} must lie within {}..={}",
                self.start_quality, self.quality_floor, self.quality_ceiling
            )));
        }
        Ok(())
    }

    pub fn with_overrides(mut self, overrides: &SizeLockOverrides) -> Result<Self> {
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(value) = overrides.$field {
                    self.$field = value;
                })*
            };
        }
        apply!(
            start_width,
            start_quality,
            max_iterations,
            width_step,
            quality_step_up,
            quality_step_down,
            quality_shrink_threshold,
            quality_floor,
            quality_ceiling,
            width_floor
        );
        self.validate()?;
        Ok(self)
    }
}

fn invalid(msg: impl Into<String>) -> ReencodeError {
    ReencodeError::InvalidConfig(msg.into())
}

/// Per-field overrides layered on top of a file or the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeLockOverrides {
    pub start_width: Option<u32>,
    pub start_quality: Option<u8>,
    pub max_iterations: Option<u32>,
    pub width_step: Option<u32>,
    pub quality_step_up: Option<u8>,
    pub quality_step_down: Option<u8>,
    pub quality_shrink_threshold: Option<u8>,
    pub quality_floor: Option<u8>,
    pub quality_ceiling: Option<u8>,
    pub width_floor: Option<u32>,
}

/// Resolve the effective configuration: optional TOML file, then overrides.
pub fn resolve_config(
    config_path: Option<&Path>,
    overrides: &SizeLockOverrides,
) -> Result<SizeLockConfig> {
    let base = match config_path {
        Some(path) => SizeLockConfig::load(path)?,
        None => SizeLockConfig::default(),
    };
    base.with_overrides(overrides)
}
