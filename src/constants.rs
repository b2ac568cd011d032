pub const MIB: u64 = 1024 * 1024;

// Target window used by callers that post-process generated catalog images
pub const DEFAULT_MIN_BYTES: u64 = MIB;
pub const DEFAULT_MAX_BYTES: u64 = 3 * MIB;

// Search tuning defaults
pub const DEFAULT_START_WIDTH: u32 = 2800;
pub const DEFAULT_START_QUALITY: u8 = 94;
pub const DEFAULT_MAX_ITERATIONS: u32 = 25;
pub const DEFAULT_WIDTH_STEP: u32 = 250;
pub const DEFAULT_QUALITY_STEP_UP: u8 = 2;
pub const DEFAULT_QUALITY_STEP_DOWN: u8 = 4;
pub const DEFAULT_QUALITY_SHRINK_THRESHOLD: u8 = 85;
pub const DEFAULT_QUALITY_FLOOR: u8 = 80;
pub const DEFAULT_QUALITY_CEILING: u8 = 98;
pub const DEFAULT_WIDTH_FLOOR: u32 = 2000;

pub const MAX_QUALITY: u8 = 100;

/// The image crate's JPEG encoder rejects quality 0.
pub const MIN_CODEC_QUALITY: u8 = 1;

pub const MAX_FILE_SIZE: u64 = 100 * MIB;
pub const MAX_IMAGE_DIMENSION: u32 = 16384;

pub const MAX_BATCH_FILES: usize = 1000;
pub const MAX_BATCH_MEMORY_MIB: u64 = 4096;
pub const LARGE_IMAGE_THRESHOLD_MIB: f64 = 50.0;
pub const MAX_CONCURRENT_LARGE_IMAGES: usize = 2;
pub const MIN_AVAILABLE_MEMORY_MIB: u64 = 256;

pub const OUTPUT_EXTENSION: &str = "jpg";

/// Extensions the `image` crate can decode with the enabled features.
/// AVIF is absent: the `avif` feature only encodes.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif", "gif"];

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
