pub mod batch;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod info;
pub mod logger;
pub mod processing;
pub mod size_lock;
pub mod utils;

pub use batch::{batch_lock_images, collect_image_files, generate_output_path, BatchSummary};
pub use config::{resolve_config, SizeLockConfig, SizeLockOverrides, TargetRange};
pub use error::{AttemptReport, ReencodeError, Result};
pub use info::{get_image_info, print_image_info, ImageInfo};
pub use processing::{
    load_source_image, lock_file, resize_to_width, validate_file_exists, ImageJpegEncoder,
    JpegEncode, SourceImage,
};
pub use size_lock::{reencode, EncodeAttempt, EncodeResult};
