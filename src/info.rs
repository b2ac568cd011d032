use crate::config::TargetRange;
use crate::error::{ReencodeError, Result};
use crate::processing::{validate_file_exists, SourceImage};
use crate::report;
use crate::utils::format_file_size;
use image::{ColorType, ImageFormat};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    pub color: ColorType,
    pub format: Option<ImageFormat>,
    pub in_target: bool,
}

impl ImageInfo {
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    pub fn total_pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

pub fn get_image_info(input_path: &Path, target: TargetRange) -> Result<ImageInfo> {
    validate_file_exists(input_path)?;

    let bytes = fs::read(input_path).map_err(ReencodeError::Io)?;
    let file_size = bytes.len() as u64;
    let source = SourceImage::decode(bytes)?;
    let (width, height) = source.dimensions();

    Ok(ImageInfo {
        path: input_path.to_path_buf(),
        width,
        height,
        file_size,
        color: source.image().color(),
        format: source.format(),
        in_target: source.format() == Some(ImageFormat::Jpeg) && target.contains(file_size),
    })
}

pub fn print_image_info(info: &ImageInfo, target: TargetRange) {
    report!("📋 Basic Information:");
    report!("  📁 File: {:?}", info.path);
    report!("  📏 Dimensions: {}x{} pixels", info.width, info.height);
    report!(
        "  📦 File size: {} bytes ({})",
        info.file_size,
        format_file_size(info.file_size)
    );
    report!("  🎨 Color type: {:?}", info.color);
    match info.format {
        Some(format) => report!("  🎭 Image format: {:?}", format),
        None => report!("  🎭 Image format: unknown"),
    }
    report!("  🔢 Total pixels: {}", info.total_pixels());
    report!("  📐 Aspect ratio: {:.2}:1", info.aspect_ratio());

    report!(
        "\n🎯 Target window: {} - {}",
        format_file_size(target.min_bytes()),
        format_file_size(target.max_bytes())
    );
    if info.in_target {
        report!("  ✅ Already a JPEG inside the target window");
    } else if info.file_size < target.min_bytes() {
        report!("  ⬆️  Below the window: the search will grow width and quality");
    } else if info.file_size > target.max_bytes() {
        report!("  ⬇️  Above the window: the search will drop quality, then width");
    } else {
        report!("  🔄 Size fits but the file is not a JPEG: it will be re-encoded");
    }
}
