use crate::config::{SizeLockConfig, TargetRange};
use crate::constants::{MAX_FILE_SIZE, MAX_IMAGE_DIMENSION, MAX_QUALITY, MIN_CODEC_QUALITY};
use crate::error::{ReencodeError, Result};
use crate::size_lock::{reencode, EncodeResult};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::fs;
use std::path::Path;
use tracing::info;

/// A decoded source image together with the bytes it was decoded from.
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: DynamicImage,
    original: Vec<u8>,
    format: Option<ImageFormat>,
}

impl SourceImage {
    /// Decode an encoded image, guessing its format from the leading bytes.
    pub fn decode(bytes: Vec<u8>) -> Result<Self> {
        let format = image::guess_format(&bytes).map_err(ReencodeError::InvalidSource)?;
        let image = image::load_from_memory_with_format(&bytes, format)
            .map_err(ReencodeError::InvalidSource)?;

        Ok(Self {
            image,
            original: bytes,
            format: Some(format),
        })
    }

    /// Wrap pixels that did not come from an encoded file.
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            image,
            original: Vec::new(),
            format: None,
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn original_bytes(&self) -> &[u8] {
        &self.original
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Encodes an image as JPEG at a given width and quality.
///
/// The search loop only sees this trait, so tests can plug in a synthetic
/// size model instead of a real codec.
pub trait JpegEncode {
    fn encode(&self, image: &DynamicImage, width: u32, quality: u8) -> Result<Vec<u8>>;
}

impl<F> JpegEncode for F
where
    F: Fn(&DynamicImage, u32, u8) -> Result<Vec<u8>>,
{
    fn encode(&self, image: &DynamicImage, width: u32, quality: u8) -> Result<Vec<u8>> {
        self(image, width, quality)
    }
}

/// Baseline JPEG through the `image` crate.
///
/// The encoder writes every component with 1x1 sampling factors, i.e. 4:4:4
/// chroma, which is what the size search assumes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageJpegEncoder;

impl JpegEncode for ImageJpegEncoder {
    fn encode(&self, image: &DynamicImage, width: u32, quality: u8) -> Result<Vec<u8>> {
        let resized;
        let frame = if width == image.width() {
            image
        } else {
            resized = resize_to_width(image, width);
            &resized
        };

        let rgb = frame.to_rgb8();
        let quality = quality.clamp(MIN_CODEC_QUALITY, MAX_QUALITY);

        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality)
            .encode_image(&rgb)
            .map_err(|e| ReencodeError::Encode(e.to_string()))?;

        Ok(buffer)
    }
}

/// Height that keeps the aspect ratio at `width`, rounded and at least 1.
pub fn proportional_height(src_width: u32, src_height: u32, width: u32) -> u32 {
    if src_width == 0 {
        return src_height.max(1);
    }
    let scaled = (src_height as u64 * width as u64 + src_width as u64 / 2) / src_width as u64;
    scaled.clamp(1, u32::MAX as u64) as u32
}

/// Resize to `width`, preserving aspect ratio. Enlarges when `width` is bigger.
pub fn resize_to_width(img: &DynamicImage, width: u32) -> DynamicImage {
    let width = width.max(1);
    let height = proportional_height(img.width(), img.height(), width);
    img.resize_exact(width, height, FilterType::Lanczos3)
}

/// Validates that a file exists at the given path.
///
/// # Example
/// ```
/// use std::path::Path;
/// use sizelock::validate_file_exists;
///
/// let result = validate_file_exists(Path::new("nonexistent.jpg"));
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(ReencodeError::FileNotFound(path.to_path_buf()));
    }
    Ok(())
}

/// Loads and decodes an image file.
///
/// # Returns
/// * `Ok((source, file_size))` - The decoded source and its size on disk
/// * `Err(ReencodeError)` - If loading fails or a safety limit is exceeded
///
/// # Security Features
/// - Canonicalizes the path before reading
/// - Checks file size before reading the file into memory
/// - Rejects decoded images with an oversized side
pub fn load_source_image(input_path: &Path) -> Result<(SourceImage, u64)> {
    validate_file_exists(input_path)?;

    let canonical_path = input_path
        .canonicalize()
        .map_err(|_| ReencodeError::FileNotFound(input_path.to_path_buf()))?;

    let file_size = fs::metadata(&canonical_path)?.len();
    if file_size > MAX_FILE_SIZE {
        return Err(ReencodeError::FileTooLarge(file_size, MAX_FILE_SIZE));
    }

    let source = SourceImage::decode(fs::read(&canonical_path)?)?;

    let (width, height) = source.dimensions();
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(ReencodeError::InvalidDimensions(
            width,
            height,
            MAX_IMAGE_DIMENSION,
        ));
    }

    Ok((source, file_size))
}

/// Load -> size lock -> write.
///
/// Nothing is written unless the search converged.
///
/// # Returns
/// * `Ok((original_size, result))` - Input size on disk and the accepted encode
pub fn lock_file(
    input_path: &Path,
    output_path: &Path,
    target: TargetRange,
    config: &SizeLockConfig,
) -> Result<(u64, EncodeResult)> {
    let (source, original_size) = load_source_image(input_path)?;
    let result = reencode(&source, target, config, &ImageJpegEncoder)?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|_| ReencodeError::DirectoryCreationFailed(parent.to_path_buf()))?;
    }
    fs::write(output_path, &result.bytes)?;

    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        size = result.size_bytes,
        width = result.width,
        quality = result.quality,
        "size lock written"
    );

    Ok((original_size, result))
}
