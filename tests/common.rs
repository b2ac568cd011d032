#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Deterministic noisy pattern so JPEG size responds to width and quality.
pub fn textured_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let n = x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503);
        Rgb([(n >> 3) as u8, (n >> 11) as u8, (x * 3 + y * 5) as u8])
    });
    DynamicImage::ImageRgb8(img)
}

pub fn write_png(path: &Path, width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    textured_image(width, height)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    File::create(path).unwrap().write_all(&bytes).unwrap();
    bytes
}

pub fn write_fake_image(path: &Path) {
    File::create(path)
        .unwrap()
        .write_all(b"fake image data")
        .unwrap();
}

pub fn write_tuning_file(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("sizelock.toml");
    File::create(&path)
        .unwrap()
        .write_all(content.as_bytes())
        .unwrap();
    path
}

/// Tuning scaled down to small test images.
pub const SMALL_TUNING: &str = "start_width = 64\nwidth_floor = 16\nwidth_step = 16\n";

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}
