#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A noisy gradient: compresses differently at different qualities.
pub fn gradient_rgb(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let noise = ((x * 31 + y * 17) % 23) as u8;
        Rgb([
            ((x * 255) / width.max(1)) as u8 ^ noise,
            ((y * 255) / height.max(1)) as u8,
            ((x + y) % 256) as u8 ^ (noise << 2),
        ])
    }))
}

pub fn translucent_rgba(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 90, if x < width / 2 { 255 } else { 80 }])
    }))
}

pub fn write_jpeg(path: &Path, width: u32, height: u32) -> PathBuf {
    gradient_rgb(width, height)
        .save_with_format(path, ImageFormat::Jpeg)
        .unwrap();
    path.to_path_buf()
}

pub fn write_png(path: &Path, width: u32, height: u32) -> PathBuf {
    translucent_rgba(width, height)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
    path.to_path_buf()
}

/// A folder with two real images, one nested image, and a text file.
pub fn create_image_folder(root: &Path) -> Vec<PathBuf> {
    let subdir = root.join("subdir");
    std::fs::create_dir_all(&subdir).unwrap();

    let files = vec![
        write_jpeg(&root.join("photo.jpg"), 96, 64),
        write_png(&root.join("logo.png"), 48, 48),
        write_jpeg(&subdir.join("nested.jpeg"), 64, 64),
    ];

    File::create(root.join("notes.txt"))
        .unwrap()
        .write_all(b"not an image")
        .unwrap();

    files
}

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}
