/// Utility functions for common operations
///
/// This module contains helper functions that are used across multiple modules
/// to reduce code duplication and improve maintainability.
use crate::constants::{PROGRESS_BAR_TEMPLATE, PROGRESS_SPINNER_TEMPLATE, SUPPORTED_IMAGE_EXTENSIONS};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Check if a file path represents a supported image file
///
/// # Arguments
/// * `path` - The file path to check
///
/// # Returns
/// * `true` if the file has a supported image extension, `false` otherwise
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext_lower = ext.to_lowercase();
            SUPPORTED_IMAGE_EXTENSIONS.contains(&ext_lower.as_str())
        })
        .unwrap_or(false)
}

/// Create a progress spinner with consistent styling
pub fn create_progress_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template(PROGRESS_SPINNER_TEMPLATE) {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb
}

pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(PROGRESS_BAR_TEMPLATE)
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Format file size in human-readable format
///
/// # Returns
/// * `"512 B"`, `"1.50 KB"`, `"2.00 MB"` style strings
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;

    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.2} KB", bytes as f64 / KB)
    } else {
        format!("{:.2} MB", bytes as f64 / MB)
    }
}

/// Calculate compression ratio as a percentage
///
/// # Returns
/// * Compression ratio as percentage (positive means reduction, negative means increase)
pub fn calculate_compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    ((original_size as f64 - compressed_size as f64) / original_size as f64) * 100.0
}

/// Print compression result with formatted output
pub fn print_compression_result(original_size: u64, compressed_size: u64) {
    let ratio = calculate_compression_ratio(original_size, compressed_size);

    crate::info!("📊 Original size: {}", format_file_size(original_size));
    crate::info!("📈 Compressed size: {}", format_file_size(compressed_size));
    crate::info!("🎯 Compression ratio: {:.1}%", ratio);

    if ratio > 0.0 {
        crate::info!("✅ Successfully reduced file size by {:.1}%", ratio);
    } else {
        crate::warn!("File size increased by {:.1}%", ratio.abs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("test.jpg")));
        assert!(is_image_file(Path::new("test.JPEG")));
        assert!(is_image_file(Path::new("test.png")));
        assert!(is_image_file(Path::new("test.Gif")));

        assert!(!is_image_file(Path::new("test.webp")));
        assert!(!is_image_file(Path::new("test.txt")));
        assert!(!is_image_file(Path::new("test")));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 / 2), "2.50 MB");
    }

    #[test]
    fn test_calculate_compression_ratio() {
        assert_eq!(calculate_compression_ratio(1000, 800), 20.0);
        assert_eq!(calculate_compression_ratio(1000, 1200), -20.0);
        assert_eq!(calculate_compression_ratio(1000, 1000), 0.0);
        assert_eq!(calculate_compression_ratio(0, 500), 0.0);
    }
}
