//! Output container handling
//!
//! Compressed images are always written as either JPEG or PNG. Which one is
//! picked depends on the source file and the requested color handling, never
//! on the output file name.

use std::path::Path;

/// Supported output image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JPEG format with lossy compression
    Jpeg,
    /// PNG format with lossless compression
    Png,
}

/// True when the source file name says PNG or GIF.
pub fn is_lossless_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "png" | "gif"))
        .unwrap_or(false)
}

/// Picks the container for a compressed image.
///
/// PNG is used when the source is a PNG/GIF file, when the decoded image
/// carries an alpha channel, or when colors are reduced under extreme mode.
/// Everything else becomes JPEG.
pub fn choose_output_format(
    source: &Path,
    has_alpha: bool,
    reduce_colors: bool,
    extreme: bool,
) -> OutputFormat {
    if is_lossless_source(source) || has_alpha || (reduce_colors && extreme) {
        OutputFormat::Png
    } else {
        OutputFormat::Jpeg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_and_gif_sources_stay_lossless() {
        assert_eq!(
            choose_output_format(Path::new("a.png"), false, false, false),
            OutputFormat::Png
        );
        assert_eq!(
            choose_output_format(Path::new("a.GIF"), false, false, false),
            OutputFormat::Png
        );
    }

    #[test]
    fn test_jpeg_source_becomes_png_with_alpha() {
        assert_eq!(
            choose_output_format(Path::new("a.jpg"), false, false, false),
            OutputFormat::Jpeg
        );
        assert_eq!(
            choose_output_format(Path::new("a.jpg"), true, false, false),
            OutputFormat::Png
        );
    }

    #[test]
    fn test_reduce_colors_needs_extreme_to_force_png() {
        assert_eq!(
            choose_output_format(Path::new("a.jpeg"), false, true, false),
            OutputFormat::Jpeg
        );
        assert_eq!(
            choose_output_format(Path::new("a.jpeg"), false, true, true),
            OutputFormat::Png
        );
    }
}
