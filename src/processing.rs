use crate::constants::{
    DEFAULT_QUALITY, DEFAULT_RESIZE_SCALE, EXTREME_MAX_RESIZE_SCALE, EXTREME_MIN_QUALITY,
    EXTREME_REDUCED_PALETTE_COLORS, FORCED_PALETTE_COLORS, LIBDEFLATER_MAX_LEVEL,
    MAX_PNG_COMPRESS_LEVEL, MAX_QUALITY, MAX_RESIZE_SCALE, MIN_QUALITY, MIN_RESIZE_SCALE,
    OXIPNG_PRESET, REDUCED_PALETTE_COLORS,
};
use crate::error::{CompressionError, Result};
use crate::formats::{choose_output_format, OutputFormat};
use crate::quantize::quantize_to_palette;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageReader, Rgb, RgbImage};
use oxipng::{Deflaters, Options};
use std::fs;
use std::path::{Path, PathBuf};

/// User-tunable knobs shared by single-file, batch, estimate and search runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionSettings {
    pub quality: u8,
    pub resize_scale: u8,
    pub grayscale: bool,
    pub reduce_colors: bool,
    pub extreme: bool,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            resize_scale: DEFAULT_RESIZE_SCALE,
            grayscale: false,
            reduce_colors: false,
            extreme: false,
        }
    }
}

impl CompressionSettings {
    pub fn new(
        quality: Option<u8>,
        resize_scale: Option<u8>,
        grayscale: bool,
        reduce_colors: bool,
        extreme: bool,
    ) -> Result<Self> {
        let quality = quality.unwrap_or(DEFAULT_QUALITY);
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
            return Err(CompressionError::InvalidQuality(quality));
        }

        let resize_scale = resize_scale.unwrap_or(DEFAULT_RESIZE_SCALE);
        if !(MIN_RESIZE_SCALE..=MAX_RESIZE_SCALE).contains(&resize_scale) {
            return Err(CompressionError::InvalidResizeScale(resize_scale));
        }

        Ok(Self {
            quality,
            resize_scale,
            grayscale,
            reduce_colors,
            extreme,
        })
    }

    pub fn with_quality(self, quality: u8) -> Self {
        Self { quality, ..self }
    }

    /// Settings after the extreme preset is applied: scale capped at 70%,
    /// quality raised to at least 10. Without extreme mode this is a copy.
    pub fn effective(&self) -> Self {
        if !self.extreme {
            return *self;
        }
        Self {
            quality: self.quality.max(EXTREME_MIN_QUALITY),
            resize_scale: self.resize_scale.min(EXTREME_MAX_RESIZE_SCALE),
            ..*self
        }
    }
}

/// One compression invocation: where to read, where to write, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub settings: CompressionSettings,
}

impl CompressionRequest {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, settings: CompressionSettings) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            settings,
        }
    }
}

/// Outcome of a codec call. A failed call reports zero bytes and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionResult {
    pub bytes: u64,
    pub error: Option<String>,
}

impl CompressionResult {
    pub fn succeeded(bytes: u64) -> Self {
        Self { bytes, error: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            bytes: 0,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Encoder parameters produced by the transform pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    pub format: OutputFormat,
    /// Lossy quality; absent for PNG output.
    pub quality: Option<u8>,
    /// zlib-style effort level; only set for PNG output. Informational: the
    /// encoder always runs at `CompressionType::Best` plus libdeflater 12.
    pub compress_level: Option<u8>,
    pub optimize: bool,
}

/// Anything that can turn an input image into a compressed output file.
///
/// Search, estimation, batch and session code only talk to this trait, so a
/// failing codec call always comes back as a `CompressionResult` rather than
/// an error value.
pub trait Compressor: Send + Sync {
    fn compress(&self, input: &Path, output: &Path, settings: &CompressionSettings)
        -> CompressionResult;
}

/// The production codec backed by the `image`, `imagequant` and `oxipng` crates.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCodec;

impl Compressor for ImageCodec {
    fn compress(
        &self,
        input: &Path,
        output: &Path,
        settings: &CompressionSettings,
    ) -> CompressionResult {
        compress_image(input, output, settings)
    }
}

/// Validates that a file exists at the given path.
///
/// # Example
/// ```
/// use std::path::Path;
/// use img_shrink::validate_file_exists;
///
/// let result = validate_file_exists(Path::new("nonexistent.jpg"));
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CompressionError::FileNotFound(path.to_path_buf()));
    }
    Ok(())
}

/// Compresses `input` into `output` and reports the written size.
///
/// Never returns an error: decoding, encoding and I/O failures are logged
/// and come back as a zero-byte result carrying the error message.
pub fn compress_image(
    input: &Path,
    output: &Path,
    settings: &CompressionSettings,
) -> CompressionResult {
    match process_image_pipeline(input, output, settings) {
        Ok(bytes) => CompressionResult::succeeded(bytes),
        Err(e) => {
            crate::warn!("Failed to process {:?}: {}", input, e);
            CompressionResult::failed(e.to_string())
        }
    }
}

/// Core pipeline: load -> transform -> encode -> write.
///
/// # Returns
/// * `Ok(compressed_size)` - Size of the written file in bytes
/// * `Err(CompressionError)` - If any step fails
pub fn process_image_pipeline(
    input: &Path,
    output: &Path,
    settings: &CompressionSettings,
) -> Result<u64> {
    let (img, original_size) = load_image_with_metadata(input)?;
    crate::verbose!(
        "Loaded {:?}: {}x{} {:?}, {} bytes",
        input,
        img.width(),
        img.height(),
        img.color(),
        original_size
    );

    let (img, options) = prepare_image(img, input, settings)?;
    let encoded = encode_image(&img, &options)?;
    write_output(output, &encoded)?;

    Ok(fs::metadata(output)?.len())
}

/// Loads an image file and returns it along with its size on disk.
///
/// The container is sniffed from the file contents, so files whose
/// extension does not match their data still decode.
pub fn load_image_with_metadata(input: &Path) -> Result<(DynamicImage, u64)> {
    validate_file_exists(input)?;

    let file_size = fs::metadata(input)?.len();
    let img = ImageReader::open(input)?.with_guessed_format()?.decode()?;

    Ok((img, file_size))
}

/// Runs every pixel transform and decides the encoder parameters.
///
/// Order matters and follows the save path exactly: format choice, extreme
/// preset, transparency, resize, partial grayscale, color reduction.
pub fn prepare_image(
    img: DynamicImage,
    source: &Path,
    settings: &CompressionSettings,
) -> Result<(DynamicImage, SaveOptions)> {
    let effective = settings.effective();
    let mut format = choose_output_format(
        source,
        img.color().has_alpha(),
        settings.reduce_colors,
        settings.extreme,
    );
    let mut quality = Some(effective.quality);
    let mut img = img;
    let mut paletted = false;

    if settings.extreme && !settings.reduce_colors && format == OutputFormat::Png {
        img = quantize_to_palette(&img, FORCED_PALETTE_COLORS)?;
        quality = None;
        paletted = true;
    }

    if !paletted {
        img = resolve_transparency(img, format);
    }

    if effective.resize_scale < 100 {
        // Palette images keep their palette: no interpolation between entries
        let filter = if paletted {
            FilterType::Nearest
        } else {
            FilterType::Lanczos3
        };
        resize_image(&mut img, effective.resize_scale, filter);
    }

    if settings.grayscale && !is_luma_only(&img) {
        img = apply_partial_grayscale(&img);
    }

    if settings.reduce_colors && has_color_channels(&img) {
        let colors = if settings.extreme {
            EXTREME_REDUCED_PALETTE_COLORS
        } else {
            REDUCED_PALETTE_COLORS
        };
        img = quantize_to_palette(&img, colors)?;
        format = OutputFormat::Png;
        quality = None;
    }

    let compress_level = if format == OutputFormat::Png {
        quality = None;
        Some(MAX_PNG_COMPRESS_LEVEL)
    } else {
        None
    };

    Ok((
        img,
        SaveOptions {
            format,
            quality,
            compress_level,
            optimize: true,
        },
    ))
}

/// Alpha images headed for JPEG are flattened onto white; alpha images that
/// stay PNG are normalized to RGBA.
pub fn resolve_transparency(img: DynamicImage, format: OutputFormat) -> DynamicImage {
    if !img.color().has_alpha() {
        return img;
    }
    match format {
        OutputFormat::Jpeg => flatten_onto_white(&img),
        OutputFormat::Png => match img {
            DynamicImage::ImageRgba8(_) => img,
            other => DynamicImage::ImageRgba8(other.to_rgba8()),
        },
    }
}

fn flatten_onto_white(img: &DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let flattened = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let alpha = u32::from(p[3]);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(p[0]), blend(p[1]), blend(p[2])])
    });
    DynamicImage::ImageRgb8(flattened)
}

pub fn scaled_dimensions(width: u32, height: u32, resize_scale: u8) -> (u32, u32) {
    let scale = |dim: u32| ((u64::from(dim) * u64::from(resize_scale)) / 100).max(1) as u32;
    (scale(width), scale(height))
}

pub fn resize_image(img: &mut DynamicImage, resize_scale: u8, filter: FilterType) {
    let (width, height) = img.dimensions();
    let (new_width, new_height) = scaled_dimensions(width, height, resize_scale);
    if (new_width, new_height) == (width, height) {
        return;
    }
    crate::verbose!(
        "Resizing {}x{} -> {}x{} ({}%)",
        width,
        height,
        new_width,
        new_height,
        resize_scale
    );
    *img = img.resize_exact(new_width, new_height, filter);
}

/// Desaturates the bottom half of the image only.
///
/// Rows `[0, height / 2)` keep their color; rows from `height / 2` down are
/// replaced by their luminance. The result is always RGB, alpha is dropped.
pub fn apply_partial_grayscale(img: &DynamicImage) -> DynamicImage {
    let (width, height) = img.dimensions();
    let split = height / 2;

    let mut composite = img.to_rgb8();
    let luma = img.to_luma8();
    for y in split..height {
        for x in 0..width {
            let l = luma.get_pixel(x, y)[0];
            composite.put_pixel(x, y, Rgb([l, l, l]));
        }
    }

    DynamicImage::ImageRgb8(composite)
}

fn is_luma_only(img: &DynamicImage) -> bool {
    matches!(img.color(), ColorType::L8 | ColorType::L16)
}

fn has_color_channels(img: &DynamicImage) -> bool {
    !matches!(
        img.color(),
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16
    )
}

/// Encodes a prepared image in memory.
pub fn encode_image(img: &DynamicImage, options: &SaveOptions) -> Result<Vec<u8>> {
    let mut buf = Vec::new();

    match options.format {
        OutputFormat::Jpeg => {
            let quality = options.quality.unwrap_or(DEFAULT_QUALITY).max(1);
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            match img {
                DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => {
                    img.write_with_encoder(encoder)?
                }
                other => DynamicImage::ImageRgb8(other.to_rgb8()).write_with_encoder(encoder)?,
            }
            Ok(buf)
        }
        OutputFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilterType::Adaptive);
            img.write_with_encoder(encoder)?;

            if !options.optimize {
                return Ok(buf);
            }

            let mut oxipng_options = Options::from_preset(OXIPNG_PRESET);
            oxipng_options.deflate = Deflaters::Libdeflater {
                compression: LIBDEFLATER_MAX_LEVEL,
            };
            oxipng::optimize_from_memory(&buf, &oxipng_options)
                .map_err(|e| CompressionError::PngOptimization(e.to_string()))
        }
    }
}

fn write_output(output: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|_| CompressionError::DirectoryCreationFailed(parent.to_path_buf()))?;
    }
    fs::write(output, bytes)?;
    Ok(())
}
