use std::time::Duration;

pub const DEFAULT_QUALITY: u8 = 80;
pub const MIN_QUALITY: u8 = 0;
pub const MAX_QUALITY: u8 = 100;

pub const DEFAULT_RESIZE_SCALE: u8 = 100;
pub const MIN_RESIZE_SCALE: u8 = 10;
pub const MAX_RESIZE_SCALE: u8 = 100;

// Extreme mode caps
pub const EXTREME_MAX_RESIZE_SCALE: u8 = 70;
pub const EXTREME_MIN_QUALITY: u8 = 10;

// Adaptive palette sizes
pub const FORCED_PALETTE_COLORS: u32 = 64;
pub const REDUCED_PALETTE_COLORS: u32 = 64;
pub const EXTREME_REDUCED_PALETTE_COLORS: u32 = 32;

// PNG "compress level 9" equivalent: libdeflater at its highest level
pub const MAX_PNG_COMPRESS_LEVEL: u8 = 9;
pub const OXIPNG_PRESET: u8 = 4;
pub const LIBDEFLATER_MAX_LEVEL: u8 = 12;

// Target-size search
pub const SEARCH_MIN_QUALITY: u8 = 5;
pub const SEARCH_MAX_QUALITY: u8 = 100;
pub const SEARCH_INITIAL_BEST_QUALITY: u8 = 80;
pub const SEARCH_MIN_RANGE: u8 = 5;
pub const DEFAULT_MAX_ITERATIONS: usize = 10;
pub const DEFAULT_TOLERANCE: f64 = 0.05;

// Session
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);
pub const MAX_WORKERS: usize = 4;

pub const OUTPUT_PREFIX: &str = "compressed_";
pub const SCRATCH_PREFIX: &str = "temp_compressed_";
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

pub const PROGRESS_SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
