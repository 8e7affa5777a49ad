pub mod batch;
pub mod cli;
pub mod constants;
pub mod debounce;
pub mod error;
pub mod estimate;
pub mod formats;
pub mod interactive;
pub mod logger;
pub mod processing;
pub mod quantize;
pub mod search;
pub mod session;
pub mod utils;
pub mod validation;

pub use batch::{
    batch_compress_with, batch_root, collect_image_files, compress_file_with, generate_output_path, BatchOptions,
    BatchReport, FileOutcome,
};
pub use debounce::Debouncer;
pub use error::{CompressionError, Result};
pub use estimate::{estimate_folder_size, estimate_size, estimate_size_with};
pub use formats::{choose_output_format, OutputFormat};
pub use processing::{
    compress_image, encode_image, load_image_with_metadata, prepare_image, process_image_pipeline,
    resize_image, scaled_dimensions, validate_file_exists, CompressionRequest, CompressionResult,
    CompressionSettings, Compressor, ImageCodec, SaveOptions,
};
pub use search::{search_quality, search_quality_with, SearchOptions, SearchOutcome, SearchState};
pub use session::{Job, Session, SessionConfig, SessionEvent};
pub use utils::{calculate_compression_ratio, format_file_size, is_image_file};
pub use validation::{validate_input_path, validate_output_dir, InputMode, TargetSize};
