use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageProcessing(#[from] image::ImageError),

    #[error("PNG optimization error: {0}")]
    PngOptimization(String),

    #[error("Color quantization error: {0}")]
    Quantization(String),

    #[error("Invalid quality value: {0}. Must be between 0 and 100")]
    InvalidQuality(u8),

    #[error("Invalid resize scale: {0}%. Must be between 10 and 100")]
    InvalidResizeScale(u8),

    #[error("Invalid target size: {0}")]
    InvalidTargetSize(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("No input file or folder selected")]
    NoPathSelected,

    #[error("Failed to create output directory: {0}")]
    DirectoryCreationFailed(PathBuf),

    #[error("No image files found in input path: {0}")]
    NoImageFilesFound(String),

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),

    #[error("A compression task is already running, wait for it to finish")]
    Busy,

    #[error("Session worker channel closed")]
    SessionClosed,

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

pub type Result<T> = std::result::Result<T, CompressionError>;
