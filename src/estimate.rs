use crate::batch::collect_image_files;
use crate::constants::SCRATCH_PREFIX;
use crate::error::Result;
use crate::processing::{CompressionSettings, Compressor, ImageCodec};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::{Builder, TempPath};

/// Creates a uniquely named throwaway output path that keeps the input's
/// extension, e.g. `temp_compressed_1718000000000_a1B2c3.jpg`.
///
/// The file is removed when the returned `TempPath` is dropped, on every exit
/// path including unwinding.
pub fn scratch_path_for(input: &Path) -> Result<TempPath> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let suffix = input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    let file = Builder::new()
        .prefix(&format!("{}{}_", SCRATCH_PREFIX, millis))
        .suffix(&suffix)
        .tempfile()?;
    Ok(file.into_temp_path())
}

/// Runs `compressor` into a scratch file and returns the resulting size.
///
/// Returns 0 when the scratch file cannot be created or the codec fails.
pub fn estimate_size_with<C: Compressor + ?Sized>(
    compressor: &C,
    input: &Path,
    settings: &CompressionSettings,
) -> u64 {
    let scratch = match scratch_path_for(input) {
        Ok(path) => path,
        Err(e) => {
            crate::warn!("Cannot create scratch file for {:?}: {}", input, e);
            return 0;
        }
    };

    let result = compressor.compress(input, &scratch, settings);
    if let Err(e) = scratch.close() {
        crate::verbose!("Scratch file cleanup failed: {}", e);
    }

    if let Some(err) = result.error {
        crate::verbose!("Estimate for {:?} failed: {}", input, err);
        return 0;
    }
    result.bytes
}

/// Predicts the compressed size of one file without keeping any output.
pub fn estimate_size(input: &Path, settings: &CompressionSettings) -> u64 {
    estimate_size_with(&ImageCodec, input, settings)
}

/// Sums per-file estimates over every image below `root`.
///
/// Files that fail to estimate count as zero.
pub fn estimate_folder_size_with<C: Compressor + ?Sized>(
    compressor: &C,
    root: &Path,
    settings: &CompressionSettings,
) -> Result<u64> {
    let files = collect_image_files(&root.to_string_lossy(), true)?;
    Ok(files
        .iter()
        .map(|file| estimate_size_with(compressor, file, settings))
        .sum())
}

pub fn estimate_folder_size(root: &Path, settings: &CompressionSettings) -> Result<u64> {
    estimate_folder_size_with(&ImageCodec, root, settings)
}
