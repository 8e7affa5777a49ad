use crate::constants::OUTPUT_PREFIX;
use crate::error::{CompressionError, Result};
use crate::processing::{CompressionResult, CompressionSettings, Compressor};
use crate::search::{search_quality_with, SearchOptions};
use crate::utils::is_image_file;
use glob::glob;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Totals for a batch run. Failed files contribute zero bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub failed: usize,
    pub total_bytes: u64,
}

/// How each file of a batch is compressed and where it goes.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Write outputs under this directory instead of next to each input.
    pub output_dir: Option<PathBuf>,
    /// Search each file's quality towards this size instead of using
    /// the fixed quality.
    pub target_bytes: Option<u64>,
    pub search: SearchOptions,
}

/// Per-file outcome of [`compress_file_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub result: CompressionResult,
    /// Quality chosen by the target-size search, if one ran.
    pub searched_quality: Option<u8>,
}

pub fn collect_image_files(input: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    let input_path = Path::new(input);
    let canonical_input = if input_path.exists() {
        input_path
            .canonicalize()
            .map_err(|_| CompressionError::NoImageFilesFound(input.to_string()))?
    } else {
        // For glob patterns, we'll validate each result individually
        input_path.to_path_buf()
    };

    if canonical_input.is_file() {
        if is_image_file(&canonical_input) {
            image_files.push(canonical_input);
        }
    } else if canonical_input.is_dir() {
        let walker = if recursive {
            WalkDir::new(&canonical_input)
        } else {
            WalkDir::new(&canonical_input).max_depth(1)
        };

        for entry in walker.sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();

            if entry.file_type().is_file() && is_image_file(path) {
                image_files.push(path.to_path_buf());
            }
        }
    } else if let Ok(glob_pattern) = glob(input) {
        for entry in glob_pattern.flatten() {
            if entry.is_file() && is_image_file(&entry) {
                if let Ok(canonical_path) = entry.canonicalize() {
                    image_files.push(canonical_path);
                }
            }
        }
    } else {
        return Err(CompressionError::NoImageFilesFound(input.to_string()));
    }

    Ok(image_files)
}

/// Output location for `input`: `compressed_<name>` next to the input, or
/// inside `output_dir` keeping the sub-directory layout below `root`.
pub fn generate_output_path(
    input_path: &Path,
    root: Option<&Path>,
    output_dir: Option<&Path>,
) -> Result<PathBuf> {
    let file_name = input_path
        .file_name()
        .ok_or_else(|| CompressionError::UnsupportedFormat("Invalid file name".to_string()))?;
    let output_name = format!("{}{}", OUTPUT_PREFIX, file_name.to_string_lossy());

    let dir = match output_dir {
        Some(out) => {
            let relative_parent = root
                .and_then(|r| input_path.strip_prefix(r).ok())
                .and_then(Path::parent)
                .map(Path::to_path_buf)
                .unwrap_or_default();
            out.join(relative_parent)
        }
        None => input_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };

    Ok(dir.join(output_name))
}

/// Directory whose layout is mirrored under an output directory.
///
/// A directory input is its own root. For a file or glob input the root is
/// the deepest folder containing every matched file, so matches from
/// different sub-folders keep distinct output paths.
pub fn batch_root(input: &str, files: &[PathBuf]) -> Option<PathBuf> {
    if let Some(dir) = Path::new(input).canonicalize().ok().filter(|p| p.is_dir()) {
        return Some(dir);
    }

    let (first, rest) = files.split_first()?;
    let mut root = first.parent()?.to_path_buf();
    for file in rest {
        while !file.starts_with(&root) {
            if !root.pop() {
                return None;
            }
        }
    }
    Some(root)
}

/// Compresses one file, either at the fixed quality or through the
/// target-size search.
///
/// When the search finds the input already under the target, the input is
/// copied unchanged so the output location is always populated.
pub fn compress_file_with<C: Compressor + ?Sized>(
    compressor: &C,
    input: &Path,
    output: &Path,
    settings: &CompressionSettings,
    target_bytes: Option<u64>,
    search: &SearchOptions,
) -> FileOutcome {
    let Some(target) = target_bytes else {
        return FileOutcome {
            result: compressor.compress(input, output, settings),
            searched_quality: None,
        };
    };

    let outcome = search_quality_with(compressor, input, output, target, search, settings);
    let result = if outcome.skipped {
        copy_unchanged(input, output)
    } else {
        outcome.result
    };

    FileOutcome {
        result,
        searched_quality: Some(outcome.quality),
    }
}

fn copy_unchanged(input: &Path, output: &Path) -> CompressionResult {
    let copied = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|_| fs::copy(input, output));
    match copied {
        Ok(bytes) => CompressionResult::succeeded(bytes),
        Err(e) => CompressionResult::failed(e.to_string()),
    }
}

/// Compresses every file in `files` one after another.
///
/// `on_progress(done, total, running_total_bytes)` is called after each file.
/// A failing file is counted, logged, and adds nothing to the total; it never
/// stops the batch. A file whose output path was already written earlier in
/// the run is counted as failed instead of overwriting that output.
pub fn batch_compress_with<C, F>(
    compressor: &C,
    files: &[PathBuf],
    root: Option<&Path>,
    options: &BatchOptions,
    settings: &CompressionSettings,
    mut on_progress: F,
) -> Result<BatchReport>
where
    C: Compressor + ?Sized,
    F: FnMut(usize, usize, u64),
{
    if let Some(out) = &options.output_dir {
        fs::create_dir_all(out).map_err(|_| CompressionError::DirectoryCreationFailed(out.clone()))?;
    }

    let total = files.len();
    let mut report = BatchReport::default();
    let mut written = HashSet::with_capacity(total);

    for (i, input) in files.iter().enumerate() {
        let output = generate_output_path(input, root, options.output_dir.as_deref())?;
        let outcome = if written.insert(output.clone()) {
            compress_file_with(
                compressor,
                input,
                &output,
                settings,
                options.target_bytes,
                &options.search,
            )
        } else {
            crate::warn!("Skipping {:?}: {:?} was already written in this batch", input, output);
            FileOutcome {
                result: CompressionResult::failed(format!("output {:?} already written", output)),
                searched_quality: None,
            }
        };

        report.processed += 1;
        report.total_bytes += outcome.result.bytes;
        if let Some(err) = &outcome.result.error {
            report.failed += 1;
            crate::verbose!("{:?} failed: {}", input, err);
        }

        on_progress(i + 1, total, report.total_bytes);
    }

    Ok(report)
}
