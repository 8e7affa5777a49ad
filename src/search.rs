//! Binary search over the quality parameter towards a target output size.

use crate::constants::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, SEARCH_INITIAL_BEST_QUALITY, SEARCH_MAX_QUALITY,
    SEARCH_MIN_QUALITY, SEARCH_MIN_RANGE,
};
use crate::estimate::scratch_path_for;
use crate::processing::{CompressionResult, CompressionSettings, Compressor, ImageCodec};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub max_iterations: usize,
    /// Accepted relative distance from the target, e.g. `0.05` for 5%.
    pub tolerance: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Result of the final, persisted compression.
    pub result: CompressionResult,
    pub quality: u8,
    /// Number of scratch probes run before the final compression.
    pub probes: usize,
    /// The input was already small enough and nothing was written.
    pub skipped: bool,
}

/// Bookkeeping for one search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub low: u8,
    pub high: u8,
    pub best_quality: u8,
    pub best_size: u64,
    pub target_bytes: u64,
    pub tolerance: f64,
    pub iteration: usize,
}

impl SearchState {
    pub fn new(original_size: u64, target_bytes: u64, tolerance: f64) -> Self {
        Self {
            low: SEARCH_MIN_QUALITY,
            high: SEARCH_MAX_QUALITY,
            best_quality: SEARCH_INITIAL_BEST_QUALITY,
            best_size: original_size,
            target_bytes,
            tolerance,
            iteration: 0,
        }
    }

    /// Quality to probe next, or `None` once the range is too narrow.
    pub fn next_probe(&self) -> Option<u8> {
        if self.high.saturating_sub(self.low) <= SEARCH_MIN_RANGE {
            return None;
        }
        Some(((u16::from(self.low) + u16::from(self.high)) / 2) as u8)
    }

    /// A failed probe is treated as too aggressive.
    pub fn record_failure(&mut self, quality: u8) {
        self.high = quality.saturating_sub(1);
    }

    /// Records a measured size. Returns `true` when it is within tolerance
    /// and the search should stop.
    pub fn record(&mut self, quality: u8, size: u64) -> bool {
        if self.within_tolerance(size) {
            self.best_quality = quality;
            self.best_size = size;
            return true;
        }

        if size > self.target_bytes {
            self.high = quality.saturating_sub(1);
        } else {
            self.low = quality.saturating_add(1);
        }

        if size.abs_diff(self.target_bytes) < self.best_size.abs_diff(self.target_bytes) {
            self.best_quality = quality;
            self.best_size = size;
        }
        false
    }

    fn within_tolerance(&self, size: u64) -> bool {
        let distance = size.abs_diff(self.target_bytes) as f64;
        distance / self.target_bytes as f64 <= self.tolerance
    }
}

/// Finds the quality whose output lands closest to `target_bytes`, then
/// writes `output` once at that quality.
///
/// Inputs already at or below the target are left alone: the outcome reports
/// the original size at quality 100 and no codec call is made. The returned
/// size is best effort and may miss the tolerance.
pub fn search_quality_with<C: Compressor + ?Sized>(
    compressor: &C,
    input: &Path,
    output: &Path,
    target_bytes: u64,
    options: &SearchOptions,
    settings: &CompressionSettings,
) -> SearchOutcome {
    let original_size = match fs::metadata(input) {
        Ok(meta) => meta.len(),
        Err(e) => {
            crate::warn!("Cannot read {:?}: {}", input, e);
            return SearchOutcome {
                result: CompressionResult::failed(e.to_string()),
                quality: SEARCH_MAX_QUALITY,
                probes: 0,
                skipped: false,
            };
        }
    };

    if target_bytes == 0 {
        return SearchOutcome {
            result: CompressionResult::failed("target size must be greater than 0"),
            quality: SEARCH_MAX_QUALITY,
            probes: 0,
            skipped: false,
        };
    }

    if original_size <= target_bytes {
        return SearchOutcome {
            result: CompressionResult::succeeded(original_size),
            quality: SEARCH_MAX_QUALITY,
            probes: 0,
            skipped: true,
        };
    }

    let mut state = SearchState::new(original_size, target_bytes, options.tolerance);

    while state.iteration < options.max_iterations {
        let Some(quality) = state.next_probe() else {
            break;
        };
        state.iteration += 1;

        let probe = probe_size(compressor, input, &settings.with_quality(quality));
        crate::verbose!(
            "Probe {}: quality {} -> {:?} (target {} bytes)",
            state.iteration,
            quality,
            probe,
            target_bytes
        );

        match probe {
            Some(size) => {
                if state.record(quality, size) {
                    break;
                }
            }
            None => state.record_failure(quality),
        }
    }

    let result = compressor.compress(input, output, &settings.with_quality(state.best_quality));
    SearchOutcome {
        result,
        quality: state.best_quality,
        probes: state.iteration,
        skipped: false,
    }
}

/// Target-size search with the production codec.
pub fn search_quality(
    input: &Path,
    output: &Path,
    target_bytes: u64,
    options: &SearchOptions,
    settings: &CompressionSettings,
) -> SearchOutcome {
    search_quality_with(&ImageCodec, input, output, target_bytes, options, settings)
}

fn probe_size<C: Compressor + ?Sized>(
    compressor: &C,
    input: &Path,
    settings: &CompressionSettings,
) -> Option<u64> {
    let scratch = scratch_path_for(input).ok()?;
    let result = compressor.compress(input, &scratch, settings);
    if let Err(e) = scratch.close() {
        crate::verbose!("Scratch file cleanup failed: {}", e);
    }
    if result.is_success() && result.bytes > 0 {
        Some(result.bytes)
    } else {
        None
    }
}
