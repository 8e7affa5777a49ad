//! Background execution for interactive front ends.
//!
//! A `Session` owns a small worker pool and an event queue. The front end
//! submits work and polls events; workers never touch front-end state.

use crate::batch::{
    batch_compress_with, batch_root, collect_image_files, compress_file_with, BatchOptions, BatchReport,
};
use crate::constants::{DEBOUNCE_WINDOW, MAX_WORKERS};
use crate::debounce::Debouncer;
use crate::error::{CompressionError, Result};
use crate::estimate::{estimate_folder_size_with, estimate_size_with};
use crate::processing::{CompressionRequest, CompressionResult, CompressionSettings, Compressor, ImageCodec};
use crate::search::SearchOptions;
use crossbeam_channel::{unbounded, Receiver, Sender};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub workers: usize,
    pub debounce_window: Duration,
    pub search: SearchOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().clamp(1, MAX_WORKERS),
            debounce_window: DEBOUNCE_WINDOW,
            search: SearchOptions::default(),
        }
    }
}

/// Work that occupies the session until it completes.
#[derive(Debug, Clone)]
pub enum Job {
    Compress(CompressionRequest),
    CompressToTarget {
        request: CompressionRequest,
        target_bytes: u64,
    },
    Batch {
        /// Directory, single file or glob pattern.
        input: String,
        options: BatchOptions,
        settings: CompressionSettings,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Estimated {
        path: PathBuf,
        bytes: u64,
    },
    Compressed {
        input: PathBuf,
        output: PathBuf,
        original_bytes: u64,
        result: CompressionResult,
    },
    /// A target-size compression finished at `quality`.
    TargetReached {
        input: PathBuf,
        output: PathBuf,
        original_bytes: u64,
        result: CompressionResult,
        quality: u8,
    },
    BatchStarted {
        total: usize,
    },
    BatchProgress {
        done: usize,
        total: usize,
        total_bytes: u64,
    },
    BatchFinished(BatchReport),
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone)]
struct EstimateRequest {
    path: PathBuf,
    settings: CompressionSettings,
}

/// Clears the busy flag when the job ends, including by panic.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Session<C: Compressor + 'static = ImageCodec> {
    codec: Arc<C>,
    pool: Arc<ThreadPool>,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
    busy: Arc<AtomicBool>,
    estimator: Debouncer<EstimateRequest>,
    config: SessionConfig,
}

impl Session<ImageCodec> {
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_compressor(ImageCodec, config)
    }
}

impl<C: Compressor + 'static> Session<C> {
    pub fn with_compressor(codec: C, config: SessionConfig) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|i| format!("img-shrink-worker-{}", i))
            .build()
            .map_err(|e| CompressionError::WorkerPool(e.to_string()))?;
        let pool = Arc::new(pool);
        let codec = Arc::new(codec);
        let (events_tx, events_rx) = unbounded();

        let estimator = {
            let pool = Arc::clone(&pool);
            let codec = Arc::clone(&codec);
            let events = events_tx.clone();
            Debouncer::new(config.debounce_window, move |request: EstimateRequest| {
                let codec = Arc::clone(&codec);
                let events = events.clone();
                pool.spawn(move || {
                    let bytes = run_estimate(codec.as_ref(), &request.path, &request.settings);
                    let _ = events.send(SessionEvent::Estimated {
                        path: request.path,
                        bytes,
                    });
                });
            })
        };

        Ok(Self {
            codec,
            pool,
            events_tx,
            events_rx,
            busy: Arc::new(AtomicBool::new(false)),
            estimator,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Starts `job` on a worker. Fails with [`CompressionError::Busy`] while
    /// another job is still running; nothing is queued.
    pub fn submit(&self, job: Job) -> Result<()> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CompressionError::Busy);
        }

        let guard = BusyGuard(Arc::clone(&self.busy));
        let codec = Arc::clone(&self.codec);
        let events = self.events_tx.clone();
        let search = self.config.search;

        self.pool.spawn(move || {
            let final_event = run_job(codec.as_ref(), job, &search, &events);
            drop(guard);
            let _ = events.send(final_event);
        });
        Ok(())
    }

    /// Asks for a size estimate. Bursts are debounced; only the last request
    /// of a burst is computed.
    pub fn request_estimate(&self, path: impl Into<PathBuf>, settings: CompressionSettings) {
        self.estimator.call(EstimateRequest {
            path: path.into(),
            settings,
        });
    }

    pub fn try_event(&self) -> Option<SessionEvent> {
        self.events_rx.try_recv().ok()
    }

    pub fn wait_event(&self, timeout: Duration) -> Option<SessionEvent> {
        self.events_rx.recv_timeout(timeout).ok()
    }

    /// Raw event queue, for use with `crossbeam_channel::select!`.
    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events_rx
    }
}

fn run_estimate<C: Compressor + ?Sized>(codec: &C, path: &Path, settings: &CompressionSettings) -> u64 {
    if path.is_dir() {
        estimate_folder_size_with(codec, path, settings).unwrap_or_else(|e| {
            crate::warn!("Folder estimate for {:?} failed: {}", path, e);
            0
        })
    } else {
        estimate_size_with(codec, path, settings)
    }
}

fn run_job<C: Compressor + ?Sized>(
    codec: &C,
    job: Job,
    search: &SearchOptions,
    events: &Sender<SessionEvent>,
) -> SessionEvent {
    match job {
        Job::Compress(request) => compress_single(codec, request, None, search),
        Job::CompressToTarget {
            request,
            target_bytes,
        } => compress_single(codec, request, Some(target_bytes), search),
        Job::Batch {
            input,
            options,
            settings,
        } => match run_batch(codec, &input, &options, &settings, events) {
            Ok(report) => SessionEvent::BatchFinished(report),
            Err(e) => SessionEvent::Failed {
                message: e.to_string(),
            },
        },
    }
}

fn compress_single<C: Compressor + ?Sized>(
    codec: &C,
    request: CompressionRequest,
    target_bytes: Option<u64>,
    search: &SearchOptions,
) -> SessionEvent {
    let original_bytes = fs::metadata(&request.input).map(|m| m.len()).unwrap_or(0);
    let outcome = compress_file_with(
        codec,
        &request.input,
        &request.output,
        &request.settings,
        target_bytes,
        search,
    );
    match outcome.searched_quality {
        Some(quality) => SessionEvent::TargetReached {
            input: request.input,
            output: request.output,
            original_bytes,
            result: outcome.result,
            quality,
        },
        None => SessionEvent::Compressed {
            input: request.input,
            output: request.output,
            original_bytes,
            result: outcome.result,
        },
    }
}

fn run_batch<C: Compressor + ?Sized>(
    codec: &C,
    input: &str,
    options: &BatchOptions,
    settings: &CompressionSettings,
    events: &Sender<SessionEvent>,
) -> Result<BatchReport> {
    let files = collect_image_files(input, true)?;
    if files.is_empty() {
        return Err(CompressionError::NoImageFilesFound(input.to_string()));
    }
    let root = batch_root(input, &files);

    let _ = events.send(SessionEvent::BatchStarted { total: files.len() });
    batch_compress_with(codec, &files, root.as_deref(), options, settings, |done, total, total_bytes| {
        let _ = events.send(SessionEvent::BatchProgress {
            done,
            total,
            total_bytes,
        });
    })
}
