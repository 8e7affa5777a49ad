use anyhow::{bail, Context, Result};
use clap::Parser;
use crossbeam_channel::unbounded;
use img_shrink::batch::{compress_file_with, generate_output_path, BatchOptions};
use img_shrink::cli::{Args, Commands, TuningArgs};
use img_shrink::estimate::{estimate_folder_size, estimate_size};
use img_shrink::interactive::{run_tune, TuneState, HELP_TEXT};
use img_shrink::logger;
use img_shrink::processing::{CompressionSettings, ImageCodec};
use img_shrink::search::SearchOptions;
use img_shrink::session::{Job, Session, SessionConfig, SessionEvent};
use img_shrink::utils::{create_progress_bar, create_progress_spinner, format_file_size, print_compression_result};
use img_shrink::validation::{validate_input_path, validate_output_dir, InputMode, TargetSize};
use img_shrink::{info, warn};
use indicatif::{ProgressBar, ProgressDrawTarget};
use rayon::ThreadPoolBuilder;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::thread;

fn main() -> Result<()> {
    let args = Args::parse();
    logger::set_quiet_mode(args.quiet);
    logger::set_verbose_mode(args.verbose);

    setup_thread_pool(args.threads);
    let config = session_config(args.threads);

    match args.command {
        Commands::Compress { input, output, tuning } => run_compress(&input, output.as_deref(), &tuning),
        Commands::Batch { input, output, tuning } => run_batch(input, output.as_deref(), &tuning, config),
        Commands::Estimate { input, tuning } => run_estimate(&input, &tuning),
        Commands::Tune { input, output, tuning } => run_tune_mode(input, output.as_deref(), &tuning, config),
    }
}

fn setup_thread_pool(threads: Option<usize>) {
    if let Some(num_threads) = threads {
        ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .unwrap_or_else(|e| {
                warn!("Failed to set thread pool size: {}", e);
            });
    }
}

fn session_config(threads: Option<usize>) -> SessionConfig {
    let default = SessionConfig::default();
    SessionConfig {
        workers: threads.unwrap_or(default.workers),
        ..default
    }
}

fn settings_from(tuning: &TuningArgs) -> Result<CompressionSettings> {
    let settings = CompressionSettings::new(
        tuning.quality,
        tuning.scale,
        tuning.grayscale,
        tuning.reduce_colors,
        tuning.extreme,
    )?;
    if settings.extreme {
        warn!("Extreme mode caps the scale at 70% and may noticeably reduce image quality");
    }
    Ok(settings)
}

fn target_from(tuning: &TuningArgs) -> Result<Option<TargetSize>> {
    Ok(tuning
        .target
        .as_deref()
        .map(str::parse::<TargetSize>)
        .transpose()?)
}

fn output_dir_from(output: Option<&Path>) -> Result<Option<PathBuf>> {
    Ok(output.map(validate_output_dir).transpose()?)
}

fn hide_when_quiet(pb: &ProgressBar) {
    if logger::is_quiet() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
}

fn run_compress(input: &Path, output: Option<&Path>, tuning: &TuningArgs) -> Result<()> {
    if validate_input_path(Some(input))? != InputMode::File {
        bail!("{:?} is a folder, use the batch command", input);
    }
    let settings = settings_from(tuning)?;
    let target = target_from(tuning)?;
    let output_dir = output_dir_from(output)?;
    let output = generate_output_path(input, None, output_dir.as_deref())?;

    info!("🔄 Compressing {:?}", input);
    let original_size = fs::metadata(input)
        .with_context(|| format!("Cannot read {:?}", input))?
        .len();

    let spinner = create_progress_spinner("Compressing...");
    hide_when_quiet(&spinner);
    let outcome = compress_file_with(
        &ImageCodec,
        input,
        &output,
        &settings,
        target.map(|t| t.bytes()),
        &SearchOptions::default(),
    );
    spinner.finish_and_clear();

    if let Some(err) = outcome.result.error {
        bail!("Failed to compress {:?}: {}", input, err);
    }

    info!("💾 Saved to {:?}", output);
    if let (Some(quality), Some(target)) = (outcome.searched_quality, target) {
        info!("🎯 Target {} reached at quality {}", target, quality);
    }
    print_compression_result(original_size, outcome.result.bytes);
    Ok(())
}

fn run_batch(input: String, output: Option<&Path>, tuning: &TuningArgs, config: SessionConfig) -> Result<()> {
    let settings = settings_from(tuning)?;
    let target = target_from(tuning)?;
    let output_dir = output_dir_from(output)?;
    let session = Session::new(config)?;

    info!("📁 Batch compressing {}", input);
    session.submit(Job::Batch {
        input,
        options: BatchOptions {
            output_dir,
            target_bytes: target.map(|t| t.bytes()),
            ..BatchOptions::default()
        },
        settings,
    })?;

    let mut progress: Option<ProgressBar> = None;
    loop {
        let event = session.events().recv().context("Session event queue closed")?;
        match event {
            SessionEvent::BatchStarted { total } => {
                let pb = create_progress_bar(total as u64);
                hide_when_quiet(&pb);
                progress = Some(pb);
            }
            SessionEvent::BatchProgress {
                done, total_bytes, ..
            } => {
                if let Some(pb) = &progress {
                    pb.set_position(done as u64);
                    pb.set_message(format_file_size(total_bytes));
                }
            }
            SessionEvent::BatchFinished(report) => {
                if let Some(pb) = progress.take() {
                    pb.finish_and_clear();
                }
                info!(
                    "✅ Processed {} images ({} failed), total output {}",
                    report.processed,
                    report.failed,
                    format_file_size(report.total_bytes)
                );
                if report.failed > 0 {
                    warn!("{} images could not be compressed", report.failed);
                }
                return Ok(());
            }
            SessionEvent::Failed { message } => {
                if let Some(pb) = progress.take() {
                    pb.abandon();
                }
                bail!("Batch failed: {}", message);
            }
            _ => {}
        }
    }
}

fn run_estimate(input: &Path, tuning: &TuningArgs) -> Result<()> {
    let mode = validate_input_path(Some(input))?;
    let settings = settings_from(tuning)?;

    let spinner = create_progress_spinner("Estimating...");
    hide_when_quiet(&spinner);
    let estimate = match mode {
        InputMode::File => estimate_size(input, &settings),
        InputMode::Folder => estimate_folder_size(input, &settings)?,
    };
    spinner.finish_and_clear();

    if estimate == 0 {
        bail!("Could not estimate the compressed size of {:?}", input);
    }

    if mode == InputMode::File {
        let original_size = fs::metadata(input)?.len();
        print_compression_result(original_size, estimate);
    }
    info!("📏 Estimated size: {}", format_file_size(estimate));
    Ok(())
}

fn run_tune_mode(input: PathBuf, output: Option<&Path>, tuning: &TuningArgs, config: SessionConfig) -> Result<()> {
    validate_input_path(Some(&input))?;
    let settings = settings_from(tuning)?;
    let session = Session::new(config)?;

    let mut state = TuneState::new(input, settings);
    state.target = target_from(tuning)?;
    state.output_dir = output_dir_from(output)?;

    let (tx, rx) = unbounded();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    println!("{}", HELP_TEXT);
    run_tune(&session, &mut state, &rx, &mut io::stdout()).context("Interactive session failed")?;
    Ok(())
}
