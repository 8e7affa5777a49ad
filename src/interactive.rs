//! Line-driven tuning front end over a [`Session`].
//!
//! Each settings change schedules a debounced estimate; `compress` submits a
//! job and is refused while one is already running.

use crate::batch::{generate_output_path, BatchOptions};
use crate::error::{CompressionError, Result};
use crate::processing::{CompressionRequest, CompressionSettings, Compressor};
use crate::session::{Job, Session, SessionEvent};
use crate::utils::{calculate_compression_ratio, format_file_size};
use crate::validation::TargetSize;
use crossbeam_channel::{select, Receiver};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const HELP_TEXT: &str = "\
Commands:
  quality N          set JPEG quality (0-100)
  scale N            set resize scale in percent (10-100)
  grayscale on|off   convert the lower half to grayscale
  reduce on|off      reduce to a small palette (PNG output)
  extreme on|off     extreme compression
  target SIZE|off    search quality towards SIZE (e.g. 200KB, 1.5MB)
  output DIR         write results under DIR
  compress           run with the current settings
  status             show the current settings
  help               show this text
  quit               wait for running work and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quality(u8),
    Scale(u8),
    Grayscale(bool),
    Reduce(bool),
    Extreme(bool),
    Target(Option<TargetSize>),
    Output(PathBuf),
    Compress,
    Status,
    Help,
    Quit,
}

fn parse_switch(value: Option<&str>, line: &str) -> Result<bool> {
    match value.map(str::to_lowercase).as_deref() {
        Some("on") | Some("true") | Some("yes") => Ok(true),
        Some("off") | Some("false") | Some("no") => Ok(false),
        _ => Err(CompressionError::InvalidCommand(format!(
            "'{}' expects on or off",
            line
        ))),
    }
}

fn parse_number(value: Option<&str>, line: &str) -> Result<u8> {
    value
        .and_then(|v| v.parse::<u8>().ok())
        .ok_or_else(|| CompressionError::InvalidCommand(format!("'{}' expects a number", line)))
}

impl FromStr for Command {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        let line = s.trim();
        let mut parts = line.splitn(2, char::is_whitespace);
        let keyword = parts.next().unwrap_or_default().to_lowercase();
        let rest = parts.next().map(str::trim).filter(|r| !r.is_empty());

        match keyword.as_str() {
            "quality" | "q" => parse_number(rest, line).map(Command::Quality),
            "scale" | "s" => parse_number(rest, line).map(Command::Scale),
            "grayscale" => parse_switch(rest, line).map(Command::Grayscale),
            "reduce" => parse_switch(rest, line).map(Command::Reduce),
            "extreme" => parse_switch(rest, line).map(Command::Extreme),
            "target" | "t" => match rest {
                Some(v) if v.eq_ignore_ascii_case("off") => Ok(Command::Target(None)),
                Some(v) => v.parse().map(|t| Command::Target(Some(t))),
                None => Err(CompressionError::InvalidCommand(
                    "'target' expects a size or off".to_string(),
                )),
            },
            "output" | "o" => rest
                .map(|dir| Command::Output(PathBuf::from(dir)))
                .ok_or_else(|| CompressionError::InvalidCommand("'output' expects a directory".to_string())),
            "compress" | "c" | "go" => Ok(Command::Compress),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            "" => Err(CompressionError::InvalidCommand("empty command".to_string())),
            other => Err(CompressionError::InvalidCommand(format!(
                "unknown command '{}', type help",
                other
            ))),
        }
    }
}

/// Settings being tuned for one input file or folder.
#[derive(Debug, Clone)]
pub struct TuneState {
    pub input: PathBuf,
    pub settings: CompressionSettings,
    pub target: Option<TargetSize>,
    pub output_dir: Option<PathBuf>,
    pub last_estimate: Option<u64>,
}

impl TuneState {
    pub fn new(input: impl Into<PathBuf>, settings: CompressionSettings) -> Self {
        Self {
            input: input.into(),
            settings,
            target: None,
            output_dir: None,
            last_estimate: None,
        }
    }

    /// Applies a settings command. Returns `true` when the estimate is stale.
    pub fn apply(&mut self, command: &Command) -> Result<bool> {
        let s = self.settings;
        let updated = match command {
            Command::Quality(q) => CompressionSettings::new(
                Some(*q),
                Some(s.resize_scale),
                s.grayscale,
                s.reduce_colors,
                s.extreme,
            )?,
            Command::Scale(scale) => CompressionSettings::new(
                Some(s.quality),
                Some(*scale),
                s.grayscale,
                s.reduce_colors,
                s.extreme,
            )?,
            Command::Grayscale(on) => CompressionSettings { grayscale: *on, ..s },
            Command::Reduce(on) => CompressionSettings { reduce_colors: *on, ..s },
            Command::Extreme(on) => CompressionSettings { extreme: *on, ..s },
            Command::Target(target) => {
                self.target = *target;
                return Ok(false);
            }
            Command::Output(dir) => {
                self.output_dir = Some(dir.clone());
                return Ok(false);
            }
            Command::Compress | Command::Status | Command::Help | Command::Quit => return Ok(false),
        };

        let changed = updated != self.settings;
        self.settings = updated;
        Ok(changed)
    }

    /// The job `compress` submits for the current state.
    pub fn job(&self) -> Result<Job> {
        let target_bytes = self.target.map(|t| t.bytes());

        if self.input.is_dir() {
            return Ok(Job::Batch {
                input: self.input.to_string_lossy().to_string(),
                options: BatchOptions {
                    output_dir: self.output_dir.clone(),
                    target_bytes,
                    ..BatchOptions::default()
                },
                settings: self.settings,
            });
        }

        let output = generate_output_path(&self.input, None, self.output_dir.as_deref())?;
        let request = CompressionRequest::new(&self.input, output, self.settings);
        Ok(match target_bytes {
            Some(target_bytes) => Job::CompressToTarget {
                request,
                target_bytes,
            },
            None => Job::Compress(request),
        })
    }

    pub fn describe(&self) -> String {
        let s = self.settings.effective();
        let mut text = format!(
            "{:?}: quality {}, scale {}%, grayscale {}, reduce colors {}, extreme {}",
            self.input,
            s.quality,
            s.resize_scale,
            on_off(s.grayscale),
            on_off(s.reduce_colors),
            on_off(s.extreme)
        );
        if let Some(target) = self.target {
            text.push_str(&format!(", target {}", target));
        }
        if let Some(dir) = &self.output_dir {
            text.push_str(&format!(", output {:?}", dir));
        }
        match self.last_estimate {
            Some(0) => text.push_str(", estimate failed"),
            Some(bytes) => text.push_str(&format!(", estimate {}", format_file_size(bytes))),
            None => {}
        }
        text
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// One-line rendering of a session event.
pub fn describe_event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Estimated { bytes: 0, path } => format!("⚠️  Estimate failed for {:?}", path),
        SessionEvent::Estimated { bytes, .. } => format!("📏 Estimated size: {}", format_file_size(*bytes)),
        SessionEvent::Compressed {
            output,
            original_bytes,
            result,
            ..
        } => describe_result(output, *original_bytes, result.bytes, result.error.as_deref(), None),
        SessionEvent::TargetReached {
            output,
            original_bytes,
            result,
            quality,
            ..
        } => describe_result(
            output,
            *original_bytes,
            result.bytes,
            result.error.as_deref(),
            Some(*quality),
        ),
        SessionEvent::BatchStarted { total } => format!("📁 Compressing {} images", total),
        SessionEvent::BatchProgress {
            done,
            total,
            total_bytes,
        } => format!("   {}/{} done, {} so far", done, total, format_file_size(*total_bytes)),
        SessionEvent::BatchFinished(report) => format!(
            "✅ Batch finished: {} processed, {} failed, total {}",
            report.processed,
            report.failed,
            format_file_size(report.total_bytes)
        ),
        SessionEvent::Failed { message } => format!("❌ {}", message),
    }
}

fn describe_result(
    output: &std::path::Path,
    original: u64,
    compressed: u64,
    error: Option<&str>,
    quality: Option<u8>,
) -> String {
    if let Some(err) = error {
        return format!("❌ Compression failed: {}", err);
    }
    let mut text = format!(
        "✅ Saved {:?}: {} -> {} ({:.1}% smaller)",
        output,
        format_file_size(original),
        format_file_size(compressed),
        calculate_compression_ratio(original, compressed)
    );
    if let Some(q) = quality {
        text.push_str(&format!(" at quality {}", q));
    }
    text
}

/// Runs the tuning loop until `quit` or the end of `commands`.
///
/// Session events are written to `out` as they arrive. On exit, waits for a
/// running job to finish so its result is not lost.
pub fn run_tune<C, W>(
    session: &Session<C>,
    state: &mut TuneState,
    commands: &Receiver<String>,
    out: &mut W,
) -> Result<()>
where
    C: Compressor + 'static,
    W: Write,
{
    writeln!(out, "{}", state.describe())?;
    session.request_estimate(&state.input, state.settings);

    loop {
        select! {
            recv(commands) -> line => {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if !handle_line(session, state, &line, out)? {
                    break;
                }
            }
            recv(session.events()) -> event => {
                let event = event.map_err(|_| CompressionError::SessionClosed)?;
                record_event(state, &event, out)?;
            }
        }
    }

    while session.is_busy() {
        if let Some(event) = session.wait_event(Duration::from_millis(100)) {
            record_event(state, &event, out)?;
        }
    }
    while let Some(event) = session.wait_event(Duration::from_millis(100)) {
        record_event(state, &event, out)?;
    }
    Ok(())
}

/// Returns `false` when the loop should stop.
fn handle_line<C, W>(session: &Session<C>, state: &mut TuneState, line: &str, out: &mut W) -> Result<bool>
where
    C: Compressor + 'static,
    W: Write,
{
    let command = match line.parse::<Command>() {
        Ok(command) => command,
        Err(e) => {
            writeln!(out, "⚠️  {}", e)?;
            return Ok(true);
        }
    };

    match command {
        Command::Quit => return Ok(false),
        Command::Help => writeln!(out, "{}", HELP_TEXT)?,
        Command::Status => writeln!(out, "{}", state.describe())?,
        Command::Compress => {
            if state.settings.extreme {
                writeln!(out, "⚠️  Extreme mode may noticeably reduce image quality")?;
            }
            match state.job().and_then(|job| session.submit(job)) {
                Ok(()) => writeln!(out, "🔄 Compressing...")?,
                Err(e) => writeln!(out, "⚠️  {}", e)?,
            }
        }
        other => match state.apply(&other) {
            Ok(true) => session.request_estimate(&state.input, state.settings),
            Ok(false) => {}
            Err(e) => writeln!(out, "⚠️  {}", e)?,
        },
    }
    Ok(true)
}

fn record_event<W: Write>(state: &mut TuneState, event: &SessionEvent, out: &mut W) -> Result<()> {
    if let SessionEvent::Estimated { path, bytes } = event {
        if *path != state.input {
            return Ok(());
        }
        state.last_estimate = Some(*bytes);
    }
    writeln!(out, "{}", describe_event(event))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::CompressionResult;
    use crate::session::SessionConfig;
    use crossbeam_channel::unbounded;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct EchoCodec;

    impl Compressor for EchoCodec {
        fn compress(&self, input: &Path, output: &Path, _: &CompressionSettings) -> CompressionResult {
            match fs::copy(input, output) {
                Ok(bytes) => CompressionResult::succeeded(bytes / 2),
                Err(e) => CompressionResult::failed(e.to_string()),
            }
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("quality 55".parse::<Command>().unwrap(), Command::Quality(55));
        assert_eq!("  SCALE 40 ".parse::<Command>().unwrap(), Command::Scale(40));
        assert_eq!("grayscale on".parse::<Command>().unwrap(), Command::Grayscale(true));
        assert_eq!("reduce off".parse::<Command>().unwrap(), Command::Reduce(false));
        assert_eq!("extreme yes".parse::<Command>().unwrap(), Command::Extreme(true));
        assert_eq!("target off".parse::<Command>().unwrap(), Command::Target(None));
        assert_eq!(
            "target 200KB".parse::<Command>().unwrap(),
            Command::Target(Some(TargetSize::from_bytes(200 * 1024).unwrap()))
        );
        assert_eq!(
            "output out dir".parse::<Command>().unwrap(),
            Command::Output(PathBuf::from("out dir"))
        );
        assert_eq!("compress".parse::<Command>().unwrap(), Command::Compress);
        assert_eq!("quit".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for line in ["", "quality", "quality abc", "quality 300", "grayscale maybe", "target 0", "target", "dance"] {
            assert!(line.parse::<Command>().is_err(), "accepted {:?}", line);
        }
    }

    #[test]
    fn test_apply_validates_ranges() {
        let mut state = TuneState::new("a.jpg", CompressionSettings::default());
        assert!(state.apply(&Command::Quality(40)).unwrap());
        assert_eq!(state.settings.quality, 40);
        assert!(!state.apply(&Command::Quality(40)).unwrap());

        assert!(state.apply(&Command::Scale(5)).is_err());
        assert_eq!(state.settings.resize_scale, 100);

        assert!(!state.apply(&Command::Target(TargetSize::from_bytes(10).ok())).unwrap());
        assert_eq!(state.target.map(|t| t.bytes()), Some(10));
    }

    #[test]
    fn test_job_for_file_and_folder() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("cat.jpg");
        fs::write(&file, b"x").unwrap();

        let mut state = TuneState::new(&file, CompressionSettings::default());
        match state.job().unwrap() {
            Job::Compress(request) => {
                assert_eq!(request.output, temp_dir.path().join("compressed_cat.jpg"))
            }
            other => panic!("unexpected job {:?}", other),
        }

        state.target = TargetSize::from_bytes(500).ok();
        assert!(matches!(
            state.job().unwrap(),
            Job::CompressToTarget { target_bytes: 500, .. }
        ));

        let folder = TuneState::new(temp_dir.path(), CompressionSettings::default());
        assert!(matches!(folder.job().unwrap(), Job::Batch { .. }));
    }

    #[test]
    fn test_describe_event_marks_failed_estimate() {
        let failed = SessionEvent::Estimated {
            path: PathBuf::from("a.jpg"),
            bytes: 0,
        };
        assert!(describe_event(&failed).contains("failed"));

        let ok = SessionEvent::Estimated {
            path: PathBuf::from("a.jpg"),
            bytes: 2048,
        };
        assert_eq!(describe_event(&ok), "📏 Estimated size: 2.00 KB");
    }

    #[test]
    fn test_run_tune_compresses_and_waits() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("photo.jpg");
        fs::write(&input, vec![1u8; 400]).unwrap();

        let config = SessionConfig {
            workers: 2,
            debounce_window: Duration::from_millis(20),
            ..SessionConfig::default()
        };
        let session = Session::with_compressor(EchoCodec, config).unwrap();
        let mut state = TuneState::new(&input, CompressionSettings::default());

        let (tx, rx) = unbounded();
        for line in ["bogus", "quality 50", "compress", "quit"] {
            tx.send(line.to_string()).unwrap();
        }

        let mut out = Vec::new();
        run_tune(&session, &mut state, &rx, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(state.settings.quality, 50);
        assert!(text.contains("unknown command"));
        assert!(text.contains("Saved"));
        assert!(temp_dir.path().join("compressed_photo.jpg").exists());
        assert!(!session.is_busy());
    }
}
