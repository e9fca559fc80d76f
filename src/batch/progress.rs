//! Crop progress reporting.
//!
//! All run output goes through a [`ProgressReporter`]. The console reporter
//! prints coloured status lines to stderr; the JSON reporter emits one
//! object per line for tooling.
//!
//! # Example
//!
//! ```ignore
//! use portrait_crop::batch::progress::{ConsoleProgress, ProgressEvent, ProgressReporter};
//!
//! let reporter = ConsoleProgress::new();
//! reporter.report(ProgressEvent::RunStarted { total_pairs: 3, jobs: 8 });
//! reporter.report(ProgressEvent::Warning {
//!     target_id: Some("char_pack#2.json".to_string()),
//!     message: "atlas image 'char_pack#2.png' not found".to_string(),
//! });
//! ```

use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::batch::discovery::file_label;

/// Outcome of one sprite in progress events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpriteStatus {
    /// Portrait written to the given path
    Written(PathBuf),
    /// Extraction or encoding failed
    Failed(String),
}

impl std::fmt::Display for SpriteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpriteStatus::Written(path) => write!(f, "written: {}", path.display()),
            SpriteStatus::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Events that can be reported during a run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Pairs discovered, work about to start
    RunStarted {
        /// Number of atlas/metadata pairs
        total_pairs: usize,
        /// Worker threads
        jobs: usize,
    },
    /// A pair started cropping
    PairStarted {
        /// Metadata file name
        pair_id: String,
        /// Unique sprites to extract
        sprites: usize,
    },
    /// A metadata file or pair was skipped entirely
    FileSkipped { path: PathBuf, reason: String },
    /// A portrait hub was loaded and applied to the atlas metadata
    HubLoaded {
        /// Hub `_rootAtlasName`, when declared
        name: Option<String>,
        /// Sprite entries the hub lists
        listed: usize,
        /// Atlas sprites the hub lists
        matched: usize,
        /// Atlas sprites the hub does not list
        ignored: usize,
    },
    /// A later entry for an already seen sprite name was dropped
    DuplicateDropped { pair_id: String, sprite: String },
    /// One sprite finished
    SpriteCompleted {
        pair_id: String,
        sprite: String,
        status: SpriteStatus,
        duration_ms: u64,
    },
    /// All sprites of a pair finished
    PairCompleted {
        pair_id: String,
        extracted: usize,
        failed: usize,
        duration_ms: u64,
    },
    /// Run finished
    RunCompleted {
        /// Total duration in milliseconds
        duration_ms: u64,
        /// Portraits written
        extracted: usize,
        /// Sprites that failed
        failed: usize,
        /// Metadata files or pairs skipped entirely
        skipped_files: usize,
        /// Duplicate entries dropped
        duplicates: usize,
    },
    /// A warning was generated
    Warning {
        /// File or sprite that generated the warning (if applicable)
        target_id: Option<String>,
        /// Warning message
        message: String,
    },
    /// An error occurred
    Error {
        /// File or sprite that generated the error (if applicable)
        target_id: Option<String>,
        /// Error message
        message: String,
    },
}

/// Trait for progress reporters.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event.
    fn report(&self, event: ProgressEvent);
}

/// A progress reporter that discards all events.
#[derive(Debug, Default)]
pub struct NullProgress;

impl NullProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Console progress reporter with optional colors.
pub struct ConsoleProgress {
    use_colors: bool,
    verbose: bool,
    /// Pairs completed so far
    current: AtomicUsize,
    /// Pairs in this run
    total: AtomicUsize,
    /// Output writer (for testing)
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleProgress")
            .field("use_colors", &self.use_colors)
            .field("verbose", &self.verbose)
            .field("current", &self.current)
            .field("total", &self.total)
            .finish()
    }
}

impl ConsoleProgress {
    /// Create a console reporter on stderr, coloured when stderr is a terminal.
    pub fn new() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stderr),
            verbose: false,
            current: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            output: Mutex::new(Box::new(std::io::stderr())),
        }
    }

    /// Create a console progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self {
            use_colors: false,
            verbose: false,
            current: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            output: Mutex::new(Box::new(output)),
        }
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn color(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.color(text, "\x1b[32m")
    }

    fn yellow(&self, text: &str) -> String {
        self.color(text, "\x1b[33m")
    }

    fn red(&self, text: &str) -> String {
        self.color(text, "\x1b[31m")
    }

    fn cyan(&self, text: &str) -> String {
        self.color(text, "\x1b[36m")
    }

    fn bold(&self, text: &str) -> String {
        self.color(text, "\x1b[1m")
    }

    fn writeln(&self, line: &str) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{} {}", count, if count == 1 { one } else { many })
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { total_pairs, jobs } => {
                self.total.store(total_pairs, Ordering::SeqCst);
                self.current.store(0, Ordering::SeqCst);
                self.writeln(&format!(
                    "{} Cropping {} on {}...",
                    self.cyan("[crop]"),
                    plural(total_pairs, "atlas", "atlases"),
                    plural(jobs, "worker", "workers"),
                ));
            }
            ProgressEvent::PairStarted { pair_id, sprites } => {
                if self.verbose {
                    self.writeln(&format!(
                        "{} {}: {}",
                        self.cyan("[crop]"),
                        pair_id,
                        plural(sprites, "sprite", "sprites")
                    ));
                }
            }
            ProgressEvent::FileSkipped { path, reason } => {
                self.writeln(&format!(
                    "{} {}: skipped, {}",
                    self.yellow("[warn]"),
                    file_label(&path),
                    reason
                ));
            }
            ProgressEvent::HubLoaded { name, listed, matched, ignored } => {
                let name = name.map(|n| format!(" '{}'", n)).unwrap_or_default();
                self.writeln(&format!(
                    "{} Hub{}: {}/{} listed portraits found, {} ignored",
                    self.cyan("[crop]"),
                    name,
                    matched,
                    listed,
                    plural(ignored, "unlisted sprite", "unlisted sprites")
                ));
            }
            ProgressEvent::DuplicateDropped { pair_id, sprite } => {
                if self.verbose {
                    self.writeln(&format!(
                        "{} {}: duplicate entry '{}' ignored",
                        self.cyan("[crop]"),
                        pair_id,
                        sprite
                    ));
                }
            }
            ProgressEvent::SpriteCompleted { pair_id, sprite, status, duration_ms } => match status {
                SpriteStatus::Written(path) => {
                    if self.verbose {
                        self.writeln(&format!(
                            "{} {} {} -> {} ({})",
                            self.cyan("[crop]"),
                            self.green("ok"),
                            sprite,
                            path.display(),
                            format_duration(duration_ms)
                        ));
                    }
                }
                SpriteStatus::Failed(err) => {
                    self.writeln(&format!(
                        "{} {} {}/{}",
                        self.cyan("[crop]"),
                        self.red("FAILED"),
                        pair_id,
                        sprite
                    ));
                    self.writeln(&format!("        {}", self.red(&err)));
                }
            },
            ProgressEvent::PairCompleted { pair_id, extracted, failed, duration_ms } => {
                let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                let total = self.total.load(Ordering::SeqCst);
                let failures = if failed > 0 {
                    format!(", {}", self.red(&format!("{} failed", failed)))
                } else {
                    String::new()
                };
                self.writeln(&format!(
                    "{} [{}/{}] {}: {}{} ({})",
                    self.cyan("[crop]"),
                    current,
                    total,
                    pair_id,
                    plural(extracted, "portrait", "portraits"),
                    failures,
                    format_duration(duration_ms)
                ));
            }
            ProgressEvent::RunCompleted { duration_ms, extracted, failed, skipped_files, duplicates } => {
                let tag = if failed == 0 && skipped_files == 0 {
                    self.green("[done]")
                } else {
                    self.yellow("[done]")
                };
                self.writeln(&format!(
                    "\n{} {} written, {} failed, {} skipped, {} in {}",
                    tag,
                    self.bold(&plural(extracted, "portrait", "portraits")),
                    failed,
                    plural(skipped_files, "file", "files"),
                    plural(duplicates, "duplicate", "duplicates"),
                    format_duration(duration_ms)
                ));
            }
            ProgressEvent::Warning { target_id, message } => {
                let prefix = match target_id {
                    Some(id) => format!("{}: ", id),
                    None => String::new(),
                };
                self.writeln(&format!("{} {}{}", self.yellow("[warn]"), prefix, message));
            }
            ProgressEvent::Error { target_id, message } => {
                let prefix = match target_id {
                    Some(id) => format!("{}: ", id),
                    None => String::new(),
                };
                self.writeln(&format!("{} {}{}", self.red("[error]"), prefix, message));
            }
        }
    }
}

/// JSON progress reporter for machine-readable output.
pub struct JsonProgress {
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for JsonProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonProgress").finish()
    }
}

impl JsonProgress {
    /// Create a new JSON progress reporter writing to stderr.
    pub fn new() -> Self {
        Self { output: Mutex::new(Box::new(std::io::stderr())) }
    }

    /// Create a JSON progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { output: Mutex::new(Box::new(output)) }
    }

    fn write_json(&self, value: &serde_json::Value) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", value);
        }
    }
}

impl Default for JsonProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Attach `target_id` to a JSON event when present.
fn with_target(mut value: serde_json::Value, target_id: Option<String>) -> serde_json::Value {
    if let (Some(id), Some(map)) = (target_id, value.as_object_mut()) {
        map.insert("target_id".to_string(), json!(id));
    }
    value
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let value = match event {
            ProgressEvent::RunStarted { total_pairs, jobs } => {
                json!({"event": "run_started", "total_pairs": total_pairs, "jobs": jobs})
            }
            ProgressEvent::PairStarted { pair_id, sprites } => {
                json!({"event": "pair_started", "pair_id": pair_id, "sprites": sprites})
            }
            ProgressEvent::FileSkipped { path, reason } => json!({
                "event": "file_skipped",
                "path": path.display().to_string(),
                "reason": reason,
            }),
            ProgressEvent::HubLoaded { name, listed, matched, ignored } => json!({
                "event": "hub_loaded",
                "name": name,
                "listed": listed,
                "matched": matched,
                "ignored": ignored,
            }),
            ProgressEvent::DuplicateDropped { pair_id, sprite } => {
                json!({"event": "duplicate_dropped", "pair_id": pair_id, "sprite": sprite})
            }
            ProgressEvent::SpriteCompleted { pair_id, sprite, status, duration_ms } => {
                let mut value = json!({
                    "event": "sprite_completed",
                    "pair_id": pair_id,
                    "sprite": sprite,
                    "duration_ms": duration_ms,
                });
                if let Some(map) = value.as_object_mut() {
                    match status {
                        SpriteStatus::Written(path) => {
                            map.insert("status".to_string(), json!("written"));
                            map.insert("path".to_string(), json!(path.display().to_string()));
                        }
                        SpriteStatus::Failed(e) => {
                            map.insert("status".to_string(), json!("failed"));
                            map.insert("error".to_string(), json!(e));
                        }
                    }
                }
                value
            }
            ProgressEvent::PairCompleted { pair_id, extracted, failed, duration_ms } => json!({
                "event": "pair_completed",
                "pair_id": pair_id,
                "extracted": extracted,
                "failed": failed,
                "duration_ms": duration_ms,
            }),
            ProgressEvent::RunCompleted { duration_ms, extracted, failed, skipped_files, duplicates } => {
                json!({
                    "event": "run_completed",
                    "duration_ms": duration_ms,
                    "extracted": extracted,
                    "failed": failed,
                    "skipped_files": skipped_files,
                    "duplicates": duplicates,
                })
            }
            ProgressEvent::Warning { target_id, message } => {
                with_target(json!({"event": "warning", "message": message}), target_id)
            }
            ProgressEvent::Error { target_id, message } => {
                with_target(json!({"event": "error", "message": message}), target_id)
            }
        };
        self.write_json(&value);
    }
}

/// Progress tracker for aggregating run statistics.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    start_time: Option<Instant>,
    /// Pairs in this run
    total: usize,
    /// Pairs completed
    completed: usize,
    extracted: usize,
    failed: usize,
    skipped_files: usize,
    duplicates: usize,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a run.
    pub fn start(&mut self, total_pairs: usize) {
        *self = Self { start_time: Some(Instant::now()), total: total_pairs, ..Self::default() };
    }

    /// Fold an event into the counters.
    ///
    /// `RunStarted` sets the clock and pair total but keeps counts of
    /// files skipped during discovery.
    pub fn observe(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { total_pairs, .. } => {
                self.start_time = Some(Instant::now());
                self.total = *total_pairs;
            }
            ProgressEvent::FileSkipped { .. } => self.skipped_files += 1,
            ProgressEvent::DuplicateDropped { .. } => self.duplicates += 1,
            ProgressEvent::SpriteCompleted { status, .. } => match status {
                SpriteStatus::Written(_) => self.extracted += 1,
                SpriteStatus::Failed(_) => self.failed += 1,
            },
            ProgressEvent::PairCompleted { .. } => self.completed += 1,
            _ => {}
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Percentage of pairs completed.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    pub fn extracted(&self) -> usize {
        self.extracted
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn skipped_files(&self) -> usize {
        self.skipped_files
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Generate a RunCompleted event from current state.
    pub fn run_completed_event(&self) -> ProgressEvent {
        ProgressEvent::RunCompleted {
            duration_ms: self.elapsed_ms(),
            extracted: self.extracted,
            failed: self.failed,
            skipped_files: self.skipped_files,
            duplicates: self.duplicates,
        }
    }
}

/// Format a duration in milliseconds to a human-readable string.
pub(crate) fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60_000;
        let seconds = (ms % 60_000) / 1000;
        format!("{}m {}s", minutes, seconds)
    }
}
