//! Crop pipeline orchestration.
//!
//! The pipeline discovers input pairs, then fans the work out over a
//! bounded rayon pool: pairs run in parallel and, inside each pair, every
//! sprite is an independent unit reading the shared atlas. A unit that
//! fails or panics is recorded and the rest of the run continues.

use crate::atlas::load_atlas;
use crate::batch::{
    discover_pairs, CropContext, CropResult, DiscoveryError, HubCoverage, InputPair, NullProgress,
    ProgressEvent, ProgressReporter, ProgressTracker, SkippedFile, SpriteResult, SpriteStatus,
};
use crate::dedup::{dedup, ClaimedNames, DedupOutcome};
use crate::extract::extract_sprite;
use crate::models::{Origin, SpriteDescriptor};
use crate::output::OutputWriter;
use image::RgbaImage;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;

/// Error that stops a run.
#[derive(Debug, Error)]
pub enum CropError {
    /// Nothing usable was found
    #[error("no atlas/metadata pairs found in {}", .metadata_dir.display())]
    NoInputPairs { metadata_dir: PathBuf },
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("cannot create output directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Per-pair outcome before it is folded into the run result.
#[derive(Debug, Default)]
struct PairOutcome {
    sprites: Vec<SpriteResult>,
    skipped: Option<SkippedFile>,
    duplicates: usize,
}

/// Forwards events to the caller's reporter while keeping run totals.
struct Tracked<'a> {
    inner: &'a dyn ProgressReporter,
    tracker: Mutex<ProgressTracker>,
}

impl Tracked<'_> {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut tracker) = self.tracker.lock() {
            tracker.observe(&event);
        }
        self.inner.report(event);
    }

    fn run_completed_event(&self) -> Option<ProgressEvent> {
        self.tracker.lock().ok().map(|t| t.run_completed_event())
    }
}

/// Crop pipeline for a complete run.
pub struct CropPipeline {
    context: CropContext,
    reporter: Arc<dyn ProgressReporter>,
}

impl CropPipeline {
    pub fn new(context: CropContext) -> Self {
        Self { context, reporter: Arc::new(NullProgress::new()) }
    }

    /// Set the progress reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn context(&self) -> &CropContext {
        &self.context
    }

    /// Run the crop.
    ///
    /// Fails only when no pair is usable or the run cannot start; every
    /// per-file and per-sprite problem is reported and recorded in the
    /// result instead.
    pub fn run(&self) -> Result<CropResult, CropError> {
        let start = Instant::now();
        let reporter = Tracked { inner: self.reporter.as_ref(), tracker: Mutex::default() };

        let mut discovery = discover_pairs(&self.context)?;
        for warning in &discovery.warnings {
            reporter.report(ProgressEvent::Warning { target_id: None, message: warning.clone() });
        }
        for skipped in &discovery.skipped {
            reporter.report(ProgressEvent::FileSkipped {
                path: skipped.path.clone(),
                reason: skipped.reason.clone(),
            });
        }
        if discovery.pairs.is_empty() {
            return Err(CropError::NoInputPairs { metadata_dir: self.context.metadata_dir() });
        }
        let hub = discovery.hub.as_ref().map(|hub| HubCoverage {
            name: hub.root_atlas_name().map(str::to_string),
            listed: hub.sprite_count(),
            matched: discovery.hub_kept,
            ignored: discovery.hub_dropped,
        });
        if let Some(hub) = &hub {
            reporter.report(ProgressEvent::HubLoaded {
                name: hub.name.clone(),
                listed: hub.listed,
                matched: hub.matched,
                ignored: hub.ignored,
            });
        }

        // Pairs run concurrently, so an output file belongs to the first
        // pair (in discovery order) that names it.
        let mut claimed = ClaimedNames::new();
        let mut claimed_elsewhere = 0;
        for pair in &mut discovery.pairs {
            for sprite in claimed.claim(&mut pair.metadata.sprites) {
                claimed_elsewhere += 1;
                reporter.report(ProgressEvent::DuplicateDropped { pair_id: pair.id(), sprite: sprite.name });
            }
        }

        let out_dir = self.context.out_dir();
        std::fs::create_dir_all(&out_dir)
            .map_err(|source| CropError::Io { path: out_dir.clone(), source })?;

        let jobs = self.context.jobs();
        let pool = ThreadPoolBuilder::new().num_threads(jobs).build()?;
        reporter.report(ProgressEvent::RunStarted { total_pairs: discovery.pairs.len(), jobs });

        let writer = self.context.writer();
        let outcomes: Vec<PairOutcome> = pool.install(|| {
            discovery
                .pairs
                .par_iter()
                .map(|pair| crop_pair(pair, &out_dir, &writer, &reporter))
                .collect()
        });

        let mut result = CropResult::new();
        result.pairs = discovery.pairs.len();
        result.hub = hub;
        result.duplicates = claimed_elsewhere;
        for skipped in discovery.skipped {
            result.add_skipped(skipped);
        }
        for outcome in outcomes {
            result.duplicates += outcome.duplicates;
            if let Some(skipped) = outcome.skipped {
                result.add_skipped(skipped);
            }
            for sprite in outcome.sprites {
                result.add_sprite(sprite);
            }
        }

        if let Some(event) = reporter.run_completed_event() {
            reporter.report(event);
        }
        Ok(result.with_duration(start.elapsed()))
    }
}

/// Decode one atlas and crop every unique sprite of its metadata.
fn crop_pair(
    pair: &InputPair,
    out_dir: &Path,
    writer: &OutputWriter,
    reporter: &Tracked<'_>,
) -> PairOutcome {
    let start = Instant::now();
    let pair_id = pair.id();

    let atlas = match isolate(|| load_atlas(&pair.atlas).map_err(|e| e.to_string())) {
        Ok(atlas) => Arc::new(atlas),
        Err(reason) => {
            let skipped = SkippedFile { path: pair.metadata.source.clone(), reason };
            reporter.report(ProgressEvent::FileSkipped {
                path: skipped.path.clone(),
                reason: skipped.reason.clone(),
            });
            return PairOutcome { skipped: Some(skipped), ..Default::default() };
        }
    };

    let DedupOutcome { set, discarded } = dedup(pair.metadata.sprites.clone());
    for sprite in &discarded {
        reporter.report(ProgressEvent::DuplicateDropped {
            pair_id: pair_id.clone(),
            sprite: sprite.name.clone(),
        });
    }
    reporter.report(ProgressEvent::PairStarted { pair_id: pair_id.clone(), sprites: set.len() });

    let origin = pair.metadata.origin;
    let sprites: Vec<SpriteResult> = set
        .into_vec()
        .par_iter()
        .map_with(Arc::clone(&atlas), |atlas, sprite| {
            crop_sprite(atlas, sprite, origin, &pair_id, out_dir, writer, reporter)
        })
        .collect();

    let extracted = sprites.iter().filter(|s| s.is_success()).count();
    reporter.report(ProgressEvent::PairCompleted {
        pair_id,
        extracted,
        failed: sprites.len() - extracted,
        duration_ms: start.elapsed().as_millis() as u64,
    });

    PairOutcome { sprites, skipped: None, duplicates: discarded.len() }
}

/// Extract and write one sprite, isolating panics to this unit.
fn crop_sprite(
    atlas: &RgbaImage,
    sprite: &SpriteDescriptor,
    origin: Origin,
    pair_id: &str,
    out_dir: &Path,
    writer: &OutputWriter,
    reporter: &Tracked<'_>,
) -> SpriteResult {
    let start = Instant::now();

    let outcome = isolate(|| -> Result<PathBuf, String> {
        let image = extract_sprite(atlas, sprite, origin).map_err(|e| e.to_string())?;
        writer.save(&image, out_dir, &sprite.name).map_err(|e| e.to_string())
    });

    let duration = start.elapsed();
    let status = match &outcome {
        Ok(path) => SpriteStatus::Written(path.clone()),
        Err(e) => SpriteStatus::Failed(e.clone()),
    };
    reporter.report(ProgressEvent::SpriteCompleted {
        pair_id: pair_id.to_string(),
        sprite: sprite.name.clone(),
        status,
        duration_ms: duration.as_millis() as u64,
    });

    match outcome {
        Ok(path) => SpriteResult::written(pair_id.to_string(), sprite.name.clone(), path, duration),
        Err(e) => SpriteResult::failed(pair_id.to_string(), sprite.name.clone(), e, duration),
    }
}

/// Run one unit of work, turning a panic into that unit's error.
fn isolate<T>(unit: impl FnOnce() -> Result<T, String>) -> Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(unit)) {
        Ok(outcome) => outcome,
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
