//! Crop command implementation

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tempfile::TempDir;

use super::{Cli, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::archive::{is_archive, stage_input_with_layout, DirLayout};
use crate::batch::{
    ConsoleProgress, CropContext, CropPipeline, JsonProgress, ProgressEvent, ProgressReporter,
};
use crate::config::{check, load_config, merge_cli_overrides, CliOverrides};

/// Execute a crop run.
///
/// Exit codes: 0 when the run completes (individual sprite failures
/// included), 1 when nothing could be cropped or the run could not start,
/// 2 for invalid configuration.
pub(super) fn run_crop(cli: &Cli, arg_warnings: &[String]) -> ExitCode {
    let reporter: Arc<dyn ProgressReporter> = if cli.json {
        Arc::new(JsonProgress::new())
    } else {
        Arc::new(ConsoleProgress::new().with_verbose(cli.verbose))
    };

    for warning in arg_warnings {
        reporter.report(ProgressEvent::Warning { target_id: None, message: warning.clone() });
    }

    let loaded = match load_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            report_error(reporter.as_ref(), None, e.to_string());
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    if cli.verbose && !cli.json {
        if let Some(source) = &loaded.source {
            eprintln!("Using config: {}", source.display());
        }
    }

    // The staging directory must outlive the pipeline run.
    let mut config = loaded.config;
    let (root, staging) = match &cli.input {
        Some(input) => match stage(&absolute(input), &config.input.layout(), cli.verbose && !cli.json) {
            Ok((root, staging)) => (Some(root), staging),
            Err(message) => {
                report_error(reporter.as_ref(), Some(input), message);
                return ExitCode::from(EXIT_ERROR);
            }
        },
        None => (None, None),
    };

    let overrides = CliOverrides {
        root,
        out: cli.out.clone(),
        format: cli.format,
        webp_quality: cli.quality.map(f32::from),
        jobs: cli.jobs,
    };
    merge_cli_overrides(&mut config, &overrides);
    if let Err(e) = check(&config) {
        report_error(reporter.as_ref(), None, e.to_string());
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let context = CropContext::new(config, loaded.base_dir);
    let pipeline = CropPipeline::new(context).with_reporter(Arc::clone(&reporter));

    let code = match pipeline.run() {
        Ok(result) => {
            if cli.verbose && !cli.json {
                println!("{}", result.summary());
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            report_error(reporter.as_ref(), None, e.to_string());
            EXIT_ERROR
        }
    };

    drop(staging);
    ExitCode::from(code)
}

/// Resolve the command-line input to an input root.
///
/// Folders are used in place. Packages are unpacked into a temporary
/// directory that is removed when the returned handle drops.
fn stage(input: &Path, layout: &DirLayout, verbose: bool) -> Result<(PathBuf, Option<TempDir>), String> {
    if !is_archive(input) {
        let staged = stage_input_with_layout(input, input, layout).map_err(|e| e.to_string())?;
        return Ok((staged.root, None));
    }

    let staging = tempfile::Builder::new()
        .prefix("portrait-crop-")
        .tempdir()
        .map_err(|e| format!("Failed to create staging directory: {}", e))?;
    let staged = stage_input_with_layout(input, staging.path(), layout).map_err(|e| e.to_string())?;
    if verbose {
        eprintln!(
            "Unpacked {} files from {}, using {}",
            staged.extracted_files,
            input.display(),
            staged.root.display()
        );
    }
    Ok((staged.root, Some(staging)))
}

fn report_error(reporter: &dyn ProgressReporter, target: Option<&Path>, message: String) {
    reporter.report(ProgressEvent::Error {
        target_id: target.map(|p| p.display().to_string()),
        message,
    });
}

/// Anchor a command-line path to the working directory.
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}
