//! Command-line interface implementation
//!
//! Parses arguments and hands off to the crop command. The legacy
//! single-dash format flags (`-png`, `-webp`) are rewritten before clap
//! sees the argument list.

mod crop;

use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::output::OutputFormat;

/// Process exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Portrait cropper - extract upright character portraits from sprite atlases
#[derive(Parser, Debug)]
#[command(name = "portrait-crop")]
#[command(about = "Extract upright character portraits from sprite atlases")]
#[command(version)]
pub struct Cli {
    /// Input folder holding Texture2D/ and MonoBehaviour/, or a .zip/.apk
    /// package containing them. Defaults to the configured root.
    pub input: Option<PathBuf>,

    /// Output encoding (also accepted as -png / -webp)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Output directory [default: _output]
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Number of worker threads [default: available parallelism]
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Path to portraits.toml (otherwise searched upward from the working directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Lossy WebP quality, 0-100 [default: 90]
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub quality: Option<u8>,

    /// Emit progress as JSON lines on stderr
    #[arg(long)]
    pub json: bool,

    /// Report every sprite
    #[arg(short, long)]
    pub verbose: bool,
}

/// Rewrite legacy single-dash format flags into `--format <name>`.
///
/// Any single-dash word longer than one letter is a format flag, unless it
/// is a bundle of known short flags such as `-vh`. `-png` and `-webp` (any
/// case) select the format, anything else is dropped with a warning so the
/// configured format stays in effect. Arguments after `--` are left alone.
pub fn normalize_args<I>(args: I) -> (Vec<OsString>, Vec<String>)
where
    I: IntoIterator<Item = OsString>,
{
    let mut normalized = Vec::new();
    let mut warnings = Vec::new();
    let mut args = args.into_iter();
    let mut passthrough = false;
    let shorts = short_flags();

    if let Some(program) = args.next() {
        normalized.push(program);
    }

    for arg in args {
        if passthrough {
            normalized.push(arg);
            continue;
        }
        let Some(text) = arg.to_str() else {
            normalized.push(arg);
            continue;
        };
        if text == "--" {
            passthrough = true;
            normalized.push(arg);
            continue;
        }

        let word = match text.strip_prefix('-') {
            Some(word)
                if !word.starts_with('-')
                    && word.len() > 1
                    && word.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                word
            }
            _ => {
                normalized.push(arg);
                continue;
            }
        };

        if word.chars().all(|c| shorts.contains(&c)) {
            normalized.push(arg);
            continue;
        }

        match OutputFormat::from_name(word) {
            Some(format) => {
                normalized.push(OsString::from("--format"));
                normalized.push(OsString::from(format.extension()));
            }
            None => warnings.push(format!(
                "unrecognized format flag '{}', expected -png or -webp; keeping the default format",
                text
            )),
        }
    }

    (normalized, warnings)
}

/// Short flags the parser accepts, including the built-in help and version.
fn short_flags() -> Vec<char> {
    let mut shorts: Vec<char> =
        Cli::command().get_arguments().filter_map(|arg| arg.get_short()).collect();
    shorts.extend(['h', 'V']);
    shorts
}

/// Run the CLI with the process arguments.
pub fn run() -> ExitCode {
    let (args, warnings) = normalize_args(std::env::args_os());
    let cli = Cli::parse_from(args);
    crop::run_crop(&cli, &warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(args: &[&str]) -> (Vec<String>, Vec<String>) {
        let (out, warnings) = normalize_args(args.iter().map(OsString::from));
        (out.into_iter().map(|a| a.into_string().unwrap()).collect(), warnings)
    }

    #[test]
    fn test_format_flags_are_rewritten() {
        let (args, warnings) = normalize(&["portrait-crop", "-webp"]);
        assert_eq!(args, vec!["portrait-crop", "--format", "webp"]);
        assert!(warnings.is_empty());

        let (args, _) = normalize(&["portrait-crop", "-PNG", "dump.zip"]);
        assert_eq!(args, vec!["portrait-crop", "--format", "png", "dump.zip"]);
    }

    #[test]
    fn test_unknown_flag_warns_and_is_dropped() {
        let (args, warnings) = normalize(&["portrait-crop", "-jpeg"]);
        assert_eq!(args, vec!["portrait-crop"]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("-jpeg"));
    }

    #[test]
    fn test_regular_options_untouched() {
        let (args, warnings) =
            normalize(&["portrait-crop", "-v", "--out", "dist", "--jobs", "2", "--", "-webp"]);
        assert_eq!(args, vec!["portrait-crop", "-v", "--out", "dist", "--jobs", "2", "--", "-webp"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_bundled_short_flags_untouched() {
        let (args, warnings) = normalize(&["portrait-crop", "-vh", "-vv"]);
        assert_eq!(args, vec!["portrait-crop", "-vh", "-vv"]);
        assert!(warnings.is_empty());

        let (args, warnings) = normalize(&["portrait-crop", "-vx"]);
        assert_eq!(args, vec!["portrait-crop"]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_cli_parses_normalized_args() {
        let (args, _) = normalize_args(
            ["portrait-crop", "-WebP", "--quality", "70", "--json", "input"].map(OsString::from),
        );
        let cli = Cli::try_parse_from(args).unwrap();

        assert_eq!(cli.format, Some(OutputFormat::Webp));
        assert_eq!(cli.quality, Some(70));
        assert!(cli.json);
        assert_eq!(cli.input, Some(PathBuf::from("input")));
    }

    #[test]
    fn test_cli_rejects_out_of_range_quality() {
        assert!(Cli::try_parse_from(["portrait-crop", "--quality", "101"]).is_err());
    }

    #[test]
    fn test_cli_rejects_two_formats() {
        let (args, _) = normalize_args(["portrait-crop", "-png", "-webp"].map(OsString::from));
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
