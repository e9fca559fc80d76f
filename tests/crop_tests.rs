//! CLI integration tests for `portrait-crop`.
//!
//! Each test builds a small input tree (atlas images plus metadata) in a
//! temporary directory, runs the binary there and inspects `_output/`.

use image::{GrayImage, Luma, Rgba, RgbaImage};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

/// Run the binary in `dir` and return (stdout, stderr, exit code).
fn run_in(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_portrait-crop"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to execute portrait-crop");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code().unwrap_or(-1))
}

/// Left half red, right half green.
fn two_tone_atlas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, _| if x < width / 2 { RED } else { GREEN })
}

fn write_atlas(root: &Path, name: &str, image: &RgbaImage) {
    let dir = root.join("Texture2D");
    fs::create_dir_all(&dir).unwrap();
    image.save(dir.join(format!("{}.png", name))).unwrap();
}

fn write_metadata(root: &Path, file_name: &str, contents: &str) {
    let dir = root.join("MonoBehaviour");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file_name), contents).unwrap();
}

fn output(root: &Path, file_name: &str) -> PathBuf {
    root.join("_output").join(file_name)
}

fn open_rgba(path: &Path) -> RgbaImage {
    image::open(path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e)).to_rgba8()
}

/// One atlas with a red sprite `a` and a green sprite `b`.
fn simple_pack(root: &Path, stem: &str) {
    write_atlas(root, stem, &two_tone_atlas(4, 2));
    write_metadata(
        root,
        &format!("{}.json", stem),
        &format!(
            r#"{{
                "atlas": "{stem}",
                "sprites": [
                    {{"name": "{stem}_a", "rect": {{"x": 0, "y": 0, "w": 2, "h": 2}}}},
                    {{"name": "{stem}_b", "rect": {{"x": 2, "y": 0, "w": 2, "h": 2}}}}
                ]
            }}"#
        ),
    );
}

// ============================================================================
// Basic runs
// ============================================================================

#[test]
fn test_crop_writes_png_portraits() {
    let temp = TempDir::new().unwrap();
    simple_pack(temp.path(), "pack");

    let (_, stderr, code) = run_in(temp.path(), &[]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    let a = open_rgba(&output(temp.path(), "pack_a.png"));
    assert_eq!(a.dimensions(), (2, 2));
    assert_eq!(*a.get_pixel(0, 0), RED);
    let b = open_rgba(&output(temp.path(), "pack_b.png"));
    assert_eq!(*b.get_pixel(1, 1), GREEN);
    assert!(stderr.contains("[done]"));
}

#[test]
fn test_no_input_pairs_exits_with_error() {
    let temp = TempDir::new().unwrap();

    let (_, stderr, code) = run_in(temp.path(), &[]);

    assert_eq!(code, 1);
    assert!(stderr.contains("[error]"), "stderr: {}", stderr);
    assert!(!temp.path().join("_output").exists(), "no output folder without input");
}

#[test]
fn test_missing_atlas_is_skipped_once() {
    let temp = TempDir::new().unwrap();
    simple_pack(temp.path(), "pack0");
    simple_pack(temp.path(), "pack1");
    fs::remove_file(temp.path().join("Texture2D/pack1.png")).unwrap();

    let (_, stderr, code) = run_in(temp.path(), &[]);

    assert_eq!(code, 0, "stderr: {}", stderr);
    let warnings: Vec<_> = stderr.lines().filter(|l| l.contains("[warn]")).collect();
    assert_eq!(warnings.len(), 1, "stderr: {}", stderr);
    assert!(warnings[0].contains("pack1.json"));
    assert!(output(temp.path(), "pack0_a.png").is_file());
    assert!(output(temp.path(), "pack0_b.png").is_file());
    assert!(!output(temp.path(), "pack1_a.png").exists());
}

#[test]
fn test_duplicate_names_keep_first_entry() {
    let temp = TempDir::new().unwrap();
    write_atlas(temp.path(), "pack", &two_tone_atlas(4, 2));
    write_metadata(
        temp.path(),
        "pack.json",
        r#"{
            "atlas": "pack",
            "sprites": [
                {"name": "hero", "rect": {"x": 0, "y": 0, "w": 2, "h": 2}},
                {"name": "hero", "rect": {"x": 2, "y": 0, "w": 2, "h": 2}}
            ]
        }"#,
    );

    let (_, stderr, code) = run_in(temp.path(), &["--json"]);

    assert_eq!(code, 0, "stderr: {}", stderr);
    let hero = open_rgba(&output(temp.path(), "hero.png"));
    assert_eq!(*hero.get_pixel(0, 0), RED, "first entry wins");
    assert!(stderr.contains("\"duplicate_dropped\""));
}

#[test]
fn test_rotated_and_trimmed_sprite() {
    let temp = TempDir::new().unwrap();
    write_atlas(temp.path(), "pack", &two_tone_atlas(6, 2));
    write_metadata(
        temp.path(),
        "pack.json",
        r#"{
            "atlas": "pack",
            "sprites": [
                {"name": "lying", "rect": {"x": 0, "y": 0, "w": 3, "h": 2}, "rotate": 1},
                {
                    "name": "padded",
                    "rect": {"x": 3, "y": 0, "w": 3, "h": 2},
                    "originalSize": {"width": 5, "height": 4},
                    "offset": {"x": 1, "y": 1}
                }
            ]
        }"#,
    );

    let (_, stderr, code) = run_in(temp.path(), &[]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    let lying = open_rgba(&output(temp.path(), "lying.png"));
    assert_eq!(lying.dimensions(), (2, 3), "rotation is undone");

    let padded = open_rgba(&output(temp.path(), "padded.png"));
    assert_eq!(padded.dimensions(), (5, 4));
    assert_eq!(padded.get_pixel(0, 0).0[3], 0, "padding is transparent");
    assert_eq!(*padded.get_pixel(1, 1), GREEN);
}

// ============================================================================
// Output format flags
// ============================================================================

fn assert_webp(path: &Path) {
    let bytes = fs::read(path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e));
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WEBP");
}

#[test]
fn test_webp_flag() {
    let temp = TempDir::new().unwrap();
    simple_pack(temp.path(), "pack");

    let (_, stderr, code) = run_in(temp.path(), &["-webp"]);

    assert_eq!(code, 0, "stderr: {}", stderr);
    assert_webp(&output(temp.path(), "pack_a.webp"));
    assert!(!output(temp.path(), "pack_a.png").exists());
}

#[test]
fn test_format_flag_ignores_case() {
    let temp = TempDir::new().unwrap();
    simple_pack(temp.path(), "pack");

    let (_, stderr, code) = run_in(temp.path(), &["-WEBP"]);

    assert_eq!(code, 0, "stderr: {}", stderr);
    assert_webp(&output(temp.path(), "pack_b.webp"));
}

#[test]
fn test_unknown_format_flag_falls_back_to_png() {
    let temp = TempDir::new().unwrap();
    simple_pack(temp.path(), "pack");

    let (_, stderr, code) = run_in(temp.path(), &["-gif"]);

    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stderr.lines().any(|l| l.contains("[warn]") && l.contains("-gif")), "stderr: {}", stderr);
    assert!(output(temp.path(), "pack_a.png").is_file());
}

// ============================================================================
// Inputs
// ============================================================================

#[test]
fn test_zip_package_input() {
    let temp = TempDir::new().unwrap();
    let dump = temp.path().join("dump");
    simple_pack(&dump.join("assets"), "pack");

    let zip_path = temp.path().join("game.zip");
    let mut zip = zip::ZipWriter::new(fs::File::create(&zip_path).unwrap());
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for entry in ["assets/Texture2D/pack.png", "assets/MonoBehaviour/pack.json"] {
        zip.start_file(entry, options).unwrap();
        zip.write_all(&fs::read(dump.join(entry)).unwrap()).unwrap();
    }
    zip.finish().unwrap();

    let (_, stderr, code) = run_in(temp.path(), &["game.zip"]);

    assert_eq!(code, 0, "stderr: {}", stderr);
    assert_eq!(*open_rgba(&output(temp.path(), "pack_a.png")).get_pixel(0, 0), RED);
}

#[test]
fn test_missing_input_path_fails() {
    let temp = TempDir::new().unwrap();

    let (_, stderr, code) = run_in(temp.path(), &["nowhere.zip"]);

    assert_eq!(code, 1);
    assert!(stderr.contains("[error]"), "stderr: {}", stderr);
}

#[test]
fn test_asset_dump_layout_with_alpha_mask() {
    let temp = TempDir::new().unwrap();
    // Top half red, bottom half blue; the sprite sits in the bottom rows
    // once the bottom-left origin is applied.
    let atlas = RgbaImage::from_fn(4, 4, |_, y| if y < 2 { RED } else { BLUE });
    write_atlas(temp.path(), "portraits#0", &atlas);
    let mask = GrayImage::from_pixel(4, 4, Luma([128]));
    mask.save(temp.path().join("Texture2D/portraits#0_alpha.png")).unwrap();
    write_metadata(
        temp.path(),
        "portraits#0.json",
        r#"{
            "_index": 0,
            "_sign": {
                "m_atlases": [{"name": "portraits#0"}],
                "m_alphas": [{"name": "portraits#0_alpha"}]
            },
            "_sprites": [
                {"name": "captain", "rect": {"x": 0, "y": 0, "w": 2, "h": 2}, "rotate": 0, "flip": 0}
            ]
        }"#,
    );

    let (_, stderr, code) = run_in(temp.path(), &[]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    let captain = open_rgba(&output(temp.path(), "captain.png"));
    assert_eq!(*captain.get_pixel(0, 0), Rgba([0, 0, 255, 128]));
}

// ============================================================================
// Reporting and configuration
// ============================================================================

#[test]
fn test_json_progress_lines() {
    let temp = TempDir::new().unwrap();
    simple_pack(temp.path(), "pack");

    let (_, stderr, code) = run_in(temp.path(), &["--json", "--jobs", "2"]);
    assert_eq!(code, 0, "stderr: {}", stderr);

    let events: Vec<serde_json::Value> =
        stderr.lines().map(|l| serde_json::from_str(l).expect("valid JSON line")).collect();
    assert_eq!(events.first().unwrap()["event"], "run_started");
    assert_eq!(events.first().unwrap()["jobs"], 2);
    let last = events.last().unwrap();
    assert_eq!(last["event"], "run_completed");
    assert_eq!(last["extracted"], 2);
    assert_eq!(last["failed"], 0);
}

#[test]
fn test_config_file_sets_output() {
    let temp = TempDir::new().unwrap();
    simple_pack(temp.path(), "pack");
    fs::write(
        temp.path().join("portraits.toml"),
        "[output]\ndir = \"portraits\"\nformat = \"webp\"\n",
    )
    .unwrap();

    let (_, stderr, code) = run_in(temp.path(), &[]);

    assert_eq!(code, 0, "stderr: {}", stderr);
    assert_webp(&temp.path().join("portraits/pack_a.webp"));
}

#[test]
fn test_cli_overrides_config_format() {
    let temp = TempDir::new().unwrap();
    simple_pack(temp.path(), "pack");
    fs::write(temp.path().join("portraits.toml"), "[output]\nformat = \"webp\"\n").unwrap();

    let (_, stderr, code) = run_in(temp.path(), &["-png", "--out", "dist"]);

    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(temp.path().join("dist/pack_a.png").is_file());
}

#[test]
fn test_invalid_config_exits_with_usage_error() {
    let temp = TempDir::new().unwrap();
    simple_pack(temp.path(), "pack");
    fs::write(temp.path().join("portraits.toml"), "[run]\njobs = 0\n").unwrap();

    let (_, stderr, code) = run_in(temp.path(), &[]);

    assert_eq!(code, 2);
    assert!(stderr.contains("jobs"), "stderr: {}", stderr);
    assert!(!temp.path().join("_output").exists());
}

#[test]
fn test_zero_jobs_flag_rejected() {
    let temp = TempDir::new().unwrap();
    simple_pack(temp.path(), "pack");

    let (_, _, code) = run_in(temp.path(), &["--jobs", "0"]);

    assert_eq!(code, 2);
}
