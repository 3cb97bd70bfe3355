//! Exit-code and output contract of the `remove-bg` binary
//!
//! Every run uses an empty cache with downloads disabled, so nothing touches
//! the network. Success paths point `REMOVE_BG_MODEL_DIR` at a tiny
//! generated model.

#![cfg(feature = "cli")]

use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::{Cursor, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn remove_bg(temp_dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_remove-bg"));
    command
        .env("REMOVE_BG_CACHE_DIR", temp_dir.join("cache"))
        .env("REMOVE_BG_OFFLINE", "1")
        .env_remove("REMOVE_BG_MODEL_DIR")
        .env_remove("REMOVE_BG_MODEL_URL")
        .env_remove("REMOVE_BG_BACKEND")
        .env_remove("REMOVE_BG_LOG");
    command
}

fn run_with_stdin(temp_dir: &Path, stdin: &[u8]) -> Output {
    pipe_stdin(remove_bg(temp_dir), stdin)
}

fn png_bytes() -> Vec<u8> {
    encoded_image(8, 8, ImageFormat::Png)
}

fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 8) as u8, (y * 8) as u8, 90, 255])
    });
    let image = DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image).to_rgb8());
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), format)
        .unwrap();
    buffer
}

/// Minimal protobuf writer for the ONNX fixture
mod onnx_fixture {
    use std::path::{Path, PathBuf};

    const SIDE: u64 = 16;

    fn varint(out: &mut Vec<u8>, mut value: u64) {
        while value >= 0x80 {
            out.push((value as u8 & 0x7f) | 0x80);
            value >>= 7;
        }
        out.push(value as u8);
    }

    fn int_field(out: &mut Vec<u8>, field: u64, value: u64) {
        varint(out, field << 3);
        varint(out, value);
    }

    fn bytes_field(out: &mut Vec<u8>, field: u64, bytes: &[u8]) {
        varint(out, (field << 3) | 2);
        varint(out, bytes.len() as u64);
        out.extend_from_slice(bytes);
    }

    /// Float tensor `name` of shape [1, 3, 16, 16]
    fn value_info(name: &str) -> Vec<u8> {
        let mut shape = Vec::new();
        for dim in [1, 3, SIDE, SIDE] {
            let mut dimension = Vec::new();
            int_field(&mut dimension, 1, dim);
            bytes_field(&mut shape, 1, &dimension);
        }

        let mut tensor = Vec::new();
        int_field(&mut tensor, 1, 1);
        bytes_field(&mut tensor, 2, &shape);

        let mut type_proto = Vec::new();
        bytes_field(&mut type_proto, 1, &tensor);

        let mut info = Vec::new();
        bytes_field(&mut info, 1, name.as_bytes());
        bytes_field(&mut info, 2, &type_proto);
        info
    }

    /// A single `Sigmoid` node from "input" to "output"
    fn sigmoid_model() -> Vec<u8> {
        let mut node = Vec::new();
        bytes_field(&mut node, 1, b"input");
        bytes_field(&mut node, 2, b"output");
        bytes_field(&mut node, 4, b"Sigmoid");

        let mut graph = Vec::new();
        bytes_field(&mut graph, 1, &node);
        bytes_field(&mut graph, 2, b"sigmoid-mask");
        bytes_field(&mut graph, 11, &value_info("input"));
        bytes_field(&mut graph, 12, &value_info("output"));

        let mut opset = Vec::new();
        int_field(&mut opset, 2, 13);

        let mut model = Vec::new();
        int_field(&mut model, 1, 7);
        bytes_field(&mut model, 7, &graph);
        bytes_field(&mut model, 8, &opset);
        model
    }

    /// Write a model directory in the Hugging Face layout, returning its path
    pub fn write_model_dir(root: &Path) -> PathBuf {
        let dir = root.join("model");
        std::fs::create_dir_all(dir.join("onnx")).unwrap();
        std::fs::write(dir.join("onnx").join("model.onnx"), sigmoid_model()).unwrap();
        std::fs::write(
            dir.join("preprocessor_config.json"),
            r#"{"image_mean": [128, 128, 128], "image_std": [256, 256, 256], "size": {"height": 16, "width": 16}}"#,
        )
        .unwrap();
        dir
    }
}

fn remove_bg_with_model(temp_dir: &Path) -> Command {
    let model_dir = onnx_fixture::write_model_dir(temp_dir);
    let mut command = remove_bg(temp_dir);
    command.env("REMOVE_BG_MODEL_DIR", model_dir);
    command
}

fn pipe_stdin(mut command: Command, stdin: &[u8]) -> Output {
    let mut child = command
        .arg("--stdin")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(stdin).unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn test_help_exits_zero() {
    let temp_dir = TempDir::new().unwrap();
    for flag in ["--help", "-h"] {
        let output = remove_bg(temp_dir.path()).arg(flag).output().unwrap();
        assert_eq!(output.status.code(), Some(0), "{flag}");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Usage"), "{stdout}");
        assert!(stdout.contains("--stdin"), "{stdout}");
    }
}

#[test]
fn test_no_arguments_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let output = remove_bg(temp_dir.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn test_missing_input_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("missing.jpg");

    let output = remove_bg(temp_dir.path()).arg(&input).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(&format!("Error: Input file '{}' not found.", input.display())),
        "{stderr}"
    );
    assert!(!temp_dir.path().join("missing_no_bg.png").exists());
}

#[test]
fn test_processing_failure_reports_and_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("photo.png");
    std::fs::write(&input, png_bytes()).unwrap();

    let output = remove_bg(temp_dir.path()).arg(&input).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error processing image:"), "{stderr}");
    assert!(stderr.contains("Failed to remove background."), "{stderr}");
    assert!(output.stdout.is_empty());
    assert!(!temp_dir.path().join("photo_no_bg.png").exists());
}

#[test]
fn test_stdin_malformed_data_uri() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_with_stdin(temp_dir.path(), b"data:image/png;base64\n");

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Malformed data URI"));
}

#[test]
fn test_stdin_without_model_prints_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let uri = format!(
        "  data:image/png;base64,{}\n",
        general_purpose::STANDARD.encode(png_bytes())
    );

    let output = run_with_stdin(temp_dir.path(), uri.as_bytes());

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_stdin_conflicts_with_positional_input() {
    let temp_dir = TempDir::new().unwrap();
    let output = remove_bg(temp_dir.path())
        .args(["--stdin", "photo.jpg"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_directory_input_is_not_reported_missing() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("album");
    std::fs::create_dir(&input).unwrap();

    let output = remove_bg(temp_dir.path()).arg(&input).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to remove background."), "{stderr}");
    assert!(!stderr.contains("not found"), "{stderr}");
}

#[test]
fn test_stdin_path_to_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.jpg");

    let output = run_with_stdin(temp_dir.path(), format!("{}\n", missing.display()).as_bytes());

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("File not found"), "{stderr}");
    assert!(!stderr.contains("Malformed data URI"), "{stderr}");
}

#[test]
fn test_log_format_compact_is_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let output = remove_bg(temp_dir.path())
        .args(["--log-format", "compact"])
        .arg(temp_dir.path().join("missing.jpg"))
        .output()
        .unwrap();

    // Fails on the input, not on argument parsing
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found."));
}

#[test]
fn test_error_output_has_no_ansi_escapes_when_piped() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("photo.png");
    std::fs::write(&input, png_bytes()).unwrap();

    let output = remove_bg(temp_dir.path())
        .arg("-vv")
        .arg(&input)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains('\u{1b}'), "{stderr:?}");
    assert_eq!(stderr.matches("Error processing image:").count(), 1, "{stderr}");
}

#[cfg(feature = "tract")]
mod with_model {
    use super::*;

    #[test]
    fn test_file_mode_writes_default_output() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("photo.jpg");
        std::fs::write(&input, encoded_image(40, 24, ImageFormat::Jpeg)).unwrap();
        let expected = temp_dir.path().join("photo_no_bg.png");

        let output = remove_bg_with_model(temp_dir.path()).arg(&input).output().unwrap();

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert_eq!(output.status.code(), Some(0), "{stderr}");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(
            stdout.trim_end(),
            format!("Background removed successfully. Output: {}", expected.display())
        );

        let written = std::fs::read(&expected).unwrap();
        assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::Png);
        let result = image::load_from_memory(&written).unwrap();
        assert_eq!((result.width(), result.height()), (40, 24));
        assert!(result.color().has_alpha());
    }

    #[test]
    fn test_file_mode_with_explicit_output() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("photo.png");
        let target = temp_dir.path().join("out").join("cutout.png");
        std::fs::write(&input, encoded_image(12, 12, ImageFormat::Png)).unwrap();

        let output = remove_bg_with_model(temp_dir.path())
            .arg(&input)
            .arg(&target)
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(0));
        assert!(target.is_file());
        assert!(!temp_dir.path().join("photo_no_bg.png").exists());
    }

    #[test]
    fn test_stdin_data_uri_prints_png_data_uri() {
        let temp_dir = TempDir::new().unwrap();
        let uri = format!(
            "data:image/png;base64,{}\n",
            general_purpose::STANDARD.encode(encoded_image(20, 10, ImageFormat::Png))
        );

        let output = pipe_stdin(remove_bg_with_model(temp_dir.path()), uri.as_bytes());

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert_eq!(output.status.code(), Some(0), "{stderr}");
        let stdout = String::from_utf8(output.stdout).unwrap();
        let payload = stdout
            .trim_end()
            .strip_prefix("data:image/png;base64,")
            .expect("png data URI on stdout");
        let png = general_purpose::STANDARD.decode(payload).unwrap();
        let result = image::load_from_memory(&png).unwrap();
        assert_eq!((result.width(), result.height()), (20, 10));
    }

    #[test]
    fn test_stdin_file_path_prints_png_data_uri() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("photo.jpg");
        std::fs::write(&input, encoded_image(16, 16, ImageFormat::Jpeg)).unwrap();

        let output = pipe_stdin(
            remove_bg_with_model(temp_dir.path()),
            format!("  {}\n", input.display()).as_bytes(),
        );

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert_eq!(output.status.code(), Some(0), "{stderr}");
        assert!(String::from_utf8_lossy(&output.stdout).starts_with("data:image/png;base64,"));
        assert!(!temp_dir.path().join("photo_no_bg.png").exists());
    }
}
