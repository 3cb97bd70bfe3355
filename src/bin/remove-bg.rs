//! remove-bg CLI Tool
//!
//! Removes the background from an image file, or from a base64 data URI read
//! on stdin.

use remove_bg::cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
