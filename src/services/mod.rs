//! Services separating I/O from the removal pipeline

pub mod io;

pub use io::{detect_image_format, ImageIOService};
