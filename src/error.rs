//! Errors surfaced to callers of the raster engine.
//!
//! Only resource-level failures live here. Out-of-bounds writes, degenerate
//! fills and undo past the ends of history are handled where they happen
//! and never produce an error.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpryteError>;

#[derive(Debug, Error)]
pub enum SpryteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse settings: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("invalid project file: {0}")]
    Project(String),

    #[error("unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("{} can be exported but not opened", .0.display())]
    WriteOnly(PathBuf),

    #[error("nothing to save: document has no frames")]
    NoFrames,

    #[error("invalid color '{0}', expected #RRGGBB or #RRGGBBAA")]
    InvalidColor(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid layout size {0}x{1}")]
    InvalidLayout(u32, u32),

    #[error("unknown pointer button '{0}'")]
    UnknownButton(String),
}
