//! Library error type.
//!
//! Geometry and material failures abort the construction of the single actor
//! involved and surface through `Result`; they never leave partial state
//! behind in a world. Shader compile failures are fatal at registry
//! initialization, before any frame is drawn.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    /// A generator was handed an argument that cannot produce a closed
    /// surface or a valid buffer.
    #[error("invalid {what}: {value}")]
    InvalidParameter { what: &'static str, value: String },

    /// The OBJ contains a construct the loader does not accept (n-gons with
    /// more than four vertices, `vp`, `l`).
    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    /// A malformed numeric field in an MTL file; `line` is 1-based.
    #[error("MTL parse error at line {line}: {message}")]
    MaterialParse { line: usize, message: String },

    #[error("cannot read {}", path.display())]
    MissingFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A shader program failed to build or link.
    #[error("shader compilation failed: {0}")]
    Compile(String),
}

pub type Result<T> = std::result::Result<T, SceneError>;
