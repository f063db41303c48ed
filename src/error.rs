use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the splines crate.
#[derive(Debug, Error)]
pub enum SplinesError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Tessellation(#[from] TessellationError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

/// Errors related to tessellation.
#[derive(Debug, Error)]
pub enum TessellationError {
    #[error("invalid tessellation parameters: {0}")]
    InvalidParameters(String),

    #[error("tessellation failed: {0}")]
    Failed(String),
}

/// Errors raised by the scene.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("node {name} is not a {expected} node")]
    WrongKind { name: String, expected: &'static str },
}

/// Errors raised while loading markups from storage.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no file name given, cannot load")]
    MissingFileName,

    #[error("failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },
}

/// Convenience type alias for results using [`SplinesError`].
pub type Result<T> = std::result::Result<T, SplinesError>;
