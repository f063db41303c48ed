use std::path::Path;

use crate::error::LoadError;

use super::SplinesNode;

/// Reads markup collections from persistent storage.
///
/// File formats live outside this crate; implementors fill `node` with the
/// markups found at `path`.
pub trait SplinesStorage {
    /// Reads the file at `path` into `node`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Read`] if the file cannot be read or parsed.
    fn read(&self, path: &Path, node: &mut SplinesNode) -> Result<(), LoadError>;
}
