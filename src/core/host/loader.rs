use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::error::PkgResult;

/// Why the host failed to bring a file into the running process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    /// Loading stopped because another module is not available yet.
    #[error("missing dependency '{0}'")]
    MissingDependency(String),

    #[error("{0}")]
    Other(String),
}

/// The host's module loader.
///
/// Implemented by whatever runtime actually loads code; the package manager
/// only drives it.
pub trait Loader: Send + Sync {
    fn activate(&self, path: &Path) -> Result<(), ActivationError>;

    fn deactivate(&self, module: &str) -> PkgResult<()>;

    fn is_active(&self, module: &str) -> bool;
}

/// Optional code generator producing fast-load stubs from inline markers.
pub trait StubGenerator: Send + Sync {
    fn has_inline_markers(&self, path: &Path) -> PkgResult<bool>;

    /// Returns the generated stub, or `None` if nothing was produced.
    fn generate_stub(&self, path: &Path) -> PkgResult<Option<PathBuf>>;
}
