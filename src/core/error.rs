use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the package manager.
/// Every module returns `Result<T, PkgError>`.
#[derive(Debug, Error)]
pub enum PkgError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("No download strategy could fetch '{module}': {reason}")]
    Fetch { module: String, reason: String },

    // ── Naming ──────────────────────────────────────────
    #[error("Cannot infer a module name from '{input}'")]
    NameInference { input: String },

    #[error("Invalid version '{text}': segment '{segment}' is not a non-negative integer")]
    VersionParse { text: String, segment: String },

    // ── Resolution ──────────────────────────────────────
    #[error("Module '{module}' could not be resolved: {detail}")]
    UnresolvedModule { module: String, detail: String },

    #[error("Module '{module}' was staged at {staged:?} but no loadable file resolves")]
    NoLoadableFile { module: String, staged: PathBuf },

    // ── Staging ─────────────────────────────────────────
    #[error("Module '{module}': overwriting {path:?} was declined")]
    OverwriteDeclined { module: String, path: PathBuf },

    #[error("Module '{module}': destination {path:?} exists and is not a directory")]
    DestinationNotDirectory { module: String, path: PathBuf },

    // ── Archive ─────────────────────────────────────────
    #[error("Module '{module}': archive {archive:?} is empty")]
    EmptyArchive { module: String, archive: PathBuf },

    #[error("Module '{module}': unknown archive type for {file:?}")]
    UnknownArchiveType { module: String, file: PathBuf },

    #[error("Module '{module}': {tool} failed on {target:?} (exit code {code:?})\n{output}")]
    ExternalTool {
        module: String,
        tool: String,
        target: PathBuf,
        code: Option<i32>,
        output: String,
    },

    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Activation ──────────────────────────────────────
    #[error("Circular dependency: '{requesting}' requires '{missing}' (cycle: {})", cycle.join(" -> "))]
    CircularDependency {
        requesting: String,
        missing: String,
        cycle: Vec<String>,
    },

    #[error("Module '{module}' still reports '{dependency}' missing after installing it")]
    DependencyStillMissing { module: String, dependency: String },

    #[error("Activating module '{module}' failed: {message}")]
    Activation { module: String, message: String },

    #[error("Module '{module}' is not installed")]
    NotInstalled { module: String },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type PkgResult<T> = Result<T, PkgError>;

impl PkgError {
    /// Attach a path to an IO error raised by `std::fs` / `tokio::fs`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PkgError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for PkgError {
    fn from(source: std::io::Error) -> Self {
        PkgError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// ── Serialization for front-ends ────────────────────────
// Entry points may hand errors to a serializing caller as plain strings.
impl serde::Serialize for PkgError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
