// ─── Registry ───
// The list of modules activated on every start, optionally pinned to a file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{PkgError, PkgResult};

/// One auto-activation entry.
///
/// Serialized as a bare `"name"` or as a `["name", "/pinned/path"]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistryEntry {
    Bare(String),
    Pinned(String, PathBuf),
}

impl RegistryEntry {
    pub fn module(&self) -> &str {
        match self {
            Self::Bare(name) | Self::Pinned(name, _) => name,
        }
    }

    pub fn pinned_path(&self) -> Option<&Path> {
        match self {
            Self::Bare(_) => None,
            Self::Pinned(_, path) => Some(path),
        }
    }
}

/// Persistence for registry entries, owned by the host.
pub trait Registry: Send + Sync {
    fn list_entries(&self) -> PkgResult<Vec<RegistryEntry>>;

    fn save(&self, entries: &[RegistryEntry]) -> PkgResult<()>;

    fn contains(&self, module: &str) -> PkgResult<bool> {
        Ok(self
            .list_entries()?
            .iter()
            .any(|entry| entry.module() == module))
    }
}

/// Registry stored as a JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonRegistry {
    path: PathBuf,
}

impl JsonRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Registry for JsonRegistry {
    fn list_entries(&self) -> PkgResult<Vec<RegistryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|e| PkgError::io(&self.path, e))?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, entries: &[RegistryEntry]) -> PkgResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PkgError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json).map_err(|e| PkgError::io(&self.path, e))?;
        debug!("Registry saved: {} entries -> {:?}", entries.len(), self.path);
        Ok(())
    }
}
