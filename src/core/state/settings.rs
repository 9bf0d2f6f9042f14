use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{PkgError, PkgResult};
use crate::core::locator::{
    NamingConvention, DEFAULT_COMPILED_EXTENSION, DEFAULT_SOURCE_EXTENSION,
};

pub const APP_DIR_NAME: &str = "modpkg";
pub const BOOTSTRAP_FILE: &str = "modpkg_bootstrap.json";
pub const SETTINGS_FILE: &str = "settings.json";

/// Persisted configuration. Relative paths are taken relative to the data
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Explicit load directories, searched first.
    pub load_path: Vec<PathBuf>,
    /// Supplemental directories, searched after the load path.
    pub extra_dirs: Vec<PathBuf>,
    /// Where installs are staged; always the last search root.
    pub install_dir: PathBuf,
    /// URL templates tried in order for bare names; `{name}` is substituted.
    pub download_urls: Vec<String>,
    pub source_extension: String,
    pub compiled_extension: String,
    pub registry_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            load_path: Vec::new(),
            extra_dirs: Vec::new(),
            install_dir: PathBuf::from("site"),
            download_urls: Vec::new(),
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
            compiled_extension: DEFAULT_COMPILED_EXTENSION.to_string(),
            registry_file: PathBuf::from("registry.json"),
        }
    }
}

impl Settings {
    /// Read `settings.json` from `data_dir`; missing or corrupt files give
    /// the defaults.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let Ok(raw) = std::fs::read_to_string(&path) else {
            debug!("No settings at {:?}, using defaults", path);
            return Self::default();
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring unreadable settings {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) -> PkgResult<()> {
        std::fs::create_dir_all(data_dir).map_err(|e| PkgError::io(data_dir, e))?;
        let path = data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| PkgError::io(&path, e))
    }

    pub fn install_dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.install_dir)
    }

    pub fn registry_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.registry_file)
    }

    /// Load path, then supplemental directories, then the install directory.
    pub fn search_roots(&self, data_dir: &Path) -> Vec<PathBuf> {
        self.load_path
            .iter()
            .chain(&self.extra_dirs)
            .map(|dir| data_dir.join(dir))
            .chain(std::iter::once(self.install_dir(data_dir)))
            .collect()
    }

    pub fn naming_convention(&self) -> NamingConvention {
        NamingConvention::new(&self.source_extension, &self.compiled_extension)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BootstrapConfig {
    data_dir: PathBuf,
}

pub fn default_base_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Data directory under `base`, honoring a relocation recorded in the
/// bootstrap file.
pub fn data_dir_in(base: &Path) -> PathBuf {
    let bootstrap_path = base.join(BOOTSTRAP_FILE);
    if let Ok(raw) = std::fs::read_to_string(&bootstrap_path) {
        if let Ok(cfg) = serde_json::from_str::<BootstrapConfig>(&raw) {
            return cfg.data_dir;
        }
        warn!("Ignoring unreadable bootstrap file {:?}", bootstrap_path);
    }
    base.join(APP_DIR_NAME)
}

pub fn write_bootstrap(base: &Path, data_dir: &Path) -> PkgResult<()> {
    std::fs::create_dir_all(base).map_err(|e| PkgError::io(base, e))?;
    let bootstrap = BootstrapConfig {
        data_dir: data_dir.to_path_buf(),
    };
    let path = base.join(BOOTSTRAP_FILE);
    let json = serde_json::to_string_pretty(&bootstrap)?;
    std::fs::write(&path, json).map_err(|e| PkgError::io(&path, e))
}

/// Parent of every scratch directory.
pub fn scratch_root() -> PathBuf {
    std::env::temp_dir().join(APP_DIR_NAME)
}
