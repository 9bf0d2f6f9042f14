// ─── Installer ───
// Install requests, the activation retry loop with dependency recursion,
// and uninstall.

pub mod installing;
pub mod request;
pub mod uninstall;
pub mod workflow;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use installing::{InstallingGuard, InstallingSet};
pub use request::{infer_module_name, InstallRequest, RequestKind};
pub use workflow::{Collaborators, Installer};

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    pub module: String,
    /// File chosen by the locator after staging.
    pub resolved: PathBuf,
    /// Dependencies installed while activating, in order.
    pub dependencies: Vec<String>,
    /// Whether a registry entry was added.
    pub registered: bool,
    pub stub: Option<PathBuf>,
}

/// Outcome of an uninstall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UninstallReport {
    pub module: String,
    pub deactivated: bool,
    pub unregistered: bool,
    pub removed: Vec<PathBuf>,
}
