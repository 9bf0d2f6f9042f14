pub mod commands;
pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::error::{PkgError, PkgResult};
pub use crate::core::host::{
    ActivationError, FixedPolicy, Loader, Policy, PolicyFn, PromptKind, StubGenerator,
};
pub use crate::core::installer::{InstallReport, Installer, UninstallReport};
pub use crate::core::locator::{CandidateFile, Locator, NamingConvention};
pub use crate::core::registry::{JsonRegistry, Registry, RegistryEntry};
pub use crate::core::state::{AppState, Settings};
pub use crate::core::version::VersionVector;

/// Install the `tracing` subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,modpkg=debug")),
        )
        .try_init();

    tracing::info!("modpkg {} ready", env!("CARGO_PKG_VERSION"));
}
