use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::core::error::{PkgError, PkgResult};
use crate::core::installer::{InstallReport, UninstallReport};
use crate::core::locator::CandidateFile;
use crate::core::registry::RegistryEntry;
use crate::core::state::{AppState, Settings};

/// State shared between entry points.
pub type SharedState = Arc<Mutex<AppState>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsPayload {
    #[serde(flatten)]
    pub settings: Settings,
    pub data_dir: String,
}

impl SettingsPayload {
    fn from_state(state: &AppState) -> Self {
        Self {
            settings: state.settings.clone(),
            data_dir: state.data_dir.to_string_lossy().to_string(),
        }
    }
}

/// Result of activating one registry entry at startup.
#[derive(Debug, Clone, Serialize)]
pub struct LoadOutcome {
    pub module: String,
    pub path: Option<PathBuf>,
    pub error: Option<String>,
}

// ── Install / uninstall ─────────────────────────────────

/// Install from a module name, a local file or a URL.
pub async fn install_module(
    state: &SharedState,
    input: &str,
    explicit_name: Option<&str>,
) -> PkgResult<InstallReport> {
    let installer = state.lock().await.installer();
    installer.install(input, explicit_name).await
}

pub async fn uninstall_module(state: &SharedState, name: &str) -> PkgResult<UninstallReport> {
    let installer = state.lock().await.installer();
    installer.uninstall(name)
}

// ── Queries ─────────────────────────────────────────────

pub async fn locate_module(
    state: &SharedState,
    name: &str,
    allow_autoload: bool,
) -> PkgResult<Option<CandidateFile>> {
    let installer = state.lock().await.installer();
    installer.locator().resolve(name, allow_autoload)
}

pub async fn list_registered(state: &SharedState) -> PkgResult<Vec<RegistryEntry>> {
    let registry = state.lock().await.registry();
    registry.list_entries()
}

/// Activate every registry entry, as done once at startup.
///
/// Pinned paths are used when they still exist; other entries go through
/// the locator. One failing entry does not stop the others.
pub async fn load_registered(state: &SharedState) -> PkgResult<Vec<LoadOutcome>> {
    let (installer, registry, loader) = {
        let state = state.lock().await;
        (state.installer(), state.registry(), state.loader())
    };

    let mut outcomes = Vec::new();
    for entry in registry.list_entries()? {
        let module = entry.module().to_string();
        let path = match entry.pinned_path() {
            Some(pinned) if pinned.exists() => Ok(pinned.to_path_buf()),
            pinned => {
                if let Some(stale) = pinned {
                    warn!("Pinned file for '{}' is gone: {:?}", module, stale);
                }
                installer
                    .locator()
                    .require(&module, true)
                    .map(|found| found.source_path)
            }
        };

        let outcome = path.and_then(|path| {
            loader
                .activate(&path)
                .map(|()| path)
                .map_err(|e| PkgError::Activation {
                    module: module.clone(),
                    message: e.to_string(),
                })
        });

        match outcome {
            Ok(path) => {
                info!("Loaded '{}' from {:?}", module, path);
                outcomes.push(LoadOutcome {
                    module,
                    path: Some(path),
                    error: None,
                });
            }
            Err(e) => {
                warn!("Could not load '{}': {}", module, e);
                outcomes.push(LoadOutcome {
                    module,
                    path: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }
    Ok(outcomes)
}

// ── Settings ────────────────────────────────────────────

pub async fn get_settings(state: &SharedState) -> SettingsPayload {
    SettingsPayload::from_state(&*state.lock().await)
}

pub async fn update_settings(
    state: &SharedState,
    settings: Settings,
) -> PkgResult<SettingsPayload> {
    let mut state = state.lock().await;
    state.update_settings(settings)?;
    Ok(SettingsPayload::from_state(&state))
}

pub async fn migrate_data_dir(state: &SharedState, target_dir: PathBuf) -> PkgResult<SettingsPayload> {
    let mut state = state.lock().await;
    state.migrate_data_dir(target_dir)?;
    Ok(SettingsPayload::from_state(&state))
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::core::downloader::Downloader;
    use crate::core::host::{ActivationError, FixedPolicy, Loader};
    use crate::core::state::settings::data_dir_in;
    use crate::core::testing::local_client;

    #[derive(Default)]
    struct RecordingLoader {
        activated: StdMutex<Vec<PathBuf>>,
    }

    impl Loader for RecordingLoader {
        fn activate(&self, path: &Path) -> Result<(), ActivationError> {
            self.activated.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }

        fn deactivate(&self, _module: &str) -> PkgResult<()> {
            Ok(())
        }

        fn is_active(&self, _module: &str) -> bool {
            false
        }
    }

    fn shared(base: &Path, loader: Arc<RecordingLoader>) -> SharedState {
        let state = AppState::with_dirs(
            base.to_path_buf(),
            data_dir_in(base),
            Downloader::new(local_client()),
            loader,
            Arc::new(FixedPolicy::approve_all()),
        )
        .unwrap();
        Arc::new(Mutex::new(state))
    }

    #[tokio::test]
    async fn install_then_locate_then_uninstall() {
        let base = tempfile::tempdir().unwrap();
        let state = shared(base.path(), Arc::default());
        let source = base.path().join("greet-0.2.el");
        std::fs::write(&source, ";; greet\n").unwrap();

        let report = install_module(&state, source.to_str().unwrap(), None)
            .await
            .unwrap();
        assert_eq!(report.module, "greet");
        assert!(report.registered);

        let found = locate_module(&state, "greet", false).await.unwrap().unwrap();
        assert_eq!(found.source_path, report.resolved);
        assert_eq!(list_registered(&state).await.unwrap().len(), 1);

        let removed = uninstall_module(&state, "greet").await.unwrap();
        assert!(removed.unregistered);
        assert_eq!(removed.removed, vec![report.resolved]);
        assert!(list_registered(&state).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn startup_load_uses_pins_and_falls_back_to_search() {
        let base = tempfile::tempdir().unwrap();
        let loader = Arc::new(RecordingLoader::default());
        let state = shared(base.path(), loader.clone());

        let (install_dir, registry) = {
            let state = state.lock().await;
            (state.install_dir(), state.registry())
        };
        std::fs::create_dir_all(&install_dir).unwrap();
        let pinned = install_dir.join("one.elc");
        std::fs::write(&pinned, "").unwrap();
        std::fs::write(install_dir.join("two-1.0.el"), "").unwrap();
        registry
            .save(&[
                RegistryEntry::Pinned("one".into(), pinned.clone()),
                RegistryEntry::Pinned("two".into(), install_dir.join("two-0.9.el")),
                RegistryEntry::Bare("three".into()),
            ])
            .unwrap();

        let outcomes = load_registered(&state).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].path.as_deref(), Some(pinned.as_path()));
        assert_eq!(
            outcomes[1].path.as_deref(),
            Some(install_dir.join("two-1.0.el").as_path())
        );
        assert!(outcomes[2].error.is_some());
        assert_eq!(loader.activated.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn settings_round_trip_through_entry_points() {
        let base = tempfile::tempdir().unwrap();
        let state = shared(base.path(), Arc::default());

        let mut settings = get_settings(&state).await.settings;
        settings.download_urls = vec!["https://pkgs.example/{name}.el".into()];
        let payload = update_settings(&state, settings.clone()).await.unwrap();

        assert_eq!(payload.settings, settings);
        assert_eq!(get_settings(&state).await.settings, settings);
    }
}
