use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use super::settings::{self, Settings, APP_DIR_NAME};
use crate::core::archive::extract::copy_dir_recursive;
use crate::core::downloader::Downloader;
use crate::core::error::{PkgError, PkgResult};
use crate::core::fetcher::{DownloadStrategy, Fetcher, UrlTemplateStrategy};
use crate::core::host::{Loader, Policy, StubGenerator};
use crate::core::installer::{Collaborators, Installer};
use crate::core::locator::Locator;
use crate::core::registry::{JsonRegistry, Registry};

/// Everything the entry points need, rebuilt whenever the settings change.
pub struct AppState {
    /// Directory holding the bootstrap file.
    pub base_dir: PathBuf,
    pub data_dir: PathBuf,
    pub settings: Settings,
    pub downloader: Downloader,
    pub scratch_root: PathBuf,
    loader: Arc<dyn Loader>,
    policy: Arc<dyn Policy>,
    stub_generator: Option<Arc<dyn StubGenerator>>,
    registry: Arc<dyn Registry>,
    installer: Arc<Installer>,
}

impl AppState {
    /// State rooted in the platform data directory.
    pub fn new(loader: Arc<dyn Loader>, policy: Arc<dyn Policy>) -> PkgResult<Self> {
        let base_dir = settings::default_base_dir();
        let data_dir = settings::data_dir_in(&base_dir);
        let downloader = Downloader::with_default_client()?;
        Self::with_dirs(base_dir, data_dir, downloader, loader, policy)
    }

    pub fn with_dirs(
        base_dir: PathBuf,
        data_dir: PathBuf,
        downloader: Downloader,
        loader: Arc<dyn Loader>,
        policy: Arc<dyn Policy>,
    ) -> PkgResult<Self> {
        std::fs::create_dir_all(&data_dir).map_err(|e| PkgError::io(&data_dir, e))?;
        let settings = Settings::load(&data_dir);
        let registry: Arc<dyn Registry> =
            Arc::new(JsonRegistry::new(settings.registry_path(&data_dir)));
        let scratch_root = settings::scratch_root();

        let installer = Arc::new(build_installer(
            &settings,
            &data_dir,
            &downloader,
            &scratch_root,
            Collaborators {
                loader: loader.clone(),
                registry: registry.clone(),
                policy: policy.clone(),
                stub_generator: None,
            },
        ));

        info!("modpkg data directory: {:?}", data_dir);
        Ok(Self {
            base_dir,
            data_dir,
            settings,
            downloader,
            scratch_root,
            loader,
            policy,
            stub_generator: None,
            registry,
            installer,
        })
    }

    pub fn with_stub_generator(mut self, generator: Arc<dyn StubGenerator>) -> Self {
        self.stub_generator = Some(generator);
        self.rebuild();
        self
    }

    pub fn installer(&self) -> Arc<Installer> {
        Arc::clone(&self.installer)
    }

    pub fn locator(&self) -> &Locator {
        self.installer.locator()
    }

    pub fn loader(&self) -> Arc<dyn Loader> {
        Arc::clone(&self.loader)
    }

    pub fn registry(&self) -> Arc<dyn Registry> {
        Arc::clone(&self.registry)
    }

    pub fn install_dir(&self) -> PathBuf {
        self.settings.install_dir(&self.data_dir)
    }

    pub fn save_settings(&self) -> PkgResult<()> {
        self.settings.save(&self.data_dir)
    }

    /// Replace and persist the settings, then rebuild the installer.
    pub fn update_settings(&mut self, settings: Settings) -> PkgResult<()> {
        self.settings = settings;
        self.save_settings()?;
        self.rebuild();
        Ok(())
    }

    /// Copy the data directory to `target` and record the move in the
    /// bootstrap file.
    pub fn migrate_data_dir(&mut self, target_dir: PathBuf) -> PkgResult<PathBuf> {
        let destination = if target_dir
            .file_name()
            .map(|n| n.to_string_lossy() == APP_DIR_NAME)
            .unwrap_or(false)
        {
            target_dir
        } else {
            target_dir.join(APP_DIR_NAME)
        };

        if destination == self.data_dir {
            return Ok(destination);
        }

        std::fs::create_dir_all(&destination).map_err(|e| PkgError::io(&destination, e))?;
        copy_dir_recursive(&self.data_dir, &destination)?;
        settings::write_bootstrap(&self.base_dir, &destination)?;
        info!("Data directory moved {:?} -> {:?}", self.data_dir, destination);

        self.data_dir = destination.clone();
        self.settings = Settings::load(&self.data_dir);
        self.save_settings()?;
        self.rebuild();
        Ok(destination)
    }

    fn rebuild(&mut self) {
        self.registry = Arc::new(JsonRegistry::new(self.settings.registry_path(&self.data_dir)));
        self.installer = Arc::new(build_installer(
            &self.settings,
            &self.data_dir,
            &self.downloader,
            &self.scratch_root,
            Collaborators {
                loader: self.loader.clone(),
                registry: self.registry.clone(),
                policy: self.policy.clone(),
                stub_generator: self.stub_generator.clone(),
            },
        ));
    }
}

fn build_installer(
    settings: &Settings,
    data_dir: &std::path::Path,
    downloader: &Downloader,
    scratch_root: &std::path::Path,
    collaborators: Collaborators,
) -> Installer {
    let locator = Locator::new(settings.search_roots(data_dir), settings.naming_convention());

    let mut fetcher = Fetcher::default();
    if !settings.download_urls.is_empty() {
        let strategy: Arc<dyn DownloadStrategy> = Arc::new(UrlTemplateStrategy::new(
            settings.download_urls.clone(),
            downloader.clone(),
        ));
        fetcher.push(strategy);
    }

    Installer::new(
        locator,
        fetcher,
        downloader.clone(),
        settings.install_dir(data_dir),
        scratch_root.to_path_buf(),
        collaborators,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::host::{ActivationError, FixedPolicy};
    use crate::core::testing::local_client;

    struct NullLoader;

    impl Loader for NullLoader {
        fn activate(&self, _path: &std::path::Path) -> Result<(), ActivationError> {
            Ok(())
        }

        fn deactivate(&self, _module: &str) -> PkgResult<()> {
            Ok(())
        }

        fn is_active(&self, _module: &str) -> bool {
            false
        }
    }

    fn state_in(base: &std::path::Path) -> AppState {
        AppState::with_dirs(
            base.to_path_buf(),
            settings::data_dir_in(base),
            Downloader::new(local_client()),
            Arc::new(NullLoader),
            Arc::new(FixedPolicy::approve_all()),
        )
        .unwrap()
    }

    #[test]
    fn locator_follows_settings() {
        let base = tempfile::tempdir().unwrap();
        let mut state = state_in(base.path());
        assert_eq!(state.locator().roots(), &[state.install_dir()]);

        let extra = base.path().join("extra");
        state
            .update_settings(Settings {
                extra_dirs: vec![extra.clone()],
                ..Settings::default()
            })
            .unwrap();
        assert_eq!(state.locator().roots(), &[extra, state.install_dir()]);
        assert_eq!(Settings::load(&state.data_dir), state.settings);
    }

    #[test]
    fn migration_copies_data_and_writes_bootstrap() {
        let base = tempfile::tempdir().unwrap();
        let mut state = state_in(base.path());
        std::fs::create_dir_all(state.install_dir()).unwrap();
        std::fs::write(state.install_dir().join("foo.el"), "").unwrap();

        let moved = state
            .migrate_data_dir(base.path().join("new-home"))
            .unwrap();

        assert_eq!(moved, base.path().join("new-home").join(APP_DIR_NAME));
        assert_eq!(settings::data_dir_in(base.path()), moved);
        assert!(state.install_dir().join("foo.el").exists());
        assert!(state.locator().resolve("foo", true).unwrap().is_some());
    }
}
