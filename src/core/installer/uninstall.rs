use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use super::workflow::Installer;
use super::UninstallReport;
use crate::core::archive::extract::remove_path;
use crate::core::error::{PkgError, PkgResult};
use crate::core::host::PromptKind;

impl Installer {
    /// Deactivate, unregister and delete `module`.
    ///
    /// Files in a search root are removed as a sibling batch; a module living
    /// in its own subdirectory has that directory removed.
    #[instrument(skip(self))]
    pub fn uninstall(&self, module: &str) -> PkgResult<UninstallReport> {
        let host = &self.collaborators;
        let active = host.loader.is_active(module);
        let mut entries = host.registry.list_entries()?;
        let registered = entries.iter().any(|entry| entry.module() == module);
        let (resolved, broken) = match self.locator.resolve(module, true) {
            Ok(found) => (found, Vec::new()),
            // A package directory without a load file must still be removable.
            Err(PkgError::UnresolvedModule { detail, .. }) => {
                warn!("'{}' has no loadable file ({}), uninstalling anyway", module, detail);
                (None, self.locator.package_dirs(module)?)
            }
            Err(e) => return Err(e),
        };

        if !active && !registered && resolved.is_none() && broken.is_empty() {
            return Err(PkgError::NotInstalled {
                module: module.to_string(),
            });
        }

        if active {
            host.loader.deactivate(module)?;
            info!("Deactivated '{}'", module);
        }

        if registered {
            entries.retain(|entry| entry.module() != module);
            host.registry.save(&entries)?;
            info!("Removed '{}' from the registry", module);
        }

        let mut removed = match resolved {
            Some(found) => self.remove_module_files(module, &found.source_path)?,
            None => Vec::new(),
        };
        for dir in &broken {
            if self.remove_package_dir(module, dir)? {
                removed.push(dir.clone());
            }
        }

        Ok(UninstallReport {
            module: module.to_string(),
            deactivated: active,
            unregistered: registered,
            removed,
        })
    }

    fn remove_module_files(&self, module: &str, file: &Path) -> PkgResult<Vec<PathBuf>> {
        let Some(dir) = file.parent() else {
            return Ok(Vec::new());
        };
        let policy = &self.collaborators.policy;

        if self.locator.is_root(dir) {
            let siblings = self.locator.module_files_in(dir, module)?;
            if siblings.is_empty() {
                return Ok(siblings);
            }
            let listing = siblings
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            if !policy.approve(PromptKind::DeleteSiblingFiles, &listing) {
                return Ok(Vec::new());
            }
            for path in &siblings {
                std::fs::remove_file(path).map_err(|e| PkgError::io(path, e))?;
            }
            info!("Deleted {} files of '{}': {}", siblings.len(), module, listing);
            return Ok(siblings);
        }

        if self.remove_package_dir(module, dir)? {
            Ok(vec![dir.to_path_buf()])
        } else {
            Ok(Vec::new())
        }
    }

    fn remove_package_dir(&self, module: &str, dir: &Path) -> PkgResult<bool> {
        let context = dir.display().to_string();
        if !self
            .collaborators
            .policy
            .approve(PromptKind::DeleteSubdirectory, &context)
        {
            return Ok(false);
        }
        remove_path(dir)?;
        info!("Deleted package directory {:?} of '{}'", dir, module);
        Ok(true)
    }
}
