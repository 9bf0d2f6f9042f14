use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::installing::InstallingSet;
use super::request::{InstallRequest, RequestKind};
use super::InstallReport;
use crate::core::archive::extract::ScratchDir;
use crate::core::archive::{detect_type, Extractor};
use crate::core::downloader::Downloader;
use crate::core::error::{PkgError, PkgResult};
use crate::core::fetcher::{fetch_url, Fetcher};
use crate::core::host::{ActivationError, Loader, Policy, PromptKind, StubGenerator};
use crate::core::locator::{CandidateFile, Locator};
use crate::core::registry::{Registry, RegistryEntry};

/// Host-side services the installer drives.
#[derive(Clone)]
pub struct Collaborators {
    pub loader: Arc<dyn Loader>,
    pub registry: Arc<dyn Registry>,
    pub policy: Arc<dyn Policy>,
    pub stub_generator: Option<Arc<dyn StubGenerator>>,
}

/// Installs modules and their dependencies.
///
/// Each request runs Classify, Acquire, Stage, Activate and Finalize.
/// Missing dependencies reported during activation are installed
/// recursively before activation is retried.
pub struct Installer {
    pub(super) locator: Locator,
    fetcher: Fetcher,
    downloader: Downloader,
    extractor: Extractor,
    install_dir: PathBuf,
    pub(super) collaborators: Collaborators,
    installing: InstallingSet,
}

/// Result of the Acquire stage.
enum Acquired {
    /// Already resolvable; nothing to stage.
    Resolved(CandidateFile),
    /// An artifact to stage; downloads live in the scratch directory.
    Artifact(PathBuf),
}

type InstallFuture<'a> = Pin<Box<dyn Future<Output = PkgResult<InstallReport>> + Send + 'a>>;

impl Installer {
    pub fn new(
        locator: Locator,
        fetcher: Fetcher,
        downloader: Downloader,
        install_dir: PathBuf,
        scratch_root: PathBuf,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            locator,
            fetcher,
            downloader,
            extractor: Extractor::new(scratch_root),
            install_dir,
            collaborators,
            installing: InstallingSet::new(),
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn installing(&self) -> &InstallingSet {
        &self.installing
    }

    /// Install from a module name, local file path or URL.
    pub async fn install(&self, input: &str, explicit_name: Option<&str>) -> PkgResult<InstallReport> {
        let request = InstallRequest::classify(input, explicit_name)?;
        self.run(request).await
    }

    /// Full workflow for one request. Boxed so dependency installs can recurse.
    fn run(&self, request: InstallRequest) -> InstallFuture<'_> {
        Box::pin(async move {
            let module = request.module.clone();
            info!("Installing '{}' ({:?})", module, request.kind);

            let mut scratch = None;
            let resolved = match self.acquire(&request, &mut scratch).await? {
                Acquired::Resolved(found) => {
                    debug!("'{}' already resolves to {:?}", module, found.source_path);
                    found
                }
                Acquired::Artifact(artifact) => self.stage(&module, &artifact)?,
            };
            // Downloaded artifacts are no longer needed once staged.
            drop(scratch);

            let (dependencies, stub) = self.activate(&module, &resolved).await?;
            let registered = self.finalize(&module, &resolved.source_path)?;

            info!("Installed '{}' from {:?}", module, resolved.source_path);
            Ok(InstallReport {
                module,
                resolved: resolved.source_path,
                dependencies,
                registered,
                stub,
            })
        })
    }

    // ── Acquire ─────────────────────────────────────────

    async fn acquire(
        &self,
        request: &InstallRequest,
        scratch: &mut Option<ScratchDir>,
    ) -> PkgResult<Acquired> {
        let module = request.module.as_str();
        match &request.kind {
            RequestKind::LocalFile(path) => Ok(Acquired::Artifact(path.clone())),
            RequestKind::Url(url) => {
                let dir = scratch.insert(ScratchDir::create(self.extractor.scratch_root())?);
                let path = fetch_url(&self.downloader, url, dir.path()).await?;
                Ok(Acquired::Artifact(path))
            }
            RequestKind::Named => {
                if let Some(found) = self.locator.resolve(module, true)? {
                    return Ok(Acquired::Resolved(found));
                }
                if !self
                    .collaborators
                    .policy
                    .approve(PromptKind::DownloadWithoutLocalCopy, module)
                {
                    return Err(PkgError::Fetch {
                        module: module.to_string(),
                        reason: "no local copy and download was declined".into(),
                    });
                }
                let dir = scratch.insert(ScratchDir::create(self.extractor.scratch_root())?);
                let path = self.fetcher.fetch(module, dir.path()).await?;
                Ok(Acquired::Artifact(path))
            }
        }
    }

    // ── Stage ───────────────────────────────────────────

    #[instrument(skip(self))]
    fn stage(&self, module: &str, artifact: &Path) -> PkgResult<CandidateFile> {
        let file_name = artifact
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        let staged = if detect_type(file_name).is_some() {
            self.extractor.extract(
                module,
                artifact,
                &self.install_dir,
                self.collaborators.policy.as_ref(),
            )?
        } else {
            self.copy_into_install_dir(module, artifact)?
        };

        self.locator
            .resolve(module, true)?
            .ok_or_else(|| PkgError::NoLoadableFile {
                module: module.to_string(),
                staged,
            })
    }

    fn copy_into_install_dir(&self, module: &str, artifact: &Path) -> PkgResult<PathBuf> {
        std::fs::create_dir_all(&self.install_dir)
            .map_err(|e| PkgError::io(&self.install_dir, e))?;

        let name = artifact.file_name().ok_or_else(|| {
            PkgError::Other(format!("Artifact for '{}' has no file name: {:?}", module, artifact))
        })?;
        let target = self.install_dir.join(name);

        if target.exists() {
            if same_file(&target, artifact) {
                debug!("{:?} is already in the install directory", target);
                return Ok(target);
            }
            let context = target.display().to_string();
            if !self
                .collaborators
                .policy
                .approve(PromptKind::OverwriteExistingFile, &context)
            {
                return Err(PkgError::OverwriteDeclined {
                    module: module.to_string(),
                    path: target,
                });
            }
        }

        std::fs::copy(artifact, &target).map_err(|e| PkgError::io(&target, e))?;
        debug!("Copied {:?} -> {:?}", artifact, target);
        Ok(target)
    }

    // ── Activate ────────────────────────────────────────

    /// Activation retry loop. Returns the dependencies installed on the way
    /// and the fast-load stub that replaced the file, if any.
    async fn activate(
        &self,
        module: &str,
        resolved: &CandidateFile,
    ) -> PkgResult<(Vec<String>, Option<PathBuf>)> {
        let _guard = self.installing.enter(module);
        let loader = &self.collaborators.loader;

        let mut current = resolved.source_path.clone();
        let mut dependencies: Vec<String> = Vec::new();
        let mut stub = None;
        let mut stub_done = false;

        loop {
            match loader.activate(&current) {
                Ok(()) => {
                    if stub_done {
                        break;
                    }
                    stub_done = true;
                    match self.generate_stub(module, resolved)? {
                        Some(generated) => {
                            info!("Reactivating '{}' from stub {:?}", module, generated);
                            loader.deactivate(module)?;
                            current = generated.clone();
                            stub = Some(generated);
                        }
                        None => break,
                    }
                }
                Err(ActivationError::MissingDependency(dependency)) => {
                    if self.installing.contains(&dependency) {
                        let cycle = self.installing.cycle_through(&dependency);
                        let missing = cycle.get(1).cloned().unwrap_or_else(|| module.to_string());
                        warn!("Dependency cycle: {}", cycle.join(" -> "));
                        return Err(PkgError::CircularDependency {
                            requesting: dependency,
                            missing,
                            cycle,
                        });
                    }
                    if dependencies.contains(&dependency) {
                        return Err(PkgError::DependencyStillMissing {
                            module: module.to_string(),
                            dependency,
                        });
                    }

                    info!("'{}' needs '{}', installing it first", module, dependency);
                    self.run(InstallRequest::named(&dependency)).await?;
                    dependencies.push(dependency);
                }
                Err(ActivationError::Other(message)) => {
                    return Err(PkgError::Activation {
                        module: module.to_string(),
                        message,
                    });
                }
            }
        }

        Ok((dependencies, stub))
    }

    fn generate_stub(&self, module: &str, resolved: &CandidateFile) -> PkgResult<Option<PathBuf>> {
        let Some(generator) = &self.collaborators.stub_generator else {
            return Ok(None);
        };
        if resolved.is_autoload || !generator.has_inline_markers(&resolved.source_path)? {
            return Ok(None);
        }
        if !self
            .collaborators
            .policy
            .approve(PromptKind::GenerateFastLoadStub, module)
        {
            return Ok(None);
        }
        generator.generate_stub(&resolved.source_path)
    }

    // ── Finalize ────────────────────────────────────────

    fn finalize(&self, module: &str, resolved: &Path) -> PkgResult<bool> {
        let registry = &self.collaborators.registry;
        let mut entries = registry.list_entries()?;
        if entries.iter().any(|entry| entry.module() == module) {
            return Ok(false);
        }
        if !self
            .collaborators
            .policy
            .approve(PromptKind::RegisterForAutostart, module)
        {
            return Ok(false);
        }

        entries.push(RegistryEntry::Pinned(module.to_string(), resolved.to_path_buf()));
        registry.save(&entries)?;
        info!("Registered '{}' for activation at startup", module);
        Ok(true)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
