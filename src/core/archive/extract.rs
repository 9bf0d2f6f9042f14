// ─── Archive Extraction ───
// Unpacks a fetched archive in a private scratch directory, then relocates
// the result into the installation tree.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::kind::{detect, ArchiveType};
use crate::core::error::{PkgError, PkgResult};
use crate::core::host::{Policy, PromptKind};

/// Extracts archives through a scratch area under `scratch_root`.
#[derive(Debug, Clone)]
pub struct Extractor {
    scratch_root: PathBuf,
}

impl Extractor {
    pub fn new(scratch_root: PathBuf) -> Self {
        Self { scratch_root }
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Extract `archive` for `module` into `destination`.
    ///
    /// A single top-level entry lands directly in `destination`; several
    /// entries are gathered under `destination/<module>/`. Returns the path
    /// of what was placed. The scratch directory is always removed.
    #[instrument(skip(self, policy))]
    pub fn extract(
        &self,
        module: &str,
        archive: &Path,
        destination: &Path,
        policy: &dyn Policy,
    ) -> PkgResult<PathBuf> {
        let file_name = archive
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let detected = detect(file_name).ok_or_else(|| PkgError::UnknownArchiveType {
            module: module.to_string(),
            file: archive.to_path_buf(),
        })?;

        let scratch = ScratchDir::create(&self.scratch_root)?;
        let working_copy = scratch.path().join(&detected.working_name);
        std::fs::copy(archive, &working_copy).map_err(|e| PkgError::io(archive, e))?;

        info!(
            "Extracting {} archive {:?} for '{}'",
            detected.kind, archive, module
        );
        unpack(module, detected.kind, &working_copy, scratch.path())?;

        let entries = list_entries(scratch.path())?;
        let target_dir = match entries.len() {
            0 => {
                return Err(PkgError::EmptyArchive {
                    module: module.to_string(),
                    archive: archive.to_path_buf(),
                })
            }
            1 => destination.to_path_buf(),
            n => {
                debug!("{} entries, gathering under {:?}", n, destination.join(module));
                destination.join(module)
            }
        };

        ensure_directory(module, destination)?;
        ensure_directory(module, &target_dir)?;
        let placements = plan_placements(module, &entries, &target_dir, policy)?;
        for (entry, target) in &placements {
            place(entry, target)?;
        }

        if entries.len() == 1 {
            Ok(placements[0].1.clone())
        } else {
            Ok(target_dir)
        }
    }
}

/// Uniquely named directory removed when dropped, on every exit path.
pub(crate) struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub(crate) fn create(root: &Path) -> PkgResult<Self> {
        let path = root.join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&path).map_err(|e| PkgError::io(&path, e))?;
        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(source) = std::fs::remove_dir_all(&self.path) {
            warn!("Failed to remove scratch dir {:?}: {}", self.path, source);
        }
    }
}

fn unpack(module: &str, kind: ArchiveType, working_copy: &Path, scratch: &Path) -> PkgResult<()> {
    match kind {
        ArchiveType::Bz2 => run_tool(
            module,
            "bunzip2",
            &[working_copy.as_os_str()],
            scratch,
            working_copy,
        ),
        ArchiveType::Gz => run_tool(
            module,
            "gunzip",
            &[working_copy.as_os_str()],
            scratch,
            working_copy,
        ),
        ArchiveType::Zip => {
            extract_zip_file(working_copy, scratch)?;
            remove_file(working_copy)
        }
        ArchiveType::Tar | ArchiveType::TarGz => {
            let flags = if kind == ArchiveType::TarGz { "-xzf" } else { "-xf" };
            run_tool(
                module,
                "tar",
                &[
                    OsStr::new(flags),
                    working_copy.as_os_str(),
                    OsStr::new("-C"),
                    scratch.as_os_str(),
                ],
                scratch,
                working_copy,
            )?;
            remove_file(working_copy)
        }
    }
}

/// Run an external tool; a non-zero exit is fatal and carries its output.
fn run_tool(
    module: &str,
    tool: &str,
    args: &[&OsStr],
    cwd: &Path,
    target: &Path,
) -> PkgResult<()> {
    debug!("Running {} {:?} in {:?}", tool, args, cwd);
    let output = Command::new(tool)
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| PkgError::ExternalTool {
            module: module.to_string(),
            tool: tool.to_string(),
            target: target.to_path_buf(),
            code: None,
            output: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(PkgError::ExternalTool {
            module: module.to_string(),
            tool: tool.to_string(),
            target: target.to_path_buf(),
            code: output.status.code(),
            output: format!(
                "{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            ),
        });
    }
    Ok(())
}

fn extract_zip_file(zip_path: &Path, out_root: &Path) -> PkgResult<()> {
    let zip_file = std::fs::File::open(zip_path).map_err(|e| PkgError::io(zip_path, e))?;
    let mut archive = zip::ZipArchive::new(zip_file)?;

    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;
        let enclosed_name = zipped
            .enclosed_name()
            .ok_or_else(|| PkgError::Other(format!("Invalid zip entry path: {}", zipped.name())))?;

        let mut rel_path = PathBuf::new();
        for component in enclosed_name.components() {
            if let Component::Normal(part) = component {
                rel_path.push(part);
            }
        }
        if rel_path.as_os_str().is_empty() {
            continue;
        }

        let out_path = out_root.join(rel_path);
        if zipped.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| PkgError::io(&out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PkgError::io(parent, e))?;
        }
        let mut out = std::fs::File::create(&out_path).map_err(|e| PkgError::io(&out_path, e))?;
        std::io::copy(&mut zipped, &mut out).map_err(|e| PkgError::io(&out_path, e))?;
    }

    Ok(())
}

fn list_entries(dir: &Path) -> PkgResult<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| PkgError::io(dir, e))? {
        entries.push(entry.map_err(|e| PkgError::io(dir, e))?.path());
    }
    entries.sort();
    Ok(entries)
}

fn ensure_directory(module: &str, dir: &Path) -> PkgResult<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(PkgError::DestinationNotDirectory {
            module: module.to_string(),
            path: dir.to_path_buf(),
        });
    }
    std::fs::create_dir_all(dir).map_err(|e| PkgError::io(dir, e))
}

/// Pair every entry with its target in `dir`.
///
/// Every existing target is approved before anything moves, so a declined
/// overwrite leaves `dir` untouched.
fn plan_placements(
    module: &str,
    entries: &[PathBuf],
    dir: &Path,
    policy: &dyn Policy,
) -> PkgResult<Vec<(PathBuf, PathBuf)>> {
    let mut placements = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = entry
            .file_name()
            .ok_or_else(|| PkgError::Other(format!("Entry without a name: {:?}", entry)))?;
        let target = dir.join(name);

        if target.symlink_metadata().is_ok()
            && !policy.approve(PromptKind::OverwriteExistingFile, &target.to_string_lossy())
        {
            return Err(PkgError::OverwriteDeclined {
                module: module.to_string(),
                path: target,
            });
        }
        placements.push((entry.clone(), target));
    }
    Ok(placements)
}

/// Move an approved entry to `target`, replacing what is there.
fn place(entry: &Path, target: &Path) -> PkgResult<()> {
    if target.symlink_metadata().is_ok() {
        remove_path(target)?;
    }
    move_path(entry, target)?;
    debug!("Placed {:?}", target);
    Ok(())
}

/// Rename, falling back to copy + delete across filesystems.
pub(crate) fn move_path(source: &Path, destination: &Path) -> PkgResult<()> {
    if std::fs::rename(source, destination).is_ok() {
        return Ok(());
    }

    if source.is_dir() {
        std::fs::create_dir_all(destination).map_err(|e| PkgError::io(destination, e))?;
        copy_dir_recursive(source, destination)?;
    } else {
        std::fs::copy(source, destination).map_err(|e| PkgError::io(destination, e))?;
    }
    remove_path(source)
}

pub(crate) fn remove_path(path: &Path) -> PkgResult<()> {
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| PkgError::io(path, e))
}

fn remove_file(path: &Path) -> PkgResult<()> {
    std::fs::remove_file(path).map_err(|e| PkgError::io(path, e))
}

pub(crate) fn copy_dir_recursive(source: &Path, destination: &Path) -> PkgResult<()> {
    for entry in std::fs::read_dir(source).map_err(|e| PkgError::io(source, e))? {
        let entry = entry.map_err(|e| PkgError::io(source, e))?;
        let src_path = entry.path();
        let dst_path = destination.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| PkgError::io(&src_path, e))?;

        if file_type.is_dir() {
            std::fs::create_dir_all(&dst_path).map_err(|e| PkgError::io(&dst_path, e))?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path).map_err(|e| PkgError::io(&dst_path, e))?;
        }
    }
    Ok(())
}
