use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::candidate::{keep_best, CandidateFile, NamingConvention};
use crate::core::error::{PkgError, PkgResult};

/// Finds the best file for a module across an ordered set of search roots.
#[derive(Debug, Clone)]
pub struct Locator {
    /// Load directories, then supplemental directories, then the install dir.
    roots: Vec<PathBuf>,
    convention: NamingConvention,
}

impl Locator {
    pub fn new(roots: Vec<PathBuf>, convention: NamingConvention) -> Self {
        Self { roots, convention }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn convention(&self) -> &NamingConvention {
        &self.convention
    }

    /// Resolve `module` to the single best loadable file.
    ///
    /// Each root is searched with one level of package-directory recursion;
    /// across roots only extension-bearing files compete and a later root
    /// must strictly outrank to replace an earlier one.
    pub fn resolve(&self, module: &str, allow_autoload: bool) -> PkgResult<Option<CandidateFile>> {
        let mut best = None;
        for root in &self.roots {
            if let Some(found) = self.search_dir(root, Some(module), true, allow_autoload)? {
                best = keep_best(best, found, false, true);
            }
        }

        match &best {
            Some(found) => debug!("Resolved '{}' -> {:?}", module, found.source_path),
            None => debug!("'{}' not found in {} search roots", module, self.roots.len()),
        }
        Ok(best)
    }

    /// Like [`resolve`](Self::resolve) but a miss is an error.
    pub fn require(&self, module: &str, allow_autoload: bool) -> PkgResult<CandidateFile> {
        self.resolve(module, allow_autoload)?
            .ok_or_else(|| PkgError::UnresolvedModule {
                module: module.to_string(),
                detail: format!("no matching file in {} search roots", self.roots.len()),
            })
    }

    /// Best candidate directly inside `dir`.
    ///
    /// With `allow_recurse`, extensionless and versioned entries compete too;
    /// when such a directory wins, exactly one more level is searched with
    /// strict filters and that directory must contain a load file.
    pub fn search_dir(
        &self,
        dir: &Path,
        expected_prefix: Option<&str>,
        allow_recurse: bool,
        allow_autoload: bool,
    ) -> PkgResult<Option<CandidateFile>> {
        let pattern = self.convention.pattern(expected_prefix);

        let best = list_dir_sorted(dir)?
            .into_iter()
            .filter_map(|path| self.convention.parse_with(&pattern, &path, allow_autoload))
            .fold(None, |best, candidate| {
                keep_best(best, candidate, allow_recurse, allow_recurse)
            });

        let Some(best) = best else {
            return Ok(None);
        };

        if best.has_recognized_extension || !best.source_path.is_dir() {
            return Ok(Some(best));
        }

        if !allow_recurse {
            warn!(
                "Extensionless directory {:?} won a non-recursive search",
                best.source_path
            );
            return Ok(None);
        }

        debug!("Descending into package directory {:?}", best.source_path);
        match self.search_dir(&best.source_path, expected_prefix, false, allow_autoload)? {
            Some(mut inner) => {
                if inner.version.is_none() {
                    inner.version = best.version;
                }
                Ok(Some(inner))
            }
            None => Err(PkgError::UnresolvedModule {
                module: expected_prefix
                    .map(str::to_string)
                    .unwrap_or_else(|| best.module_name.clone()),
                detail: format!(
                    "package directory {:?} contains no load file",
                    best.source_path
                ),
            }),
        }
    }

    /// Files directly inside `dir` that belong to `module` under the
    /// naming convention (every version, autoload and extension variant).
    pub fn module_files_in(&self, dir: &Path, module: &str) -> PkgResult<Vec<PathBuf>> {
        let pattern = self.convention.pattern(Some(module));
        Ok(list_dir_sorted(dir)?
            .into_iter()
            .filter(|path| path.is_file())
            .filter(|path| self.convention.parse_with(&pattern, path, true).is_some())
            .collect())
    }

    /// Directories directly inside any root that name `module` under the
    /// convention (`foo`, `foo-1.2`, ...), whether or not they hold a load file.
    pub fn package_dirs(&self, module: &str) -> PkgResult<Vec<PathBuf>> {
        let pattern = self.convention.pattern(Some(module));
        let mut dirs = Vec::new();
        for root in &self.roots {
            dirs.extend(
                list_dir_sorted(root)?
                    .into_iter()
                    .filter(|path| path.is_dir())
                    .filter(|path| self.convention.parse_with(&pattern, path, true).is_some()),
            );
        }
        Ok(dirs)
    }

    /// Whether `dir` is exactly one of the configured roots.
    pub fn is_root(&self, dir: &Path) -> bool {
        let dir = canonical(dir);
        self.roots.iter().any(|root| canonical(root) == dir)
    }
}

/// Directory entries sorted by name; a missing directory has none.
fn list_dir_sorted(dir: &Path) -> PkgResult<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PkgError::io(dir, e)),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PkgError::io(dir, e))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::VersionVector;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b";; module\n").unwrap();
    }

    fn locator(roots: &[&Path]) -> Locator {
        Locator::new(
            roots.iter().map(|p| p.to_path_buf()).collect(),
            NamingConvention::default(),
        )
    }

    fn file_name(c: &CandidateFile) -> String {
        c.source_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string()
    }

    #[test]
    fn resolves_best_file_in_single_root() {
        let root = tempfile::tempdir().unwrap();
        for name in ["foo.el", "foo.elc", "foo-1.0.el", "foobar.el", "bar.elc"] {
            touch(&root.path().join(name));
        }

        let found = locator(&[root.path()]).resolve("foo", true).unwrap().unwrap();
        assert_eq!(file_name(&found), "foo-1.0.el");
        assert_eq!(found.module_name, "foo");
    }

    #[test]
    fn autoload_flag_controls_stub_files() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("foo.el"));
        touch(&root.path().join("foo-autoload.el"));

        let loc = locator(&[root.path()]);
        assert_eq!(file_name(&loc.resolve("foo", true).unwrap().unwrap()), "foo-autoload.el");
        assert_eq!(file_name(&loc.resolve("foo", false).unwrap().unwrap()), "foo.el");
    }

    #[test]
    fn missing_module_and_missing_root_are_not_errors() {
        let root = tempfile::tempdir().unwrap();
        let loc = locator(&[root.path(), Path::new("/nonexistent/modpkg/root")]);
        assert!(loc.resolve("ghost", true).unwrap().is_none());
        assert!(matches!(
            loc.require("ghost", true),
            Err(PkgError::UnresolvedModule { .. })
        ));
    }

    #[test]
    fn descends_one_level_into_versioned_package_dir() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("foo-1.0.el"));
        touch(&root.path().join("foo-2.0").join("foo.elc"));
        touch(&root.path().join("foo-2.0").join("foo.el"));
        touch(&root.path().join("foo-2.0").join("foo-3.0.el"));

        let found = locator(&[root.path()]).resolve("foo", true).unwrap().unwrap();
        assert_eq!(found.source_path, root.path().join("foo-2.0").join("foo.elc"));
        // The package directory's version is carried onto the inner file.
        assert_eq!(found.version, Some(VersionVector::from(vec![2, 0])));
    }

    #[test]
    fn empty_package_dir_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("foo-2.0")).unwrap();
        touch(&root.path().join("foo-2.0").join("README"));

        let err = locator(&[root.path()]).resolve("foo", true).unwrap_err();
        match err {
            PkgError::UnresolvedModule { module, detail } => {
                assert_eq!(module, "foo");
                assert!(detail.contains("foo-2.0"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn does_not_descend_twice() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("foo-2.0").join("foo-2.1").join("foo.el"));

        let err = locator(&[root.path()]).resolve("foo", true).unwrap_err();
        assert!(matches!(err, PkgError::UnresolvedModule { .. }));
    }

    #[test]
    fn later_root_must_strictly_outrank() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(&first.path().join("foo.el"));
        touch(&second.path().join("foo.el"));

        let loc = locator(&[first.path(), second.path()]);
        let found = loc.resolve("foo", true).unwrap().unwrap();
        assert_eq!(found.source_path, first.path().join("foo.el"));

        touch(&second.path().join("foo.elc"));
        let found = loc.resolve("foo", true).unwrap().unwrap();
        assert_eq!(found.source_path, second.path().join("foo.elc"));
    }

    #[test]
    fn newer_package_in_later_root_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(&first.path().join("foo-1.0").join("foo.el"));
        touch(&second.path().join("foo-2.0").join("foo.el"));

        let found = locator(&[first.path(), second.path()])
            .resolve("foo", true)
            .unwrap()
            .unwrap();
        assert_eq!(found.source_path, second.path().join("foo-2.0").join("foo.el"));
    }

    #[test]
    fn package_dir_version_competes_across_roots() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(&first.path().join("foo-3.0").join("foo.el"));
        touch(&second.path().join("foo-2.0.el"));

        let found = locator(&[first.path(), second.path()])
            .resolve("foo", true)
            .unwrap()
            .unwrap();
        assert_eq!(found.source_path, first.path().join("foo-3.0").join("foo.el"));
        assert_eq!(found.version, Some(VersionVector::parse("3.0").unwrap()));
    }

    #[test]
    fn package_dirs_lists_matching_directories_in_every_root() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::create_dir_all(first.path().join("foo-1.0")).unwrap();
        fs::create_dir_all(first.path().join("foobar")).unwrap();
        touch(&first.path().join("foo.el"));
        fs::create_dir_all(second.path().join("foo")).unwrap();

        let dirs = locator(&[first.path(), second.path()])
            .package_dirs("foo")
            .unwrap();
        assert_eq!(
            dirs,
            vec![first.path().join("foo-1.0"), second.path().join("foo")]
        );
    }

    #[test]
    fn module_files_in_lists_only_matching_variants() {
        let root = tempfile::tempdir().unwrap();
        for name in [
            "mod-1.2.el",
            "mod-1.2.elc",
            "mod-autoload-1.2.el",
            "mod.el",
            "model.el",
            "mod-1.2.el~",
            "other.el",
        ] {
            touch(&root.path().join(name));
        }
        fs::create_dir_all(root.path().join("mod-3.0")).unwrap();

        let files = locator(&[root.path()])
            .module_files_in(root.path(), "mod")
            .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["mod-1.2.el", "mod-1.2.elc", "mod-autoload-1.2.el", "mod.el"]
        );
    }

    #[test]
    fn is_root_matches_configured_dirs_only() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("pkg");
        fs::create_dir_all(&nested).unwrap();

        let loc = locator(&[root.path()]);
        assert!(loc.is_root(root.path()));
        assert!(!loc.is_root(&nested));
    }
}
