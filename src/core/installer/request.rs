use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::core::error::{PkgError, PkgResult};

/// What the caller asked to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// A bare module identifier.
    Named,
    /// An existing file on disk, used as-is.
    LocalFile(PathBuf),
    /// A remote artifact fetched directly.
    Url(String),
}

/// A classified install request with its governing module name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub module: String,
    pub kind: RequestKind,
}

impl InstallRequest {
    /// Classify `input` and derive the module name, preferring `explicit_name`.
    pub fn classify(input: &str, explicit_name: Option<&str>) -> PkgResult<Self> {
        let kind = if url_pattern().is_match(input) {
            RequestKind::Url(input.to_string())
        } else if Path::new(input).is_file() {
            RequestKind::LocalFile(PathBuf::from(input))
        } else {
            RequestKind::Named
        };

        let module = match (explicit_name, &kind) {
            (Some(name), _) => name.to_string(),
            (None, RequestKind::Named) => input.to_string(),
            (None, RequestKind::LocalFile(path)) => {
                let base = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default();
                infer_module_name(base).ok_or_else(|| PkgError::NameInference {
                    input: input.to_string(),
                })?
            }
            (None, RequestKind::Url(url)) => url_basename(url)
                .and_then(infer_module_name)
                .ok_or_else(|| PkgError::NameInference {
                    input: input.to_string(),
                })?,
        };

        Ok(Self { module, kind })
    }

    /// Request for a dependency discovered during activation.
    pub fn named(module: &str) -> Self {
        Self {
            module: module.to_string(),
            kind: RequestKind::Named,
        }
    }

    pub fn is_named(&self) -> bool {
        self.kind == RequestKind::Named
    }
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://").expect("valid URL regex"))
}

fn url_basename(url: &str) -> Option<&str> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
}

/// Module name from a file name: the leading lowercase token run with any
/// trailing separator/version suffix removed.
///
/// `foo-bar-1.2.tar.gz` gives `foo-bar`, `mode_3.el` gives `mode`.
pub fn infer_module_name(basename: &str) -> Option<String> {
    static LEADING: OnceLock<Regex> = OnceLock::new();
    static TRAILING: OnceLock<Regex> = OnceLock::new();
    let leading = LEADING.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_-]*").expect("valid regex"));
    let trailing = TRAILING
        .get_or_init(|| Regex::new(r"[-_]+[0-9][0-9_-]*$|[-_]+$").expect("valid regex"));

    let run = leading.find(basename)?.as_str();
    let name = trailing.replace(run, "");
    if name.is_empty() {
        None
    } else {
        Some(name.into_owned())
    }
}
