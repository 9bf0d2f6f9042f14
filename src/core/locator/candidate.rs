// ─── Candidate Files ───
// Naming convention for module files and the preference rules between them.
//
//   <name>[-autoload][-<version>][.<compiled>|.<source>]

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::version::VersionVector;

pub const DEFAULT_SOURCE_EXTENSION: &str = "el";
pub const DEFAULT_COMPILED_EXTENSION: &str = "elc";
const AUTOLOAD_MARKER: &str = "-autoload";

/// A filesystem entry whose name matched the naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFile {
    pub source_path: PathBuf,
    pub module_name: String,
    pub is_autoload: bool,
    pub version: Option<VersionVector>,
    pub has_recognized_extension: bool,
    /// Only ever `true` together with `has_recognized_extension`.
    pub is_compiled: bool,
}

impl CandidateFile {
    /// Preference key: versioned over unversioned, newer over older,
    /// autoload stub over full file, compiled over source.
    fn rank(&self) -> (Option<&VersionVector>, bool, bool) {
        (self.version.as_ref(), self.is_autoload, self.is_compiled)
    }

    /// Compare two candidates by preference only (paths are ignored).
    pub fn preference(&self, other: &CandidateFile) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Fold step over candidates.
///
/// `candidate` is dropped outright when it has no recognized extension and
/// directories are not allowed, or when it is versioned and versions are not
/// allowed. Otherwise it replaces `current` only when strictly preferred, so
/// among equals the first one seen is kept.
///
/// Preference is one lexicographic key (version, then autoload, then
/// compiled) rather than a first-applicable rule list: a newer full file
/// beats an older autoload stub (`foo-2.0.el` over `foo-autoload-1.0.el`),
/// which keeps the fold independent of input order.
pub fn keep_best(
    current: Option<CandidateFile>,
    candidate: CandidateFile,
    allow_directories: bool,
    allow_versioned: bool,
) -> Option<CandidateFile> {
    if !candidate.has_recognized_extension && !allow_directories {
        return current;
    }
    if candidate.version.is_some() && !allow_versioned {
        return current;
    }

    match current {
        None => Some(candidate),
        Some(current) => {
            if candidate.preference(&current) == Ordering::Greater {
                Some(candidate)
            } else {
                Some(current)
            }
        }
    }
}

/// Filename grammar for one pair of source/compiled extensions.
#[derive(Debug, Clone)]
pub struct NamingConvention {
    source_extension: String,
    compiled_extension: String,
    any_name: Regex,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_EXTENSION, DEFAULT_COMPILED_EXTENSION)
    }
}

impl NamingConvention {
    pub fn new(source_extension: &str, compiled_extension: &str) -> Self {
        let any_name = build_pattern(None, source_extension, compiled_extension);
        Self {
            source_extension: source_extension.to_string(),
            compiled_extension: compiled_extension.to_string(),
            any_name,
        }
    }

    pub fn source_extension(&self) -> &str {
        &self.source_extension
    }

    pub fn compiled_extension(&self) -> &str {
        &self.compiled_extension
    }

    /// Pattern matching files of exactly `module` (any variant), or of any
    /// module when `None`.
    pub fn pattern(&self, module: Option<&str>) -> Regex {
        match module {
            None => self.any_name.clone(),
            Some(name) => build_pattern(
                Some(name),
                &self.source_extension,
                &self.compiled_extension,
            ),
        }
    }

    /// Match a path's file name against the convention.
    ///
    /// Returns `None` when the name does not match, or when it carries the
    /// autoload marker and `allow_autoload` is false.
    pub fn parse_candidate(
        &self,
        expected_prefix: Option<&str>,
        path: &Path,
        allow_autoload: bool,
    ) -> Option<CandidateFile> {
        let pattern = self.pattern(expected_prefix);
        self.parse_with(&pattern, path, allow_autoload)
    }

    /// Same as [`parse_candidate`](Self::parse_candidate) with a pattern
    /// compiled once by the caller.
    pub fn parse_with(
        &self,
        pattern: &Regex,
        path: &Path,
        allow_autoload: bool,
    ) -> Option<CandidateFile> {
        let file_name = path.file_name()?.to_str()?;
        let caps = pattern.captures(file_name)?;

        let is_autoload = caps.name("autoload").is_some();
        if is_autoload && !allow_autoload {
            return None;
        }

        // A version segment too large for `u64` makes the name a non-match.
        let version = match caps.name("version") {
            Some(m) => Some(VersionVector::parse(m.as_str()).ok()?),
            None => None,
        };

        let extension = caps.name("ext").map(|m| m.as_str());
        let is_compiled = extension == Some(self.compiled_extension.as_str());

        Some(CandidateFile {
            source_path: path.to_path_buf(),
            module_name: caps.name("name")?.as_str().to_string(),
            is_autoload,
            version,
            has_recognized_extension: extension.is_some(),
            is_compiled,
        })
    }
}

fn build_pattern(module: Option<&str>, source_extension: &str, compiled_extension: &str) -> Regex {
    let name = match module {
        Some(module) => regex::escape(module),
        None => ".+?".to_string(),
    };
    let pattern = format!(
        r"^(?P<name>{name})(?P<autoload>{marker})?(?:-(?P<version>[0-9]+(?:\.[0-9]+)*))?(?:\.(?P<ext>{compiled}|{source}))?$",
        name = name,
        marker = regex::escape(AUTOLOAD_MARKER),
        compiled = regex::escape(compiled_extension),
        source = regex::escape(source_extension),
    );
    // Every interpolated piece is escaped, so the pattern is always valid.
    Regex::new(&pattern).unwrap_or_else(|e| panic!("invalid naming pattern {pattern}: {e}"))
}
