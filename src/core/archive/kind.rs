use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Archive formats recognized from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveType {
    Bz2,
    Gz,
    Zip,
    Tar,
    /// `.tgz` and `.tar.gz`.
    TarGz,
}

impl fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveType::Bz2 => write!(f, "bz2"),
            ArchiveType::Gz => write!(f, "gz"),
            ArchiveType::Zip => write!(f, "zip"),
            ArchiveType::Tar => write!(f, "tar"),
            ArchiveType::TarGz => write!(f, "tar.gz"),
        }
    }
}

/// Result of matching a file name against the suffix table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedArchive {
    pub kind: ArchiveType,
    /// The file name with any trailing numeric disambiguator removed
    /// (`pkg.tar.gz.2` -> `pkg.tar.gz`).
    pub working_name: String,
}

/// Ordered suffix table; the first match wins.
const SUFFIXES: [(&str, ArchiveType); 6] = [
    ("tgz", ArchiveType::TarGz),
    ("tar.gz", ArchiveType::TarGz),
    ("tar", ArchiveType::Tar),
    ("zip", ArchiveType::Zip),
    ("gz", ArchiveType::Gz),
    ("bz2", ArchiveType::Bz2),
];

fn suffix_patterns() -> &'static [(Regex, ArchiveType)] {
    static PATTERNS: OnceLock<Vec<(Regex, ArchiveType)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        SUFFIXES
            .iter()
            .map(|(suffix, kind)| {
                // A transfer tool may have saved the file as `name.1`, `name.2`, ...
                let pattern = format!(r"\.{}(?P<disambiguator>\.[0-9]+)?$", regex::escape(suffix));
                let regex = Regex::new(&pattern)
                    .unwrap_or_else(|e| panic!("invalid archive suffix pattern {pattern}: {e}"));
                (regex, *kind)
            })
            .collect()
    })
}

/// Detect the archive type of `file_name`, tolerating a numeric disambiguator.
pub fn detect(file_name: &str) -> Option<DetectedArchive> {
    suffix_patterns().iter().find_map(|(pattern, kind)| {
        let caps = pattern.captures(file_name)?;
        let working_name = match caps.name("disambiguator") {
            Some(m) => file_name[..m.start()].to_string(),
            None => file_name.to_string(),
        };
        Some(DetectedArchive {
            kind: *kind,
            working_name,
        })
    })
}

pub fn detect_type(file_name: &str) -> Option<ArchiveType> {
    detect(file_name).map(|d| d.kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_suffix() {
        assert_eq!(detect_type("pkg.tgz"), Some(ArchiveType::TarGz));
        assert_eq!(detect_type("pkg-1.3.tar.gz"), Some(ArchiveType::TarGz));
        assert_eq!(detect_type("pkg.tar"), Some(ArchiveType::Tar));
        assert_eq!(detect_type("pkg.zip"), Some(ArchiveType::Zip));
        assert_eq!(detect_type("foo.el.gz"), Some(ArchiveType::Gz));
        assert_eq!(detect_type("foo.el.bz2"), Some(ArchiveType::Bz2));
    }

    #[test]
    fn non_archives_are_none() {
        assert_eq!(detect_type("pkg.txt"), None);
        assert_eq!(detect_type("foo.el"), None);
        assert_eq!(detect_type("zip"), None);
        assert_eq!(detect_type("pkg.tar.gz.bak"), None);
    }

    #[test]
    fn tolerates_numeric_disambiguator() {
        let found = detect("pkg-1.3.tar.gz.2").unwrap();
        assert_eq!(found.kind, ArchiveType::TarGz);
        assert_eq!(found.kind.to_string(), "tar.gz");
        assert_eq!(found.working_name, "pkg-1.3.tar.gz");

        let found = detect("foo.el.gz.11").unwrap();
        assert_eq!(found.kind, ArchiveType::Gz);
        assert_eq!(found.working_name, "foo.el.gz");
    }

    #[test]
    fn working_name_unchanged_without_disambiguator() {
        assert_eq!(detect("pkg.zip").unwrap().working_name, "pkg.zip");
    }
}
