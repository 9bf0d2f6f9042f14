// ─── Version Vector ───
// Dot-delimited version numbers carried by module filenames (`foo-1.2.el`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{PkgError, PkgResult};

/// Ordered sequence of non-negative integers, most significant first.
///
/// Ordering is componentwise; when one vector is a prefix of the other the
/// longer one is greater, so `1.2 < 1.2.1`, `1.10 > 1.9` and `2 > 1.9.9`.
/// An absent version (`None`) sorts below every present one, which is what
/// `Option<VersionVector>`'s derived ordering gives for free.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionVector(Vec<u64>);

impl VersionVector {
    /// Parse `"1.2.3"` into `[1, 2, 3]`.
    ///
    /// Every `.`-separated segment must be a non-negative integer that fits
    /// in a `u64`; larger segments are rejected. Segments are stored as
    /// numbers, so `01.2` parses like `1.2` and displays as `1.2`.
    pub fn parse(text: &str) -> PkgResult<Self> {
        let components = text
            .split('.')
            .map(|segment| {
                if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(PkgError::VersionParse {
                        text: text.to_string(),
                        segment: segment.to_string(),
                    });
                }
                segment.parse::<u64>().map_err(|_| PkgError::VersionParse {
                    text: text.to_string(),
                    segment: segment.to_string(),
                })
            })
            .collect::<PkgResult<Vec<_>>>()?;

        Ok(Self(components))
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

impl From<Vec<u64>> for VersionVector {
    fn from(components: Vec<u64>) -> Self {
        Self(components)
    }
}

impl FromStr for VersionVector {
    type Err = PkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(".");
        f.write_str(&joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    fn v(text: &str) -> VersionVector {
        VersionVector::parse(text).unwrap()
    }

    #[test]
    fn parse_splits_on_dots() {
        assert_eq!(v("1.2.3").components(), &[1, 2, 3]);
        assert_eq!(v("20240101").components(), &[20240101]);
    }

    #[test]
    fn parse_then_join_gives_back_the_text() {
        for text in ["0", "1.2", "1.10.0", "3.0.0.7", "42"] {
            assert_eq!(v(text).to_string(), text);
        }
    }

    #[test]
    fn parse_rejects_non_numeric_segments() {
        for text in ["1.a", "", "1..2", "1.2-beta", "-1", " 1"] {
            let err = VersionVector::parse(text).unwrap_err();
            assert!(matches!(err, PkgError::VersionParse { .. }), "{text}");
        }
    }

    #[test]
    fn longer_vector_wins_on_shared_prefix() {
        assert!(v("1.2") < v("1.2.1"));
        assert_eq!(v("1.2.1").cmp(&v("1.2")), Ordering::Greater);
    }

    #[test]
    fn components_compare_numerically() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("2") > v("1.9.9"));
        assert_eq!(v("1.2").cmp(&v("1.2")), Ordering::Equal);
    }

    #[test]
    fn absent_version_is_lowest() {
        assert!(None < Some(v("0")));
        assert_eq!(None::<VersionVector>.cmp(&None), Ordering::Equal);
    }

    #[test]
    fn leading_zeros_normalize_and_huge_segments_fail() {
        assert_eq!(v("01.2"), v("1.2"));
        assert_eq!(v("01.2").to_string(), "1.2");

        let err = VersionVector::parse("1.99999999999999999999").unwrap_err();
        assert!(matches!(err, PkgError::VersionParse { ref segment, .. } if segment == "99999999999999999999"));
    }
}
