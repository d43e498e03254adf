//! Version tag allocation and parsing.
//!
//! Snapshots are addressed by git tags of the form `<skill>/v<N>` where N
//! is a positive integer, allocated monotonically per skill. Sequences
//! tolerate gaps: deleting v2 of {v1, v2, v3} never causes v2 to be
//! reissued; the next save yields v4.

use std::fmt;

use serde::Serialize;

/// A fully qualified snapshot identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct VersionTag {
    pub skill: String,
    pub number: u32,
}

impl VersionTag {
    #[must_use]
    pub fn new(skill: impl Into<String>, number: u32) -> Self {
        Self {
            skill: skill.into(),
            number,
        }
    }

    /// Parse a full tag (`name/vN`). Malformed tags yield `None` so a
    /// stray tag in the store never fails a whole operation.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let (skill, version) = tag.rsplit_once("/v")?;
        if skill.is_empty() || version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Reject leading zeros so numbers round-trip through Display.
        if version.len() > 1 && version.starts_with('0') {
            return None;
        }
        let number: u32 = version.parse().ok()?;
        if number == 0 {
            return None;
        }
        Some(Self::new(skill, number))
    }

    /// Parse a tag and keep it only if it belongs to `skill`.
    #[must_use]
    pub fn parse_for(skill: &str, tag: &str) -> Option<u32> {
        let parsed = Self::parse(tag)?;
        (parsed.skill == skill).then_some(parsed.number)
    }

    /// Accept user input as either `vN`, `N`, or the full `skill/vN` form.
    #[must_use]
    pub fn parse_user_input(skill: &str, input: &str) -> Option<u32> {
        if let Some(number) = Self::parse_for(skill, input) {
            return Some(number);
        }
        let trimmed = input.strip_prefix('v').unwrap_or(input);
        let number: u32 = trimmed.parse().ok()?;
        (number > 0).then_some(number)
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/v{}", self.skill, self.number)
    }
}

/// Next identifier for a skill given its existing version numbers:
/// `max + 1`, or 1 for the first snapshot.
#[must_use]
pub fn next_version(existing: &[u32]) -> u32 {
    existing.iter().copied().max().map_or(1, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_and_parses_round_trip() {
        let tag = VersionTag::new("my-skill", 7);
        assert_eq!(tag.to_string(), "my-skill/v7");
        assert_eq!(VersionTag::parse("my-skill/v7"), Some(tag));
    }

    #[test]
    fn ignores_malformed_tags() {
        for bad in ["my-skill", "my-skill/v", "my-skill/vX", "/v3", "my-skill/v03", "my-skill/v0"] {
            assert_eq!(VersionTag::parse(bad), None, "{bad}");
        }
    }

    #[test]
    fn parse_for_filters_other_skills() {
        assert_eq!(VersionTag::parse_for("alpha", "alpha/v2"), Some(2));
        assert_eq!(VersionTag::parse_for("alpha", "beta/v2"), None);
    }

    #[test]
    fn parse_user_input_accepts_short_forms() {
        assert_eq!(VersionTag::parse_user_input("alpha", "v3"), Some(3));
        assert_eq!(VersionTag::parse_user_input("alpha", "3"), Some(3));
        assert_eq!(VersionTag::parse_user_input("alpha", "alpha/v3"), Some(3));
        assert_eq!(VersionTag::parse_user_input("alpha", "beta/v3"), None);
        assert_eq!(VersionTag::parse_user_input("alpha", "v0"), None);
    }

    #[test]
    fn next_version_is_monotone_and_gap_tolerant() {
        assert_eq!(next_version(&[]), 1);
        assert_eq!(next_version(&[1, 2, 3]), 4);
        // v2 deleted: never reuse it.
        assert_eq!(next_version(&[1, 3]), 4);
    }
}
