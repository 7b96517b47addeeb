//! Document-type cleaning profiles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ChunkingError;

/// Named cleaning configuration for a document type.
///
/// The set is closed: every profile is a variant, and its patterns are
/// fixed. Unknown names either fail ([`FromStr`]) or fall back to
/// [`CleaningProfile::Full`] ([`CleaningProfile::lookup`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CleaningProfile {
    #[default]
    Full,
    Scientific,
    Social,
    Legal,
    Technical,
    Medical,
    Financial,
    News,
}

const STANDARD_CITATIONS: &str = r"\[[\w\d\s,-]+\]|\([\w\s.,-]+(?:\d{4})\)";

impl CleaningProfile {
    /// All profiles, in display order.
    pub const ALL: [CleaningProfile; 8] = [
        CleaningProfile::Full,
        CleaningProfile::Scientific,
        CleaningProfile::Social,
        CleaningProfile::Legal,
        CleaningProfile::Technical,
        CleaningProfile::Medical,
        CleaningProfile::Financial,
        CleaningProfile::News,
    ];

    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            CleaningProfile::Full => "full",
            CleaningProfile::Scientific => "scientific",
            CleaningProfile::Social => "social",
            CleaningProfile::Legal => "legal",
            CleaningProfile::Technical => "technical",
            CleaningProfile::Medical => "medical",
            CleaningProfile::Financial => "financial",
            CleaningProfile::News => "news",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CleaningProfile::Full => "General text: keeps words and basic punctuation",
            CleaningProfile::Scientific => "Keeps units, symbols and decimal numbers",
            CleaningProfile::Social => "Keeps hashtags and mentions, no citations",
            CleaningProfile::Legal => "Keeps section marks and statute references",
            CleaningProfile::Technical => "Keeps brackets, operators, calls and acronyms",
            CleaningProfile::Medical => "Keeps drug names, dosages and percentages",
            CleaningProfile::Financial => "Keeps currency amounts and percentages",
            CleaningProfile::News => "Keeps proper names and dates",
        }
    }

    /// Character class of characters to strip (everything *not* listed).
    pub fn special_chars_pattern(&self) -> &'static str {
        match self {
            CleaningProfile::Full
            | CleaningProfile::Medical
            | CleaningProfile::News => r"[^\w\s.,;:?!\-']",
            CleaningProfile::Scientific => r"[^\w\s.,;:?!\-☉~=<>≤≥±→←↑↓°µ]",
            CleaningProfile::Social => r"[^\w\s#@.,;:?!\-']",
            CleaningProfile::Legal => r"[^\w\s.,;:?!\-§¶']",
            CleaningProfile::Technical => r"[^\w\s.,;:?!\-_=<>{}\[\]()°]",
            CleaningProfile::Financial => r"[^\w\s.,;:?!\-$%']",
        }
    }

    /// Citation markers removed when citation removal is enabled.
    pub fn citation_pattern(&self) -> Option<&'static str> {
        match self {
            CleaningProfile::Social => None,
            CleaningProfile::Legal => Some(r"\((?:\d{1,4}\s\w+\s\d{1,4})\)|\[\d+\]"),
            CleaningProfile::Technical => Some(r"\[[\w-]+\]"),
            _ => Some(STANDARD_CITATIONS),
        }
    }

    /// Spans that survive special-character stripping verbatim.
    pub fn preserve_patterns(&self) -> &'static [&'static str] {
        match self {
            CleaningProfile::Full => &[],
            CleaningProfile::Scientific => &[
                r"\d+\.\d+",
                r"[A-Z][a-z]+\d*",
                r"\d+°[CF]?",
                r"\d+%",
            ],
            CleaningProfile::Social => &[r"#[a-zA-Z0-9_]+", r"@[a-zA-Z0-9_]+"],
            CleaningProfile::Legal => &[r"§\d+", r"\d+\sU\.S\.C\.", r"\d+\sCFR"],
            CleaningProfile::Technical => &[
                r"[a-z0-9_]+\(\)",
                r"\{[^}]+\}",
                r"\[[^\]]+\]",
                r"\d+°",
                r"[A-Z]{2,}",
            ],
            CleaningProfile::Medical => &[
                r"[A-Z][a-z]+(?:-[A-Z][a-z]+)*",
                r"\d+(?:\.\d+)?%",
                r"\d+mg|\d+ml|\d+g",
            ],
            CleaningProfile::Financial => &[
                r"\$\d+(?:,\d{3})*(?:\.\d{2})?",
                r"\d+(?:\.\d{2})?%",
                r"\d+(?:,\d{3})*",
            ],
            CleaningProfile::News => &[
                r"[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*",
                r"\d{1,2}/\d{1,2}/\d{2,4}",
            ],
        }
    }

    /// Permissive lookup: unknown names resolve to [`CleaningProfile::Full`].
    pub fn lookup(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            debug!(profile = name, "Unknown cleaning profile, using full");
            CleaningProfile::Full
        })
    }

    /// Resolve a profile name, strictly or permissively.
    pub fn resolve(name: &str, strict: bool) -> Result<Self, ChunkingError> {
        if strict {
            name.parse()
        } else {
            Ok(Self::lookup(name))
        }
    }
}

impl FromStr for CleaningProfile {
    type Err = ChunkingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| ChunkingError::UnknownProfile(s.to_string()))
    }
}

impl fmt::Display for CleaningProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
