//! Profile-driven text cleaning.

use std::collections::HashMap;
use std::ops::Range;

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use tracing::trace;

use super::markdown::{strip_line_markers, strip_markdown};
use super::protect::Protected;
use super::stopwords::Stopwords;
use crate::types::{ChunkingConfig, ChunkingError, CleaningProfile, Result, UnitKind};

/// Compiled patterns for one profile.
struct ProfilePatterns {
    special_chars: Regex,
    citation: Option<Regex>,
    preserve: Vec<Regex>,
}

impl ProfilePatterns {
    fn compile(profile: CleaningProfile) -> Self {
        Self {
            special_chars: Regex::new(profile.special_chars_pattern())
                .expect("profile special character class"),
            citation: profile
                .citation_pattern()
                .map(|p| Regex::new(p).expect("profile citation pattern")),
            preserve: profile
                .preserve_patterns()
                .iter()
                .map(|p| Regex::new(p).expect("profile preserve pattern"))
                .collect(),
        }
    }
}

lazy_static! {
    static ref PROFILES: HashMap<CleaningProfile, ProfilePatterns> = CleaningProfile::ALL
        .into_iter()
        .map(|p| (p, ProfilePatterns::compile(p)))
        .collect();
    static ref WS_ALL: Regex = Regex::new(r"\s+").expect("whitespace pattern");
    static ref WS_INLINE: Regex = Regex::new(r"[^\S\n]+").expect("inline whitespace pattern");
    static ref LINE_BREAKS: Regex = Regex::new(r" *\n\s*").expect("line break pattern");
    static ref SPACE_BEFORE_PUNCT: Regex = Regex::new(r" +([.,;:?!])").expect("punctuation pattern");
    static ref SPACE_AFTER_PUNCT: Regex = Regex::new(r"([.,;:?!]) +").expect("punctuation pattern");
    static ref REPEATED_PERIODS: Regex = Regex::new(r"\.{2,}").expect("period pattern");
    static ref NUMBER: Regex = Regex::new(r"\d+(?:[.,]\d+)*").expect("number pattern");
}

/// Cleans raw text according to a [`CleaningProfile`].
///
/// Steps run in a fixed order:
///
/// 1. markdown stripping
/// 2. URL and email protection
/// 3. header/footer line removal
/// 4. special character stripping, sparing preserve-pattern matches
/// 5. citation removal
/// 6. whitespace normalization, dropping line markers exposed by 4 and 5
/// 7. URL and email restoration
/// 8. stopword removal
///
/// Placeholders from step 2 are never touched by steps 4 and 5.
pub struct TextCleaner {
    boilerplate: Vec<Regex>,
    special_chars_override: Option<Regex>,
    /// Configured preserve patterns, applied on top of the profile's
    preserve: Vec<Regex>,
    stopwords: Option<Stopwords>,
    remove_markdown: bool,
    remove_citations: bool,
    clean_special_chars: bool,
    preserve_urls: bool,
    preserve_emails: bool,
    keep_line_breaks: bool,
}

impl TextCleaner {
    /// Compile the cleaner for a configuration.
    pub fn new(config: &ChunkingConfig) -> Result<Self> {
        let boilerplate = config
            .header_patterns
            .iter()
            .chain(config.footer_patterns.iter())
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .multi_line(true)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| ChunkingError::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let special_chars_override = config
            .special_chars_pattern
            .as_deref()
            .map(compile)
            .transpose()?;

        let mut preserve = config
            .preserve_patterns
            .iter()
            .map(|pattern| compile(pattern))
            .collect::<Result<Vec<_>>>()?;
        if config.preserve_numbers {
            preserve.push(NUMBER.clone());
        }

        let stopwords = if config.remove_stopwords {
            Stopwords::for_language(&config.language, &config.custom_stopwords)
        } else {
            None
        };

        Ok(Self {
            boilerplate,
            special_chars_override,
            preserve,
            stopwords,
            remove_markdown: config.remove_markdown,
            remove_citations: config.remove_citations,
            clean_special_chars: config.clean_special_chars,
            preserve_urls: config.preserve_urls,
            preserve_emails: config.preserve_emails,
            keep_line_breaks: config.unit == UnitKind::Paragraph,
        })
    }

    /// Clean `text` with the given profile.
    pub fn clean(&self, text: &str, profile: CleaningProfile) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let patterns = &PROFILES[&profile];

        let text = if self.remove_markdown {
            strip_markdown(text)
        } else {
            text.to_string()
        };

        let protected = Protected::new(&text, self.preserve_urls, self.preserve_emails);
        let placeholders = protected.placeholder_pattern();
        trace!(protected = protected.len(), "Protected URLs and emails");

        let cleaned = protected
            .map(|t| self.remove_boilerplate(t))
            .map(|t| {
                if self.clean_special_chars {
                    self.strip_special_chars(t, patterns, placeholders.as_ref())
                } else {
                    t.to_string()
                }
            })
            .map(|t| match (&patterns.citation, self.remove_citations) {
                (Some(citation), true) => remove_citations(t, citation, placeholders.as_ref()),
                _ => t.to_string(),
            })
            .map(|t| normalize_whitespace(t, self.keep_line_breaks))
            .map(|t| {
                // citation and character removal can expose a line marker
                if self.remove_markdown {
                    normalize_whitespace(&strip_line_markers(t), self.keep_line_breaks)
                } else {
                    t.to_string()
                }
            })
            .restore();

        match &self.stopwords {
            Some(stopwords) if self.keep_line_breaks => cleaned
                .lines()
                .map(|line| stopwords.remove(line))
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            Some(stopwords) => stopwords.remove(&cleaned),
            None => cleaned,
        }
    }

    fn remove_boilerplate(&self, text: &str) -> String {
        self.boilerplate
            .iter()
            .fold(text.to_string(), |acc, pattern| {
                pattern.replace_all(&acc, "").into_owned()
            })
    }

    /// Strip special characters outside of spans that must survive verbatim.
    ///
    /// Placeholders and preserve-pattern matches are spared. Citation
    /// matches are spared too, so the citation pass still sees them whole,
    /// unless they wrap a placeholder.
    fn strip_special_chars(
        &self,
        text: &str,
        patterns: &ProfilePatterns,
        placeholders: Option<&Regex>,
    ) -> String {
        let special = self
            .special_chars_override
            .as_ref()
            .unwrap_or(&patterns.special_chars);

        let shielded = find_ranges(placeholders, text);
        let citations = patterns
            .citation
            .iter()
            .filter(|_| self.remove_citations)
            .flat_map(|pattern| pattern.find_iter(text).map(|m| m.range()))
            .filter(|range| !overlaps(range, &shielded));

        let mut keep: Vec<Range<usize>> = patterns
            .preserve
            .iter()
            .chain(self.preserve.iter())
            .flat_map(|pattern| pattern.find_iter(text).map(|m| m.range()))
            .chain(citations)
            .chain(shielded.iter().cloned())
            .filter(|range| !range.is_empty())
            .collect();

        if keep.is_empty() {
            return special.replace_all(text, "").into_owned();
        }

        keep.sort_by_key(|range| range.start);
        let keep = merge_ranges(keep);

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for range in keep {
            out.push_str(&special.replace_all(&text[last..range.start], ""));
            out.push_str(&text[range.clone()]);
            last = range.end;
        }
        out.push_str(&special.replace_all(&text[last..], ""));
        out
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| ChunkingError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Remove citation matches, leaving any that wrap a placeholder.
fn remove_citations(text: &str, citation: &Regex, placeholders: Option<&Regex>) -> String {
    let shielded = find_ranges(placeholders, text);
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in citation.find_iter(text) {
        if overlaps(&m.range(), &shielded) {
            continue;
        }
        out.push_str(&text[last..m.start()]);
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

fn find_ranges(pattern: Option<&Regex>, text: &str) -> Vec<Range<usize>> {
    pattern
        .map(|p| p.find_iter(text).map(|m| m.range()).collect())
        .unwrap_or_default()
}

fn overlaps(range: &Range<usize>, others: &[Range<usize>]) -> bool {
    others
        .iter()
        .any(|other| other.start < range.end && range.start < other.end)
}

fn merge_ranges(sorted: Vec<Range<usize>>) -> Vec<Range<usize>> {
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

/// Collapse whitespace and tidy spacing around sentence punctuation.
///
/// With `keep_line_breaks`, runs containing a newline become a single
/// newline instead of a space.
pub fn normalize_whitespace(text: &str, keep_line_breaks: bool) -> String {
    let text = if keep_line_breaks {
        let inline = WS_INLINE.replace_all(text, " ");
        LINE_BREAKS.replace_all(&inline, "\n").into_owned()
    } else {
        WS_ALL.replace_all(text, " ").into_owned()
    };
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = SPACE_AFTER_PUNCT.replace_all(&text, "$1 ");
    let text = REPEATED_PERIODS.replace_all(&text, ".");
    text.trim().to_string()
}

/// Clean `text` once with a throwaway cleaner.
pub fn clean_text(text: &str, profile: CleaningProfile, config: &ChunkingConfig) -> Result<String> {
    Ok(TextCleaner::new(config)?.clean(text, profile))
}
