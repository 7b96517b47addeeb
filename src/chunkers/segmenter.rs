//! Segmentation of cleaned text into sentence or paragraph units.

use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use crate::types::UnitKind;

/// Splits cleaned text into ordered units.
///
/// Implementations must keep unit order and must not drop non-empty units.
pub trait Segmenter: Send + Sync {
    /// Get the name of this segmenter.
    fn name(&self) -> &'static str;

    /// Split `text` into units.
    ///
    /// `language` is the configured locale tag. The built-in segmenters
    /// ignore it and split the same way for every language; custom
    /// implementations may use it to pick locale rules.
    fn segment(&self, text: &str, language: &str) -> Vec<String>;
}

/// Sentence segmenter using UAX #29 sentence boundaries.
///
/// Boundaries are language-independent; `3.14` and `e.g. this` style
/// abbreviations followed by lowercase stay inside one sentence.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceSegmenter;

impl SentenceSegmenter {
    pub fn new() -> Self {
        Self
    }
}

impl Segmenter for SentenceSegmenter {
    fn name(&self) -> &'static str {
        "sentence"
    }

    // UAX #29 has no locale tailoring, so `language` is unused.
    fn segment(&self, text: &str, _language: &str) -> Vec<String> {
        text.split_sentence_bounds()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Paragraph segmenter: one unit per non-blank line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParagraphSegmenter;

impl ParagraphSegmenter {
    pub fn new() -> Self {
        Self
    }
}

impl Segmenter for ParagraphSegmenter {
    fn name(&self) -> &'static str {
        "paragraph"
    }

    fn segment(&self, text: &str, _language: &str) -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Build the segmenter selected by configuration.
pub fn segmenter_for(unit: UnitKind) -> Arc<dyn Segmenter> {
    match unit {
        UnitKind::Sentence => Arc::new(SentenceSegmenter::new()),
        UnitKind::Paragraph => Arc::new(ParagraphSegmenter::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_splitting() {
        let segmenter = SentenceSegmenter::new();
        let units = segmenter.segment(
            "This is the first sentence. This is the second sentence! Is this the third?",
            "english",
        );
        assert_eq!(
            units,
            vec![
                "This is the first sentence.",
                "This is the second sentence!",
                "Is this the third?",
            ]
        );
    }

    #[test]
    fn test_decimals_stay_in_sentence() {
        let units = SentenceSegmenter::new().segment("The limit is 2.17 solar masses. It holds.", "en");
        assert_eq!(units.len(), 2);
        assert_eq!(units[0], "The limit is 2.17 solar masses.");
    }

    #[test]
    fn test_no_words_lost() {
        let text = "one two. three! four? five six";
        let units = SentenceSegmenter::new().segment(text, "english");
        let joined = units.join(" ");
        assert_eq!(
            joined.split_whitespace().collect::<Vec<_>>(),
            text.split_whitespace().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_paragraphs() {
        let units = ParagraphSegmenter::new().segment("First para.\n\n  Second para.\n", "english");
        assert_eq!(units, vec!["First para.", "Second para."]);
    }

    #[test]
    fn test_language_does_not_change_units() {
        let text = "Erster Satz. Zweiter Satz!\nDritter.";
        for segmenter in [segmenter_for(UnitKind::Sentence), segmenter_for(UnitKind::Paragraph)] {
            assert_eq!(segmenter.segment(text, "german"), segmenter.segment(text, "english"));
        }
    }

    #[test]
    fn test_empty_text() {
        assert!(SentenceSegmenter::new().segment("", "english").is_empty());
        assert!(ParagraphSegmenter::new().segment("\n\n", "english").is_empty());
    }
}
