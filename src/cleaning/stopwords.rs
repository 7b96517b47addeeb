//! Stopword lists and removal.

use std::collections::HashSet;

use tracing::warn;

const ENGLISH: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

/// Built-in stoplist for a locale tag, if one ships with the crate.
fn builtin(language: &str) -> Option<&'static [&'static str]> {
    match language.to_ascii_lowercase().as_str() {
        "english" | "en" | "en-us" | "en-gb" | "en_us" | "en_gb" => Some(ENGLISH),
        _ => None,
    }
}

/// A locale stoplist unioned with custom stopwords.
#[derive(Debug, Clone)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    /// Build the stoplist for `language` plus `custom`.
    ///
    /// Returns `None` when neither a built-in list nor custom words exist;
    /// callers then skip stopword removal.
    pub fn for_language(language: &str, custom: &[String]) -> Option<Self> {
        let mut words: HashSet<String> = HashSet::new();

        match builtin(language) {
            Some(list) => words.extend(list.iter().map(|w| w.to_string())),
            None => warn!(language, "No built-in stopword list, using custom stopwords only"),
        }
        words.extend(custom.iter().map(|w| w.to_lowercase()));

        if words.is_empty() {
            None
        } else {
            Some(Self { words })
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Drop stopwords, rejoining the remaining words with single spaces.
    ///
    /// A word matches when its lowercase form, with surrounding punctuation
    /// trimmed, is in the list.
    pub fn remove(&self, text: &str) -> String {
        text.split_whitespace()
            .filter(|word| {
                let core = word
                    .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                    .to_lowercase();
                core.is_empty() || !self.words.contains(&core)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
