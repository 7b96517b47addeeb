//! URL and email protection during character stripping.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref URL: Regex = Regex::new(r"https?://\S+|www\.\S+").expect("url pattern");
    static ref EMAIL: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email pattern");
}

/// Text with URLs and emails swapped for placeholder tokens.
///
/// Placeholders are built only from word characters, so every special
/// character class keeps them, and carry a salt chosen so that no
/// placeholder already occurs in the document.
#[derive(Debug)]
pub struct Protected {
    text: String,
    prefix: String,
    originals: Vec<String>,
}

impl Protected {
    /// Replace URLs (if `urls`) and emails (if `emails`) with placeholders.
    pub fn new(text: &str, urls: bool, emails: bool) -> Self {
        let prefix = unused_prefix(text);
        let mut protected = Self {
            text: text.to_string(),
            prefix,
            originals: Vec::new(),
        };

        if urls {
            protected.replace_matches(&URL);
        }
        if emails {
            protected.replace_matches(&EMAIL);
        }

        protected
    }

    fn replace_matches(&mut self, pattern: &Regex) {
        if !pattern.is_match(&self.text) {
            return;
        }

        let mut out = String::with_capacity(self.text.len());
        let mut last = 0;
        for m in pattern.find_iter(&self.text) {
            out.push_str(&self.text[last..m.start()]);
            out.push_str(&self.placeholder(self.originals.len()));
            self.originals.push(m.as_str().to_string());
            last = m.end();
        }
        out.push_str(&self.text[last..]);
        self.text = out;
    }

    fn placeholder(&self, index: usize) -> String {
        format!("{}{}__", self.prefix, index)
    }

    /// Protected text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Apply a transformation to the protected text.
    pub fn map(mut self, f: impl FnOnce(&str) -> String) -> Self {
        self.text = f(&self.text);
        self
    }

    /// Pattern matching this text's placeholders, if anything was protected.
    pub fn placeholder_pattern(&self) -> Option<Regex> {
        if self.originals.is_empty() {
            return None;
        }
        Regex::new(&format!(r"{}\d+__", regex::escape(&self.prefix))).ok()
    }

    /// Number of protected spans.
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// Put the original spans back.
    pub fn restore(self) -> String {
        let mut text = self.text;
        for (index, original) in self.originals.iter().enumerate() {
            let placeholder = format!("{}{}__", self.prefix, index);
            text = text.replacen(&placeholder, original, 1);
        }
        text
    }
}

fn unused_prefix(text: &str) -> String {
    let mut salt = 0usize;
    loop {
        let prefix = format!("__PROTECTED{}_", salt);
        if !text.contains(&prefix) {
            return prefix;
        }
        salt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_without_changes() {
        let text = "Mail bob@example.com or visit https://example.com/a?b=1 today.";
        let protected = Protected::new(text, true, true);
        assert_eq!(protected.len(), 2);
        assert!(!protected.text().contains("https://"));
        assert!(!protected.text().contains('@'));
        assert_eq!(protected.restore(), text);
    }

    #[test]
    fn test_survives_stripping() {
        let text = "Docs at https://docs.rs/regex/1.10 (see: §4)";
        let protected = Protected::new(text, true, true)
            .map(|t| Regex::new(r"[^\w\s]").unwrap().replace_all(t, "").into_owned());
        let restored = protected.restore();
        assert!(restored.contains("https://docs.rs/regex/1.10"));
        assert!(!restored.contains('§'));
    }

    #[test]
    fn test_salt_avoids_existing_placeholder_text() {
        let text = "literal __PROTECTED0_0__ and www.example.org";
        let protected = Protected::new(text, true, false);
        assert!(protected.text().contains("__PROTECTED1_0__"));
        assert_eq!(protected.restore(), text);
    }

    #[test]
    fn test_many_urls_restore_in_place() {
        let urls: Vec<String> = (0..12).map(|i| format!("http://h{}.io", i)).collect();
        let text = urls.join(" ");
        let protected = Protected::new(&text, true, false);
        assert_eq!(protected.len(), 12);
        assert_eq!(protected.restore(), text);
    }

    #[test]
    fn test_placeholder_pattern_matches_only_placeholders() {
        let text = "see https://a.io and __PROTECTED1_0__ literally";
        let protected = Protected::new(text, true, true);
        let pattern = protected.placeholder_pattern().unwrap();
        let found: Vec<&str> = pattern.find_iter(protected.text()).map(|m| m.as_str()).collect();
        assert_eq!(found, vec!["__PROTECTED0_0__"]);

        assert!(Protected::new("nothing here", true, true).placeholder_pattern().is_none());
    }

    #[test]
    fn test_disabled_protection_is_identity() {
        let text = "x@y.com http://z.org";
        let protected = Protected::new(text, false, false);
        assert!(protected.is_empty());
        assert_eq!(protected.text(), text);
    }
}
