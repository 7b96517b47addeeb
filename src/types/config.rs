//! Configuration types for cleaning and chunking.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ChunkingError;
use super::profile::CleaningProfile;
use crate::{DEFAULT_LANGUAGE, DEFAULT_MAX_TOKENS, DEFAULT_MIN_TOKENS, DEFAULT_STRIDE};

/// Granularity of the units produced by segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    #[default]
    Sentence,
    Paragraph,
}

/// How a unit larger than `max_tokens` is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SplitStrategy {
    /// Overlapping token windows.
    #[default]
    Windowed,
    /// Ask the split advisor first, windows as fallback.
    Advisory,
}

/// What happens to a trailing accumulation below `min_tokens`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemainderPolicy {
    #[default]
    Discard,
    Keep,
}

/// Local tokenizer used for counting and windowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    /// Whitespace-delimited words.
    #[default]
    Words,
    /// cl100k_base BPE.
    Tiktoken,
}

/// Per-document chunking configuration.
///
/// Immutable once a pipeline is built from it; see [`ChunkingConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Hard upper bound of tokens per chunk
    pub max_tokens: usize,

    /// Trailing chunks below this are discarded (see `remainder`)
    pub min_tokens: usize,

    /// Token overlap between windows of an oversized unit
    pub stride: usize,

    /// Locale tag for segmentation and stopwords
    pub language: String,

    pub remove_stopwords: bool,

    /// Extra stopwords unioned with the locale list
    pub custom_stopwords: Vec<String>,

    pub clean_special_chars: bool,

    /// Overrides the profile's special-character class when set
    pub special_chars_pattern: Option<String>,

    pub remove_markdown: bool,

    pub remove_citations: bool,

    pub preserve_urls: bool,

    pub preserve_emails: bool,

    /// Keep digit runs such as `3.14` or `1,000` through special character stripping
    pub preserve_numbers: bool,

    /// Extra spans kept verbatim, on top of the profile's preserve patterns
    pub preserve_patterns: Vec<String>,

    /// Line patterns removed as page headers
    pub header_patterns: Vec<String>,

    /// Line patterns removed as page footers
    pub footer_patterns: Vec<String>,

    /// Profile used when a request names none
    pub profile: CleaningProfile,

    /// Reject unknown profile names instead of falling back to `full`
    pub strict_profiles: bool,

    pub unit: UnitKind,

    pub split_strategy: SplitStrategy,

    pub remainder: RemainderPolicy,

    pub tokenizer: TokenizerKind,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            min_tokens: DEFAULT_MIN_TOKENS,
            stride: DEFAULT_STRIDE,
            language: DEFAULT_LANGUAGE.to_string(),
            remove_stopwords: false,
            custom_stopwords: Vec::new(),
            clean_special_chars: true,
            special_chars_pattern: None,
            remove_markdown: true,
            remove_citations: true,
            preserve_urls: true,
            preserve_emails: true,
            preserve_numbers: false,
            preserve_patterns: Vec::new(),
            header_patterns: default_header_patterns(),
            footer_patterns: default_footer_patterns(),
            profile: CleaningProfile::Full,
            strict_profiles: false,
            unit: UnitKind::Sentence,
            split_strategy: SplitStrategy::Windowed,
            remainder: RemainderPolicy::Discard,
            tokenizer: TokenizerKind::Words,
        }
    }
}

fn default_header_patterns() -> Vec<String> {
    [
        r"^\s*Copyright.*$",
        r"^\s*Confidential.*$",
        r"^\s*Page\s*\d+.*$",
        r"^\s*©.*$",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_footer_patterns() -> Vec<String> {
    [
        r"^\s*Page\s*\d+.*$",
        r"^\s*©.*$",
        r"^\s*All rights reserved.*$",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl ChunkingConfig {
    /// Create a config with the given token bounds.
    pub fn with_tokens(max_tokens: usize, min_tokens: usize) -> Self {
        Self {
            max_tokens,
            min_tokens,
            ..Default::default()
        }
    }

    /// Set the stride.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Set the language.
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    /// Set the unit kind.
    pub fn with_unit(mut self, unit: UnitKind) -> Self {
        self.unit = unit;
        self
    }

    /// Set the split strategy.
    pub fn with_split_strategy(mut self, strategy: SplitStrategy) -> Self {
        self.split_strategy = strategy;
        self
    }

    /// Set the remainder policy.
    pub fn with_remainder(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }

    /// Replace header and footer patterns.
    pub fn with_boilerplate(mut self, headers: Vec<String>, footers: Vec<String>) -> Self {
        self.header_patterns = headers;
        self.footer_patterns = footers;
        self
    }

    /// Window advance when splitting an oversized unit.
    pub fn window_step(&self) -> usize {
        self.max_tokens.saturating_sub(self.stride)
    }

    /// Check the numeric invariants.
    ///
    /// `0 < stride < max_tokens` and `min_tokens <= max_tokens`. A stride of
    /// `max_tokens` or more would stop windowed splitting from advancing.
    pub fn validate(&self) -> Result<(), ChunkingError> {
        if self.max_tokens == 0 {
            return Err(ChunkingError::ZeroMaxTokens);
        }
        if self.stride == 0 || self.stride >= self.max_tokens {
            return Err(ChunkingError::InvalidStride {
                stride: self.stride,
                max_tokens: self.max_tokens,
            });
        }
        if self.min_tokens > self.max_tokens {
            return Err(ChunkingError::MinExceedsMax {
                min_tokens: self.min_tokens,
                max_tokens: self.max_tokens,
            });
        }
        Ok(())
    }
}

/// Connection settings for the external language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Generate endpoint, e.g. `http://127.0.0.1:11434/api/generate`
    pub base_url: String,

    pub model: String,

    pub temperature: f32,

    /// Per-call timeout
    pub timeout_secs: u64,

    /// Maximum in-flight calls across all documents
    pub max_concurrent_calls: usize,

    /// Use the model for token estimation as well as split advice
    pub estimate_tokens: bool,

    /// Consecutive failures before calls are short-circuited
    pub failure_threshold: u32,

    /// How long short-circuiting lasts
    pub cooldown_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434/api/generate".to_string(),
            model: "mistral".to_string(),
            temperature: 0.5,
            timeout_secs: 30,
            max_concurrent_calls: 4,
            estimate_tokens: false,
            failure_threshold: 5,
            cooldown_secs: 30,
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Service-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub port: u16,

    /// Documents processed concurrently in a batch
    pub max_concurrent_documents: usize,

    pub chunking: ChunkingConfig,

    /// External model; `None` keeps the engine fully offline
    pub model: Option<ModelConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 3017,
            max_concurrent_documents: 4,
            chunking: ChunkingConfig::default(),
            model: None,
        }
    }
}

impl ServiceConfig {
    /// Load from an optional `embedprep.toml` and `EMBEDPREP_*` variables.
    ///
    /// Nested keys use `__`, e.g. `EMBEDPREP_CHUNKING__MAX_TOKENS=256`.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("embedprep").required(false))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    /// Load from an explicit file, environment still taking precedence.
    pub fn from_file(path: &Path) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("EMBEDPREP")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }
}
