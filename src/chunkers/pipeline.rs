//! Clean → segment → assemble.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::assembler::ChunkAssembler;
use super::base::{counter_for, TokenCounter};
use super::segmenter::{segmenter_for, Segmenter};
use super::splitter::{AdvisorySplitter, OversizeSplitter, WindowedSplitter};
use crate::cleaning::TextCleaner;
use crate::model::{LocalEstimator, SplitAdvisor, TokenEstimator};
use crate::types::{Chunk, ChunkingConfig, CleaningProfile, Result, SplitStrategy, TextUnit};

/// Document chunking pipeline.
///
/// Built once per configuration and shared freely; processing a document
/// touches no mutable state, so one pipeline can serve many documents in
/// parallel.
pub struct ChunkingPipeline {
    config: ChunkingConfig,
    cleaner: TextCleaner,
    segmenter: Arc<dyn Segmenter>,
    counter: Arc<dyn TokenCounter>,
    assembler: ChunkAssembler,
    windowed: WindowedSplitter,
    advisor: Option<(Arc<dyn SplitAdvisor>, Duration)>,
    estimator: Option<Arc<dyn TokenEstimator>>,
}

impl ChunkingPipeline {
    /// Validate `config` and build the pipeline for it.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        let cleaner = TextCleaner::new(&config)?;
        let counter = counter_for(config.tokenizer)?;
        let segmenter = segmenter_for(config.unit);

        Ok(Self {
            cleaner,
            segmenter,
            assembler: ChunkAssembler::new(&config),
            windowed: WindowedSplitter::new(counter.clone(), &config),
            counter,
            advisor: None,
            estimator: None,
            config,
        })
    }

    /// Replace the segmenter.
    pub fn with_segmenter(mut self, segmenter: Arc<dyn Segmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Replace the local token counter used for counting and windowing.
    pub fn with_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.windowed = WindowedSplitter::new(counter.clone(), &self.config);
        self.counter = counter;
        self
    }

    /// Install a split advisor, consulted by [`Self::process_async`] when
    /// the split strategy is advisory.
    pub fn with_split_advisor(mut self, advisor: Arc<dyn SplitAdvisor>, timeout: Duration) -> Self {
        self.advisor = Some((advisor, timeout));
        self
    }

    /// Install a token estimator for unit counts in [`Self::process_async`].
    pub fn with_token_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Resolve a profile name under this pipeline's strictness setting.
    pub fn resolve_profile(&self, name: &str) -> Result<CleaningProfile> {
        CleaningProfile::resolve(name, self.config.strict_profiles)
    }

    pub fn clean(&self, raw: &str, profile: CleaningProfile) -> String {
        self.cleaner.clean(raw, profile)
    }

    /// Segment cleaned text into counted units.
    pub fn units(&self, cleaned: &str) -> Vec<TextUnit> {
        self.segmenter
            .segment(cleaned, &self.config.language)
            .into_iter()
            .map(|text| {
                let count = self.counter.count_tokens(&text);
                TextUnit::new(text, count)
            })
            .collect()
    }

    /// Chunk a document on the deterministic path.
    ///
    /// Oversized units are always windowed here; use [`Self::process_async`]
    /// for advisory splitting or model token estimates.
    pub fn process(&self, raw: &str, profile: CleaningProfile) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = self.chunks(raw, profile).collect();
        info!(
            profile = %profile,
            input_chars = raw.len(),
            chunks = chunks.len(),
            "Chunked document"
        );
        chunks
    }

    /// Lazy variant of [`Self::process`]. Cleaning and segmentation happen
    /// up front; units are counted and packed as chunks are pulled.
    pub fn chunks<'a>(&'a self, raw: &str, profile: CleaningProfile) -> impl Iterator<Item = Chunk> + 'a {
        let cleaned = self.clean(raw, profile);
        let counter = self.counter.clone();
        let units = self
            .segmenter
            .segment(&cleaned, &self.config.language)
            .into_iter()
            .map(move |text| {
                let count = counter.count_tokens(&text);
                TextUnit::new(text, count)
            });
        self.assembler.chunks(units, &self.windowed)
    }

    /// Chunk a document, consulting installed model capabilities.
    ///
    /// Model calls are bounded by their timeouts and fall back to local
    /// behaviour; dropping the returned future cancels any call in flight.
    pub async fn process_async(&self, raw: &str, profile: CleaningProfile) -> Vec<Chunk> {
        let cleaned = self.clean(raw, profile);
        let local = LocalEstimator::new(self.counter.clone());
        let estimator: &dyn TokenEstimator = match &self.estimator {
            Some(estimator) => estimator.as_ref(),
            None => &local,
        };

        let segments = self.segmenter.segment(&cleaned, &self.config.language);
        let mut units = Vec::with_capacity(segments.len());
        for text in segments {
            let count = estimator.estimate(&text).await;
            units.push(TextUnit::new(text, count));
        }

        let advisory = match (&self.advisor, self.config.split_strategy) {
            (Some((advisor, timeout)), SplitStrategy::Advisory) => {
                Some(AdvisorySplitter::new(advisor.clone(), self.windowed.clone(), *timeout))
            }
            (None, SplitStrategy::Advisory) => {
                debug!("Advisory splitting requested without an advisor, using windows");
                None
            }
            _ => None,
        };
        let splitter = match &advisory {
            Some(advisory) => OversizeSplitter::Advisory(advisory),
            None => OversizeSplitter::Windowed(&self.windowed),
        };

        let chunks = self.assembler.assemble_with(units, splitter, estimator).await;
        info!(
            profile = %profile,
            estimator = estimator.name(),
            input_chars = raw.len(),
            chunks = chunks.len(),
            "Chunked document"
        );
        chunks
    }

    /// [`Self::process`] with a profile name.
    pub fn process_named(&self, raw: &str, profile: &str) -> Result<Vec<Chunk>> {
        let profile = self.resolve_profile(profile)?;
        Ok(self.process(raw, profile))
    }
}

/// One-shot chunking with a fresh pipeline.
pub fn chunk_text(raw: &str, profile: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    ChunkingPipeline::new(config.clone())?.process_named(raw, profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunkers::base::WordCounter;
    use crate::model::{ModelError, SEGMENT_DELIMITER};
    use crate::types::{ChunkOrigin, ChunkingError, RemainderPolicy, UnitKind};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    /// A capitalised sentence of `n` words ending with a period.
    fn sentence(n: usize) -> String {
        let mut words = vec!["Word".to_string()];
        words.extend((1..n).map(|i| format!("word{}", i)));
        format!("{}.", words.join(" "))
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("t{}", i)).collect::<Vec<_>>().join(" ")
    }

    struct SlowAdvisor;

    #[async_trait]
    impl SplitAdvisor for SlowAdvisor {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn advise(&self, _text: &str) -> std::result::Result<String, ModelError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(format!("x{}y", SEGMENT_DELIMITER))
        }
    }

    struct HalvingAdvisor;

    #[async_trait]
    impl SplitAdvisor for HalvingAdvisor {
        fn name(&self) -> &'static str {
            "halving"
        }

        async fn advise(&self, text: &str) -> std::result::Result<String, ModelError> {
            let words: Vec<&str> = text.split_whitespace().collect();
            let (a, b) = words.split_at(words.len() / 2);
            Ok(format!("{}{}{}", a.join(" "), SEGMENT_DELIMITER, b.join(" ")))
        }
    }

    #[test]
    fn test_single_sentence() {
        let config = ChunkingConfig::with_tokens(100, 10).with_stride(10);
        let pipeline = ChunkingPipeline::new(config).unwrap();
        let text = sentence(30);
        let chunks = pipeline.process(&text, CleaningProfile::Full);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].token_count, 30);
    }

    #[test]
    fn test_oversized_text_windows() {
        let config = ChunkingConfig::with_tokens(512, 50).with_stride(50);
        let pipeline = ChunkingPipeline::new(config).unwrap();
        let chunks = pipeline.process(&words(600), CleaningProfile::Full);
        let counts: Vec<usize> = chunks.iter().map(|c| c.token_count).collect();
        assert_eq!(counts, vec![512, 138]);
        assert_eq!(chunks[1].words().next(), Some("t462"));
        assert_eq!(chunks[1].metadata.origin, ChunkOrigin::Window);
    }

    #[test]
    fn test_page_header_removed() {
        let pipeline = ChunkingPipeline::new(ChunkingConfig::default()).unwrap();
        let cleaned = pipeline.clean("Page 2 of 3\nBody text here.", CleaningProfile::Full);
        assert_eq!(cleaned, "Body text here.");
    }

    #[test]
    fn test_trailing_remainder_dropped() {
        let config = ChunkingConfig::with_tokens(60, 50).with_stride(10);
        let text = format!("{} {}", sentence(55), sentence(15));

        let pipeline = ChunkingPipeline::new(config.clone()).unwrap();
        assert_eq!(pipeline.units(&pipeline.clean(&text, CleaningProfile::Full)).len(), 2);
        let chunks = pipeline.process(&text, CleaningProfile::Full);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].token_count, 55);

        let keep = ChunkingPipeline::new(config.with_remainder(RemainderPolicy::Keep)).unwrap();
        assert_eq!(keep.process(&text, CleaningProfile::Full).len(), 2);
    }

    #[tokio::test]
    async fn test_advisor_timeout_keeps_coverage() {
        let config = ChunkingConfig::with_tokens(20, 0)
            .with_stride(5)
            .with_split_strategy(SplitStrategy::Advisory);
        let pipeline = ChunkingPipeline::new(config)
            .unwrap()
            .with_split_advisor(Arc::new(SlowAdvisor), Duration::from_millis(20));

        let text = words(50);
        let chunks = pipeline.process_async(&text, CleaningProfile::Full).await;

        assert!(chunks.iter().all(|c| c.metadata.origin == ChunkOrigin::Window));
        let mut covered: Vec<&str> = chunks.iter().flat_map(|c| c.words()).collect();
        covered.sort();
        covered.dedup();
        let mut expected: Vec<&str> = text.split_whitespace().collect();
        expected.sort();
        assert_eq!(covered, expected);
    }

    #[tokio::test]
    async fn test_advisor_boundaries_used() {
        let config = ChunkingConfig::with_tokens(30, 0)
            .with_stride(5)
            .with_split_strategy(SplitStrategy::Advisory);
        let pipeline = ChunkingPipeline::new(config)
            .unwrap()
            .with_split_advisor(Arc::new(HalvingAdvisor), Duration::from_secs(1));

        let chunks = pipeline.process_async(&words(40), CleaningProfile::Full).await;
        let counts: Vec<usize> = chunks.iter().map(|c| c.token_count).collect();
        assert_eq!(counts, vec![20, 20]);
        assert!(chunks.iter().all(|c| c.metadata.origin == ChunkOrigin::Advisory));
    }

    #[tokio::test]
    async fn test_windowed_strategy_ignores_advisor() {
        let config = ChunkingConfig::with_tokens(30, 0).with_stride(5);
        let pipeline = ChunkingPipeline::new(config)
            .unwrap()
            .with_split_advisor(Arc::new(HalvingAdvisor), Duration::from_secs(1));

        let text = words(40);
        let async_chunks = pipeline.process_async(&text, CleaningProfile::Full).await;
        assert_eq!(async_chunks, pipeline.process(&text, CleaningProfile::Full));
    }

    #[test]
    fn test_chunks_within_bound() {
        let config = ChunkingConfig::with_tokens(40, 5).with_stride(8);
        let pipeline = ChunkingPipeline::new(config).unwrap();
        let text = (1..30).map(sentence).collect::<Vec<_>>().join(" ");
        let chunks = pipeline.process(&text, CleaningProfile::Full);

        assert!(!chunks.is_empty());
        let counter = WordCounter::new();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert!(chunk.token_count <= 40);
            assert_eq!(chunk.token_count, counter.count_tokens(&chunk.text));
        }
    }

    #[test]
    fn test_lazy_matches_eager() {
        let config = ChunkingConfig::with_tokens(25, 3).with_stride(5);
        let pipeline = ChunkingPipeline::new(config).unwrap();
        let text = (1..20).map(sentence).collect::<Vec<_>>().join(" ");

        let lazy: Vec<Chunk> = pipeline.chunks(&text, CleaningProfile::News).collect();
        assert_eq!(lazy, pipeline.process(&text, CleaningProfile::News));
    }

    #[test]
    fn test_cleaning_idempotent() {
        let pipeline = ChunkingPipeline::new(ChunkingConfig::default()).unwrap();
        let raw = "Neutron stars   are dense.[2] They spin fast!!\nPage 4\nSee https://example.org/x now.";
        for profile in CleaningProfile::ALL {
            let once = pipeline.clean(raw, profile);
            assert_eq!(pipeline.clean(&once, profile), once, "profile {}", profile);
        }
    }

    #[test]
    fn test_urls_survive_placeholder_text() {
        let pipeline = ChunkingPipeline::new(ChunkingConfig::default()).unwrap();
        let raw = "Text mentions __PROTECTED_0__ and https://example.com/a_b literally.";
        let cleaned = pipeline.clean(raw, CleaningProfile::Full);
        assert!(cleaned.contains("https://example.com/a_b"));
        assert!(cleaned.contains("__PROTECTED_0__"));
    }

    #[test]
    fn test_wrapped_urls_and_emails_reach_chunks() {
        let config = ChunkingConfig::with_tokens(100, 0).with_stride(10);
        let pipeline = ChunkingPipeline::new(config).unwrap();
        let raw = "Contact us [jane@example.com] today. Docs (see www.example.com 2020) here. \
                   See [https://example.org/a] now.";
        for profile in CleaningProfile::ALL {
            let joined = pipeline
                .process(raw, profile)
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            for kept in ["jane@example.com", "www.example.com", "https://example.org/a"] {
                assert!(joined.contains(kept), "{} lost {} in {:?}", profile, kept, joined);
            }
        }
    }

    #[test]
    fn test_digit_override_keeps_urls() {
        let config = ChunkingConfig {
            special_chars_pattern: Some(r"[0-9]".to_string()),
            ..ChunkingConfig::with_tokens(100, 0).with_stride(10)
        };
        let pipeline = ChunkingPipeline::new(config).unwrap();
        for profile in CleaningProfile::ALL {
            let cleaned = pipeline.clean("Build 42 at https://ci.io/run/7 by ops1@ci.io today.", profile);
            assert!(cleaned.contains("https://ci.io/run/7"), "{}: {:?}", profile, cleaned);
            assert!(cleaned.contains("ops1@ci.io"), "{}: {:?}", profile, cleaned);
        }
    }

    #[test]
    fn test_exposed_list_markers_cleaned_once() {
        let pipeline = ChunkingPipeline::new(ChunkingConfig::default()).unwrap();
        for raw in ["[1] 2. Results are in.", "[3] - Results are in."] {
            for profile in [CleaningProfile::Full, CleaningProfile::Legal, CleaningProfile::Technical] {
                let once = pipeline.clean(raw, profile);
                assert_eq!(once, "Results are in.", "{} on {:?}", profile, raw);
                assert_eq!(pipeline.clean(&once, profile), once);
            }
        }
        for profile in CleaningProfile::ALL {
            let once = pipeline.clean("[1] 2. Results are in.", profile);
            assert_eq!(pipeline.clean(&once, profile), once, "profile {}", profile);
        }
    }

    #[test]
    fn test_empty_input() {
        let pipeline = ChunkingPipeline::new(ChunkingConfig::default()).unwrap();
        assert!(pipeline.process("", CleaningProfile::Full).is_empty());
        assert!(pipeline.process(" \n\t ", CleaningProfile::Legal).is_empty());
    }

    #[test]
    fn test_paragraph_units() {
        let config = ChunkingConfig::with_tokens(8, 0)
            .with_stride(2)
            .with_unit(UnitKind::Paragraph);
        let pipeline = ChunkingPipeline::new(config).unwrap();
        let chunks = pipeline.process("First para here.\nSecond one.\n\nThird para is longer now.", CleaningProfile::Full);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["First para here. Second one.", "Third para is longer now."]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ChunkingConfig::with_tokens(50, 10).with_stride(50);
        assert!(matches!(
            ChunkingPipeline::new(config),
            Err(ChunkingError::InvalidStride { .. })
        ));
        let mut bad_pattern = ChunkingConfig::default();
        bad_pattern.header_patterns.push("(".to_string());
        assert!(matches!(
            ChunkingPipeline::new(bad_pattern),
            Err(ChunkingError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_profile_resolution() {
        let config = ChunkingConfig::default();
        assert!(chunk_text("Hello there.", "no-such-profile", &config).is_ok());

        let mut strict = config;
        strict.strict_profiles = true;
        assert!(matches!(
            chunk_text("Hello there.", "no-such-profile", &strict),
            Err(ChunkingError::UnknownProfile(_))
        ));
        assert!(chunk_text("Hello there.", "LEGAL", &strict).is_ok());
    }
}
