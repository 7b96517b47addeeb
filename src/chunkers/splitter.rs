//! Splitting of units that exceed the token budget.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::base::TokenCounter;
use crate::model::{parse_segments, SplitAdvisor, TokenEstimator};
use crate::types::{ChunkingConfig, TextUnit, UnitOrigin};

/// Splits an oversized unit into overlapping fixed-size token windows.
///
/// Windows hold `max_tokens` tokens and start `max_tokens - stride` tokens
/// apart, so consecutive windows share `stride` tokens. Deterministic and
/// offline.
#[derive(Clone)]
pub struct WindowedSplitter {
    counter: Arc<dyn TokenCounter>,
    max_tokens: usize,
    step: usize,
}

impl WindowedSplitter {
    /// Create a splitter for a validated configuration.
    pub fn new(counter: Arc<dyn TokenCounter>, config: &ChunkingConfig) -> Self {
        Self {
            counter,
            max_tokens: config.max_tokens,
            step: config.window_step(),
        }
    }

    pub fn split(&self, unit: &TextUnit) -> Vec<TextUnit> {
        let windows = self.counter.windows(&unit.text, self.max_tokens, self.step);

        debug!(
            tokens = unit.token_count,
            windows = windows.len(),
            max_tokens = self.max_tokens,
            step = self.step,
            "Split oversized unit into windows"
        );
        windows
    }
}

/// Asks a [`SplitAdvisor`] for split points, with windowed fallback.
///
/// The advisor call is bounded by `timeout`. A failed, timed-out or
/// unparseable call falls back to [`WindowedSplitter`]; nothing is
/// propagated to the caller.
#[derive(Clone)]
pub struct AdvisorySplitter {
    advisor: Arc<dyn SplitAdvisor>,
    windowed: WindowedSplitter,
    max_tokens: usize,
    timeout: Duration,
}

impl AdvisorySplitter {
    pub fn new(advisor: Arc<dyn SplitAdvisor>, windowed: WindowedSplitter, timeout: Duration) -> Self {
        let max_tokens = windowed.max_tokens;
        Self {
            advisor,
            windowed,
            max_tokens,
            timeout,
        }
    }

    pub async fn split(&self, unit: &TextUnit, estimator: &dyn TokenEstimator) -> Vec<TextUnit> {
        let response = match tokio::time::timeout(self.timeout, self.advisor.advise(&unit.text)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(advisor = self.advisor.name(), error = %e, "Split advisor failed, using windows");
                return self.windowed.split(unit);
            }
            Err(_) => {
                warn!(
                    advisor = self.advisor.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Split advisor timed out, using windows"
                );
                return self.windowed.split(unit);
            }
        };

        let Some(segments) = parse_segments(&response) else {
            warn!(
                advisor = self.advisor.name(),
                response_len = response.len(),
                "Unparseable split advice, using windows"
            );
            return self.windowed.split(unit);
        };

        let mut pieces = Vec::with_capacity(segments.len());
        for segment in segments {
            let token_count = estimator.estimate(&segment).await;
            let piece = TextUnit::with_origin(segment, token_count, UnitOrigin::Advisory);
            if token_count > self.max_tokens {
                pieces.extend(self.windowed.split(&piece));
            } else {
                pieces.push(piece);
            }
        }

        debug!(
            tokens = unit.token_count,
            pieces = pieces.len(),
            "Split oversized unit on advisor boundaries"
        );
        pieces
    }
}

/// Strategy used for units larger than `max_tokens`.
#[derive(Clone, Copy)]
pub enum OversizeSplitter<'a> {
    Windowed(&'a WindowedSplitter),
    Advisory(&'a AdvisorySplitter),
}

impl OversizeSplitter<'_> {
    pub async fn split(&self, unit: &TextUnit, estimator: &dyn TokenEstimator) -> Vec<TextUnit> {
        match self {
            OversizeSplitter::Windowed(windowed) => windowed.split(unit),
            OversizeSplitter::Advisory(advisory) => advisory.split(unit, estimator).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunkers::base::WordCounter;
    use crate::model::{LocalEstimator, ModelError, SEGMENT_DELIMITER};
    use async_trait::async_trait;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    fn windowed(max: usize, stride: usize) -> WindowedSplitter {
        let config = ChunkingConfig::with_tokens(max, 0).with_stride(stride);
        WindowedSplitter::new(Arc::new(WordCounter::new()), &config)
    }

    fn estimator() -> LocalEstimator {
        LocalEstimator::new(Arc::new(WordCounter::new()))
    }

    struct FixedAdvisor(Result<String, ()>);

    #[async_trait]
    impl SplitAdvisor for FixedAdvisor {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn advise(&self, _text: &str) -> Result<String, ModelError> {
            self.0
                .clone()
                .map_err(|_| ModelError::Malformed("scripted failure".to_string()))
        }
    }

    struct SlowAdvisor;

    #[async_trait]
    impl SplitAdvisor for SlowAdvisor {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn advise(&self, _text: &str) -> Result<String, ModelError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(format!("a{}b", SEGMENT_DELIMITER))
        }
    }

    #[test]
    fn test_windowed_split_matches_stride() {
        let unit = TextUnit::new(words(600), 600);
        let windows = windowed(512, 50).split(&unit);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].token_count, 512);
        assert_eq!(windows[1].token_count, 138);
        assert!(windows[1].text.starts_with("w462 "));
        assert!(windows[1].text.ends_with(" w599"));
    }

    #[test]
    fn test_windowed_split_keeps_every_cjk_window() {
        let counter = Arc::new(crate::chunkers::base::TiktokenCounter::new().unwrap());
        let text = "東京は日本の首都です。人口は約千四百万人です。".repeat(20);
        let tokens = counter.count_tokens(&text);
        let config = ChunkingConfig::with_tokens(7, 0).with_stride(2);
        let splitter = WindowedSplitter::new(counter, &config);

        let windows = splitter.split(&TextUnit::new(text, tokens));
        assert_eq!(windows.len(), crate::chunkers::base::window_ranges(tokens, 7, 5).len());
        assert!(windows.iter().all(|w| !w.text.is_empty()));
    }

    #[tokio::test]
    async fn test_advisory_segments_used() {
        let response = format!(" first part {d} second part {d}  {d}", d = SEGMENT_DELIMITER);
        let advisory = AdvisorySplitter::new(
            Arc::new(FixedAdvisor(Ok(response))),
            windowed(3, 1),
            Duration::from_secs(1),
        );
        let unit = TextUnit::new(words(10), 10);
        let pieces = advisory.split(&unit, &estimator()).await;
        let texts: Vec<&str> = pieces.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["first part", "second part"]);
        assert!(pieces.iter().all(|p| p.origin == UnitOrigin::Advisory));
    }

    #[tokio::test]
    async fn test_oversized_advisory_segment_is_windowed() {
        let response = format!("{}{}tail", words(7), SEGMENT_DELIMITER);
        let advisory = AdvisorySplitter::new(
            Arc::new(FixedAdvisor(Ok(response))),
            windowed(4, 1),
            Duration::from_secs(1),
        );
        let pieces = advisory.split(&TextUnit::new(words(8), 8), &estimator()).await;
        let origins: Vec<UnitOrigin> = pieces.iter().map(|p| p.origin).collect();
        assert_eq!(
            origins,
            vec![UnitOrigin::Window, UnitOrigin::Window, UnitOrigin::Advisory]
        );
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_windows() {
        let advisory = AdvisorySplitter::new(
            Arc::new(FixedAdvisor(Err(()))),
            windowed(4, 1),
            Duration::from_secs(1),
        );
        let unit = TextUnit::new(words(10), 10);
        let pieces = advisory.split(&unit, &estimator()).await;
        assert_eq!(pieces, windowed(4, 1).split(&unit));
    }

    #[tokio::test]
    async fn test_delimiter_free_response_falls_back() {
        let advisory = AdvisorySplitter::new(
            Arc::new(FixedAdvisor(Ok("I cannot help with that.".to_string()))),
            windowed(4, 1),
            Duration::from_secs(1),
        );
        let unit = TextUnit::new(words(10), 10);
        let pieces = advisory.split(&unit, &estimator()).await;
        assert!(pieces.iter().all(|p| p.origin == UnitOrigin::Window));
    }

    #[tokio::test]
    async fn test_timeout_falls_back_with_full_coverage() {
        let advisory = AdvisorySplitter::new(
            Arc::new(SlowAdvisor),
            windowed(4, 1),
            Duration::from_millis(20),
        );
        let unit = TextUnit::new(words(10), 10);
        let pieces = advisory.split(&unit, &estimator()).await;

        let mut covered: Vec<&str> = pieces.iter().flat_map(|p| p.text.split_whitespace()).collect();
        covered.sort();
        covered.dedup();
        let mut expected: Vec<&str> = unit.text.split_whitespace().collect();
        expected.sort();
        assert_eq!(covered, expected);
    }
}
