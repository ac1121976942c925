//! Text -> polarity scoring. The summarizer only sees the `SentimentScorer` trait.

use vader_sentiment::SentimentIntensityAnalyzer;

/// Maps a piece of text to a polarity in `[-1, 1]`. Must be deterministic:
/// summaries computed once are cached and never rescored.
pub trait SentimentScorer {
    fn score(&self, text: &str) -> f64;
}

impl<S: SentimentScorer + ?Sized> SentimentScorer for &S {
    fn score(&self, text: &str) -> f64 {
        (**self).score(text)
    }
}

/// VADER compound score.
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        Self { analyzer: SentimentIntensityAnalyzer::new() }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for VaderScorer {
    fn score(&self, text: &str) -> f64 {
        let compound = self
            .analyzer
            .polarity_scores(text)
            .get("compound")
            .copied()
            .unwrap_or(0.0);
        compound.clamp(-1.0, 1.0)
    }
}
