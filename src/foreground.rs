//! Smoothed foreground language model and perplexity scoring.
//!
//! A [`ForegroundModel`] owns one [`BackgroundModel`] and one
//! [`HistoryRetention`] and blends them through a [`Smoother`] into a
//! per-word probability. Posts are scored by perplexity:
//!
//! ```text
//! PP(post) = 2 ^ ( -1/N * sum(log2 p(w)) )
//! ```
//!
//! Lower perplexity means the post looked more like what the model expected.
//! Classification flags a post as in-topic when its perplexity is *above*
//! the configured threshold.
//!
//! # Zero probabilities
//!
//! `log2(0)` is undefined, so every probability is floored at
//! [`PROBABILITY_FLOOR`] before taking the logarithm. A post made only of
//! words neither source knows therefore scores exactly `1 / PROBABILITY_FLOOR`.
//! An empty post scores `1.0`.
//!
//! # Strategies
//!
//! With `c` the history count of a word, `C` the total history occurrences,
//! `V` the distinct history words and `P_B` the background probability:
//!
//! | Strategy | Probability |
//! |---|---|
//! | [`AbsoluteDiscounting`] | `(max(c - sigma, 0) + sigma * V * P_B) / C` |
//! | [`JelinekMercer`] | `lambda * c / C + (1 - lambda) * P_B` |
//! | [`Bayesian`] | `(c + mu * P_B) / (C + mu)` |
//! | [`StupidBackoff`] | `alpha / (1 + alpha) * P_B` if `c = 0`, else `1 / (1 + alpha) * c / C` |
//! | [`BackgroundOnly`] | `P_B` |
//!
//! None of them fail on an empty history.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::background::BackgroundModel;
use crate::error::{Error, Result};
use crate::history::HistoryRetention;

/// Smallest probability fed into the perplexity logarithm.
pub const PROBABILITY_FLOOR: f64 = 1e-9;

/// A formula combining background and history evidence for one word.
pub trait Smoother: fmt::Debug {
    /// Smoothed probability of `word`. Never negative.
    fn probability(
        &self,
        word: &str,
        background: &BackgroundModel,
        history: &dyn HistoryRetention,
    ) -> f64;

    fn name(&self) -> &'static str;
}

fn unit_interval(name: &'static str, value: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::out_of_range(name, value, "must be within [0, 1]"))
    }
}

/// Absolute discounting: subtract `sigma` from every seen count and hand the
/// freed mass to the background in proportion to the history vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct AbsoluteDiscounting {
    sigma: f64,
}

impl AbsoluteDiscounting {
    pub fn new(sigma: f64) -> Result<Self> {
        Ok(Self {
            sigma: unit_interval("sigma", sigma)?,
        })
    }
}

impl Smoother for AbsoluteDiscounting {
    fn probability(
        &self,
        word: &str,
        background: &BackgroundModel,
        history: &dyn HistoryRetention,
    ) -> f64 {
        let total = history.all_words_count();
        // No history to discount from: the background is all there is.
        if total == 0 {
            return background.probability(word);
        }

        let discounted = (history.word_count(word) as f64 - self.sigma).max(0.0);
        let redistributed =
            self.sigma * history.unique_word_count() as f64 * background.probability(word);
        (discounted + redistributed) / total as f64
    }

    fn name(&self) -> &'static str {
        "absolute discounting"
    }
}

/// Jelinek-Mercer linear interpolation between history and background.
#[derive(Debug, Clone, Copy)]
pub struct JelinekMercer {
    lambda: f64,
}

impl JelinekMercer {
    pub fn new(lambda: f64) -> Result<Self> {
        Ok(Self {
            lambda: unit_interval("lambda", lambda)?,
        })
    }
}

impl Smoother for JelinekMercer {
    fn probability(
        &self,
        word: &str,
        background: &BackgroundModel,
        history: &dyn HistoryRetention,
    ) -> f64 {
        let background_part = (1.0 - self.lambda) * background.probability(word);
        let total = history.all_words_count();
        if total == 0 {
            return background_part;
        }

        let foreground_part = self.lambda * (history.word_count(word) as f64 / total as f64);
        foreground_part + background_part
    }

    fn name(&self) -> &'static str {
        "jelinek-mercer"
    }
}

/// Bayesian smoothing with a Dirichlet prior of strength `mu` centred on the
/// background distribution.
#[derive(Debug, Clone, Copy)]
pub struct Bayesian {
    mu: f64,
}

impl Bayesian {
    pub fn new(mu: f64) -> Result<Self> {
        if !(mu > 0.0 && mu.is_finite()) {
            return Err(Error::out_of_range("mu", mu, "must be positive and finite"));
        }
        Ok(Self { mu })
    }
}

impl Smoother for Bayesian {
    fn probability(
        &self,
        word: &str,
        background: &BackgroundModel,
        history: &dyn HistoryRetention,
    ) -> f64 {
        (history.word_count(word) as f64 + self.mu * background.probability(word))
            / (history.all_words_count() as f64 + self.mu)
    }

    fn name(&self) -> &'static str {
        "bayesian"
    }
}

/// Stupid backoff, normalised so that both branches are proper fractions of
/// the unit mass.
#[derive(Debug, Clone, Copy)]
pub struct StupidBackoff {
    alpha: f64,
    /// `1 / (1 + alpha)`, weight of the history estimate.
    history_weight: f64,
    /// `alpha / (1 + alpha)`, weight of the background fallback.
    background_weight: f64,
}

impl StupidBackoff {
    pub fn new(alpha: f64) -> Result<Self> {
        let alpha = unit_interval("alpha", alpha)?;
        Ok(Self {
            alpha,
            history_weight: 1.0 / (1.0 + alpha),
            background_weight: alpha / (1.0 + alpha),
        })
    }

    /// The classic unnormalised backoff score: the relative history frequency
    /// if the word was seen, `alpha * P_B` otherwise.
    pub fn score(
        &self,
        word: &str,
        background: &BackgroundModel,
        history: &dyn HistoryRetention,
    ) -> f64 {
        let count = history.word_count(word);
        if count == 0 {
            return self.alpha * background.probability(word);
        }
        count as f64 / history.all_words_count() as f64
    }
}

impl Smoother for StupidBackoff {
    fn probability(
        &self,
        word: &str,
        background: &BackgroundModel,
        history: &dyn HistoryRetention,
    ) -> f64 {
        let count = history.word_count(word);
        if count == 0 {
            return self.background_weight * background.probability(word);
        }
        self.history_weight * (count as f64 / history.all_words_count() as f64)
    }

    fn name(&self) -> &'static str {
        "stupid backoff"
    }
}

/// Ignores the history entirely. Useful as a baseline.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackgroundOnly;

impl Smoother for BackgroundOnly {
    fn probability(
        &self,
        word: &str,
        background: &BackgroundModel,
        _history: &dyn HistoryRetention,
    ) -> f64 {
        background.probability(word)
    }

    fn name(&self) -> &'static str {
        "background only"
    }
}

/// Smoothing strategy selector, without parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingKind {
    AbsoluteDiscounting,
    #[serde(alias = "jalinek_mercer")]
    #[value(alias = "jalinek-mercer")]
    JelinekMercer,
    Bayesian,
    #[default]
    StupidBackoff,
    BackgroundOnly,
}

/// A fully parameterised smoothing strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Smoothing {
    AbsoluteDiscounting { sigma: f64 },
    JelinekMercer { lambda: f64 },
    Bayesian { mu: f64 },
    StupidBackoff { alpha: f64 },
    BackgroundOnly,
}

impl Smoothing {
    pub fn kind(&self) -> SmoothingKind {
        match self {
            Smoothing::AbsoluteDiscounting { .. } => SmoothingKind::AbsoluteDiscounting,
            Smoothing::JelinekMercer { .. } => SmoothingKind::JelinekMercer,
            Smoothing::Bayesian { .. } => SmoothingKind::Bayesian,
            Smoothing::StupidBackoff { .. } => SmoothingKind::StupidBackoff,
            Smoothing::BackgroundOnly => SmoothingKind::BackgroundOnly,
        }
    }

    /// Validate the parameter and build the strategy.
    pub fn build(self) -> Result<Box<dyn Smoother>> {
        let smoother: Box<dyn Smoother> = match self {
            Smoothing::AbsoluteDiscounting { sigma } => Box::new(AbsoluteDiscounting::new(sigma)?),
            Smoothing::JelinekMercer { lambda } => Box::new(JelinekMercer::new(lambda)?),
            Smoothing::Bayesian { mu } => Box::new(Bayesian::new(mu)?),
            Smoothing::StupidBackoff { alpha } => Box::new(StupidBackoff::new(alpha)?),
            Smoothing::BackgroundOnly => Box::new(BackgroundOnly),
        };
        Ok(smoother)
    }
}

/// A background model, a bounded history and a smoothing strategy, scored
/// together.
#[derive(Debug)]
pub struct ForegroundModel {
    background: BackgroundModel,
    history: Box<dyn HistoryRetention>,
    threshold: Option<f64>,
    smoother: Box<dyn Smoother>,
}

impl ForegroundModel {
    pub fn new(
        background: BackgroundModel,
        history: Box<dyn HistoryRetention>,
        threshold: Option<f64>,
        smoother: Box<dyn Smoother>,
    ) -> Self {
        Self {
            background,
            history,
            threshold,
            smoother,
        }
    }

    /// Fold a post into the history.
    pub fn add_tweet(&mut self, words: &[String]) {
        self.history.add_tweet(words);
    }

    pub fn probability(&self, word: &str) -> f64 {
        self.smoother
            .probability(word, &self.background, self.history.as_ref())
    }

    /// Perplexity of a post under the current state. See the module docs for
    /// the zero-probability and empty-post conventions.
    pub fn perplexity<S: AsRef<str>>(&self, words: &[S]) -> f64 {
        if words.is_empty() {
            return 1.0;
        }

        let log_sum: f64 = words
            .iter()
            .map(|w| self.probability(w.as_ref()).max(PROBABILITY_FLOOR).log2())
            .sum();
        (-log_sum / words.len() as f64).exp2()
    }

    /// `Some(perplexity > threshold)`, or `None` when no threshold is set.
    pub fn classify<S: AsRef<str>>(&self, words: &[S]) -> Option<bool> {
        let threshold = self.threshold?;
        Some(self.perplexity(words) > threshold)
    }

    /// Clear both the background table and the history. The background has
    /// to be rebuilt before the model is useful again.
    pub fn reset(&mut self) {
        self.background.reset();
        self.history.reset();
    }

    pub fn background(&self) -> &BackgroundModel {
        &self.background
    }

    pub fn history(&self) -> &dyn HistoryRetention {
        self.history.as_ref()
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub fn smoother_name(&self) -> &'static str {
        self.smoother.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::BackgroundOptions;
    use crate::history::{HistoryPolicy, Queue};

    const EPSILON: f64 = 1e-12;

    fn post(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    /// P_B(word) = 0.2, P_B(other) = 0.8.
    fn background() -> BackgroundModel {
        let mut model = BackgroundModel::new(BackgroundOptions::plain());
        model.build_probabilities(["word", "other", "other", "other", "other"]);
        model
    }

    fn model(smoothing: Smoothing) -> ForegroundModel {
        ForegroundModel::new(
            background(),
            HistoryPolicy::Queue.build(10),
            Some(100.0),
            smoothing.build().unwrap(),
        )
    }

    #[test]
    fn test_stupid_backoff_empty_history() {
        let fg = model(Smoothing::StupidBackoff { alpha: 0.3 });
        assert_eq!(fg.probability("word"), (0.3 / 1.3) * 0.2);
        assert_eq!(fg.probability("unknown"), 0.0);
    }

    #[test]
    fn test_stupid_backoff_seen_word() {
        let mut fg = model(Smoothing::StupidBackoff { alpha: 0.3 });
        fg.add_tweet(&post(&["word", "rain", "rain", "sun"]));

        assert!((fg.probability("rain") - (1.0 / 1.3) * 0.5).abs() < EPSILON);
        assert!((fg.probability("other") - (0.3 / 1.3) * 0.8).abs() < EPSILON);
    }

    #[test]
    fn test_stupid_backoff_score() {
        let backoff = StupidBackoff::new(0.3).unwrap();
        let bg = background();
        let mut history = Queue::new(4);
        assert!((backoff.score("word", &bg, &history) - 0.06).abs() < EPSILON);

        history.add_tweet(&post(&["word", "sun"]));
        assert!((backoff.score("word", &bg, &history) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_absolute_discounting() {
        let mut fg = model(Smoothing::AbsoluteDiscounting { sigma: 0.5 });
        // Empty history falls back to the background.
        assert!((fg.probability("word") - 0.2).abs() < EPSILON);

        fg.add_tweet(&post(&["word", "word", "sun", "moon"]));
        // C = 4, V = 3.
        let expected = (1.5 + 0.5 * 3.0 * 0.2) / 4.0;
        assert!((fg.probability("word") - expected).abs() < EPSILON);
        let expected = (0.5 + 0.5 * 3.0 * 0.0) / 4.0;
        assert!((fg.probability("sun") - expected).abs() < EPSILON);
        let expected = 0.5 * 3.0 * 0.8 / 4.0;
        assert!((fg.probability("other") - expected).abs() < EPSILON);
    }

    #[test]
    fn test_absolute_discounting_can_be_zero() {
        let mut fg = model(Smoothing::AbsoluteDiscounting { sigma: 1.0 });
        fg.add_tweet(&post(&["sun"]));
        assert_eq!(fg.probability("sun"), 0.0);
    }

    #[test]
    fn test_jelinek_mercer() {
        let mut fg = model(Smoothing::JelinekMercer { lambda: 0.4 });
        assert!((fg.probability("word") - 0.6 * 0.2).abs() < EPSILON);

        fg.add_tweet(&post(&["word", "sun"]));
        let expected = 0.4 * 0.5 + 0.6 * 0.2;
        assert!((fg.probability("word") - expected).abs() < EPSILON);
    }

    #[test]
    fn test_bayesian() {
        let mut fg = model(Smoothing::Bayesian { mu: 10.0 });
        assert!((fg.probability("word") - 0.2).abs() < EPSILON);

        fg.add_tweet(&post(&["word", "sun"]));
        let expected = (1.0 + 10.0 * 0.2) / 12.0;
        assert!((fg.probability("word") - expected).abs() < EPSILON);
    }

    #[test]
    fn test_background_only_ignores_history() {
        let mut fg = model(Smoothing::BackgroundOnly);
        fg.add_tweet(&post(&["sun", "sun"]));
        assert_eq!(fg.probability("sun"), 0.0);
        assert!((fg.probability("other") - 0.8).abs() < EPSILON);
    }

    #[test]
    fn test_perplexity_of_known_probabilities() {
        let fg = model(Smoothing::BackgroundOnly);
        // log2(0.2) + log2(0.8) averaged, negated, exponentiated.
        let expected = (-(0.2f64.log2() + 0.8f64.log2()) / 2.0).exp2();
        assert!((fg.perplexity(&["word", "other"]) - expected).abs() < 1e-9);
        assert!((fg.perplexity(&["other"]) - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_perplexity_floor_and_empty_post() {
        let fg = model(Smoothing::BackgroundOnly);
        let pp = fg.perplexity(&["nothing", "known"]);
        assert!(pp.is_finite());
        assert!((pp - 1.0 / PROBABILITY_FLOOR).abs() / pp < 1e-9);
        assert_eq!(fg.perplexity::<&str>(&[]), 1.0);
    }

    #[test]
    fn test_perplexity_monotonic() {
        let fg = model(Smoothing::StupidBackoff { alpha: 0.3 });
        let common = fg.perplexity(&["other", "other"]);
        let rare = fg.perplexity(&["word", "unknown"]);
        assert!(common < rare);
    }

    #[test]
    fn test_classification() {
        let fg = model(Smoothing::BackgroundOnly);
        // 1.25 is below the threshold of 100; the unknown post is far above it.
        assert_eq!(fg.classify(&["other"]), Some(false));
        assert_eq!(fg.classify(&["unknown"]), Some(true));

        let no_threshold = ForegroundModel::new(
            background(),
            HistoryPolicy::Forget.build(1),
            None,
            Box::new(BackgroundOnly),
        );
        assert_eq!(no_threshold.classify(&["unknown"]), None);
    }

    #[test]
    fn test_reset_clears_both_sources() {
        let mut fg = model(Smoothing::Bayesian { mu: 1.0 });
        fg.add_tweet(&post(&["sun"]));
        fg.reset();

        assert!(fg.background().is_empty());
        assert!(fg.history().is_empty());
        assert_eq!(fg.probability("word"), 0.0);
    }

    #[test]
    fn test_parameter_validation() {
        assert!(Smoothing::StupidBackoff { alpha: 1.2 }.build().is_err());
        assert!(Smoothing::JelinekMercer { lambda: -0.1 }.build().is_err());
        assert!(Smoothing::AbsoluteDiscounting { sigma: f64::NAN }.build().is_err());
        assert!(Smoothing::Bayesian { mu: 0.0 }.build().is_err());
        assert!(Smoothing::Bayesian { mu: 10_000.0 }.build().is_ok());
        assert_eq!(
            Smoothing::JelinekMercer { lambda: 0.4 }.kind(),
            SmoothingKind::JelinekMercer
        );
    }
}
