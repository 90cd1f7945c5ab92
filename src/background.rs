//! Static background vocabulary distribution.
//!
//! The background model is built once per run from a reference corpus and
//! answers `P_B(w)`, the probability of a word in "general" language use.
//!
//! # Estimation
//!
//! For every word that survives vocabulary restriction:
//!
//! ```text
//! P_B(w) = max(count(w) - sigma, 0) / total
//! ```
//!
//! - Words whose raw count is at or below `min_count` are dropped from the
//!   table entirely.
//! - Words in the injected stop-word set are never counted, not even towards
//!   `total`.
//! - Unknown words have probability `0.0`; a lookup is never an error.
//!
//! # Pruned mass
//!
//! With [`PrunedMass::Absent`] (the default) `total` still includes the
//! occurrences of pruned words, so the retained probabilities sum to less
//! than one. [`PrunedMass::Renormalize`] divides by the retained occurrences
//! only, which makes the table sum to one when `sigma` is zero.
//!
//! # Usage
//!
//! ```rust
//! use topicsmooth::background::{BackgroundModel, BackgroundOptions};
//!
//! let mut model = BackgroundModel::new(BackgroundOptions::plain());
//! model.build_probabilities(["the", "quick", "the"]);
//! assert!(model.probability("the") > model.probability("quick"));
//! ```

use ahash::{AHashMap, AHashSet};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::DEFAULT_STOP_WORDS;

/// What happens to the probability mass of words removed by vocabulary
/// restriction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrunedMass {
    /// Pruned words still count towards the divisor; their mass is lost.
    #[default]
    Absent,
    /// The divisor only covers retained words.
    Renormalize,
}

/// Construction-time knobs for a [`BackgroundModel`].
#[derive(Debug, Clone)]
pub struct BackgroundOptions {
    /// Words seen this many times or fewer are dropped from the table.
    pub min_count: u64,
    /// Absolute discount subtracted from every retained count, in `[0, 1]`.
    pub sigma: f64,
    /// Words excluded from counting altogether.
    pub stop_words: AHashSet<String>,
    pub pruned_mass: PrunedMass,
}

impl Default for BackgroundOptions {
    /// Restriction count 10, discount 0.5 and the default stop-word list.
    fn default() -> Self {
        Self {
            min_count: 10,
            sigma: 0.5,
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            pruned_mass: PrunedMass::Absent,
        }
    }
}

impl BackgroundOptions {
    /// The degenerate variant: no pruning, no discount, no stop words, so
    /// `P_B(w) = count(w) / total`.
    pub fn plain() -> Self {
        Self {
            min_count: 0,
            sigma: 0.0,
            stop_words: AHashSet::new(),
            pruned_mass: PrunedMass::Absent,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.sigma) {
            return Err(Error::out_of_range(
                "background sigma",
                self.sigma,
                "must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

/// A static word → probability table over a pruned vocabulary.
#[derive(Debug, Clone)]
pub struct BackgroundModel {
    /// Retained words and their probabilities.
    probabilities: AHashMap<String, f64>,
    /// Number of counted (non stop-word) occurrences in the last build.
    total_count: u64,
    options: BackgroundOptions,
}

impl BackgroundModel {
    /// Create an empty model. Use [`build_probabilities`](Self::build_probabilities)
    /// to populate it.
    pub fn new(options: BackgroundOptions) -> Self {
        Self {
            probabilities: AHashMap::new(),
            total_count: 0,
            options,
        }
    }

    /// Build a model in one step from a batch of already tokenised posts.
    pub fn from_posts(options: BackgroundOptions, posts: &[Vec<String>]) -> Self {
        let mut model = Self::new(options);
        model.build_probabilities(posts.iter().flatten());
        model
    }

    /// Rebuild the table from `words`, discarding any previous state.
    pub fn build_probabilities<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.reset();

        let mut counts: AHashMap<String, u64> = AHashMap::new();
        for word in words {
            let word = word.as_ref();
            if self.options.stop_words.contains(word) {
                continue;
            }
            match counts.get_mut(word) {
                Some(count) => *count += 1,
                None => {
                    counts.insert(word.to_string(), 1);
                }
            }
            self.total_count += 1;
        }

        let seen = counts.len();
        counts.retain(|_, count| *count > self.options.min_count);

        let divisor = match self.options.pruned_mass {
            PrunedMass::Absent => self.total_count,
            PrunedMass::Renormalize => counts.values().sum(),
        };
        if divisor == 0 {
            debug!("Background model built from an empty vocabulary");
            return;
        }

        let divisor = divisor as f64;
        let sigma = self.options.sigma;
        self.probabilities = counts
            .into_iter()
            .map(|(word, count)| (word, (count as f64 - sigma).max(0.0) / divisor))
            .collect();

        debug!(
            "Background model built: {} occurrences, {} words kept, {} pruned",
            self.total_count,
            self.probabilities.len(),
            seen - self.probabilities.len()
        );
    }

    /// `P_B(word)`, or `0.0` for words outside the retained vocabulary.
    pub fn probability(&self, word: &str) -> f64 {
        self.probabilities.get(word).copied().unwrap_or(0.0)
    }

    /// Clear the table back to its freshly constructed state.
    pub fn reset(&mut self) {
        self.probabilities.clear();
        self.total_count = 0;
    }

    pub fn vocabulary_size(&self) -> usize {
        self.probabilities.len()
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Sum of all retained probabilities.
    pub fn probability_mass(&self) -> f64 {
        self.probabilities.values().sum()
    }

    pub fn options(&self) -> &BackgroundOptions {
        &self.options
    }
}
