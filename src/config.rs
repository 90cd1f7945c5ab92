use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::background::{BackgroundOptions, PrunedMass};
use crate::error::{Error, Result};
use crate::filter::{TweetFilter, DEFAULT_STOP_WORDS};
use crate::foreground::{Smoothing, SmoothingKind};
use crate::history::HistoryPolicy;

const APP_NAME: &str = "topicsmooth";
const CONFIG_NAME: &str = "config";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub smoothing: SmoothingKind,
    pub absolute_discounting_sigma: f64,
    pub jelinek_mercer_lambda: f64,
    pub bayesian_mu: f64,
    pub stupid_backoff_alpha: f64,
    pub history: HistoryPolicy,
    /// Number of posts the history retains.
    pub history_size: usize,
    /// Perplexity above which a post is classified in-topic. No threshold
    /// means scores only; it is stored as `threshold = "none"` so that a
    /// missing key still falls back to the default.
    #[serde(with = "threshold")]
    pub threshold: Option<f64>,
    /// Minimum number of non-hashtag words for a post to be used at all.
    pub min_words: usize,
    /// Column of the post text in ARFF corpora.
    pub tweet_index: usize,
    pub hashtag: String,
    pub background: BackgroundSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundSettings {
    pub min_count: u64,
    pub sigma: f64,
    pub stop_words: Vec<String>,
    pub pruned_mass: PrunedMass,
    /// Build the background only from posts carrying the topic hashtag, the
    /// way training posts are chosen. Off by default: the background then
    /// describes the general stream rather than the topic.
    pub require_hashtag: bool,
}

mod threshold {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    const DISABLED: &str = "none";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Value(f64),
        Word(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(threshold) => serializer.serialize_f64(*threshold),
            None => serializer.serialize_str(DISABLED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Stored::deserialize(deserializer)? {
            Stored::Value(threshold) => Ok(Some(threshold)),
            Stored::Word(word) if word.eq_ignore_ascii_case(DISABLED) => Ok(None),
            Stored::Word(word) => Err(D::Error::custom(format!(
                "threshold must be a number or \"{DISABLED}\", found \"{word}\""
            ))),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            smoothing: SmoothingKind::StupidBackoff,
            absolute_discounting_sigma: 0.9,
            jelinek_mercer_lambda: 0.4,
            bayesian_mu: 10_000.0,
            stupid_backoff_alpha: 0.3,
            history: HistoryPolicy::Queue,
            history_size: 1000,
            threshold: Some(1000.0),
            min_words: 10,
            tweet_index: 0,
            hashtag: String::new(),
            background: BackgroundSettings::default(),
        }
    }
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            min_count: 10,
            sigma: 0.5,
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            pruned_mass: PrunedMass::Absent,
            require_hashtag: false,
        }
    }
}

impl Settings {
    /// Load the user's settings, falling back to defaults if the stored file
    /// cannot be read.
    pub fn load() -> Result<Self> {
        match confy::load(APP_NAME, Some(CONFIG_NAME)) {
            Ok(settings) => Ok(settings),
            Err(err) => {
                warn!("Failed to load config, using defaults: {err}");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        confy::store(APP_NAME, Some(CONFIG_NAME), self)?;
        Ok(())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(confy::load_path(path)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        confy::store_path(path, self)?;
        Ok(())
    }

    /// The selected strategy with its parameter filled in.
    pub fn smoothing(&self) -> Smoothing {
        match self.smoothing {
            SmoothingKind::AbsoluteDiscounting => Smoothing::AbsoluteDiscounting {
                sigma: self.absolute_discounting_sigma,
            },
            SmoothingKind::JelinekMercer => Smoothing::JelinekMercer {
                lambda: self.jelinek_mercer_lambda,
            },
            SmoothingKind::Bayesian => Smoothing::Bayesian {
                mu: self.bayesian_mu,
            },
            SmoothingKind::StupidBackoff => Smoothing::StupidBackoff {
                alpha: self.stupid_backoff_alpha,
            },
            SmoothingKind::BackgroundOnly => Smoothing::BackgroundOnly,
        }
    }

    pub fn background_options(&self) -> BackgroundOptions {
        BackgroundOptions {
            min_count: self.background.min_count,
            sigma: self.background.sigma,
            stop_words: self.background.stop_words.iter().cloned().collect(),
            pruned_mass: self.background.pruned_mass,
        }
    }

    pub fn filter(&self) -> TweetFilter {
        TweetFilter::new(&self.hashtag, self.min_words)
    }

    pub fn validate(&self) -> Result<()> {
        self.smoothing().build()?;
        self.background_options().validate()?;
        if let Some(threshold) = self.threshold {
            if !(threshold >= 0.0 && threshold.is_finite()) {
                return Err(Error::out_of_range(
                    "threshold",
                    threshold,
                    "must be non-negative and finite",
                ));
            }
        }
        if TweetFilter::normalize_hashtag(&self.hashtag).is_empty() {
            warn!("No topic hashtag configured; no post will be used for training");
        }
        Ok(())
    }
}
