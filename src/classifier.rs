//! Test-then-train streaming classifier around the scoring engine.
//!
//! The classifier owns the configuration and builds the [`ForegroundModel`]
//! lazily, on the first post it sees, from the configured background source.
//! Every post is scored against the model as it stood *before* that post,
//! and only afterwards (if it qualifies) folded into the history.

use std::path::PathBuf;

use log::{debug, info, trace};

use crate::background::BackgroundModel;
use crate::config::Settings;
use crate::corpus::Corpus;
use crate::error::Result;
use crate::evaluation::Evaluation;
use crate::filter::TweetFilter;
use crate::foreground::ForegroundModel;

/// Where the background vocabulary comes from.
#[derive(Debug, Clone)]
pub enum BackgroundSource {
    /// Raw post texts held in memory.
    Posts(Vec<String>),
    /// An ARFF file; the text column is `Settings::tweet_index`.
    File(PathBuf),
}

/// Score of one post.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub perplexity: f64,
    /// In-topic decision, present when a threshold is configured.
    pub in_topic: Option<bool>,
}

#[derive(Debug)]
pub struct StreamClassifier {
    settings: Settings,
    filter: TweetFilter,
    background_source: BackgroundSource,
    model: Option<ForegroundModel>,
    evaluation: Evaluation,
    trained: u64,
}

impl StreamClassifier {
    /// Validate `settings` and prepare a classifier. The background is not
    /// read until the first post arrives.
    pub fn new(settings: Settings, background_source: BackgroundSource) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            filter: settings.filter(),
            settings,
            background_source,
            model: None,
            evaluation: Evaluation::new(),
            trained: 0,
        })
    }

    fn model(&mut self) -> Result<&mut ForegroundModel> {
        let model = match self.model.take() {
            Some(model) => model,
            None => self.initialize()?,
        };
        Ok(self.model.insert(model))
    }

    fn initialize(&self) -> Result<ForegroundModel> {
        let background = self.load_background()?;
        let history = self.settings.history.build(self.settings.history_size);
        let smoother = self.settings.smoothing().build()?;

        info!(
            "Initialized {} model: {} background words, {} history of {} posts",
            smoother.name(),
            background.vocabulary_size(),
            self.settings.history,
            self.settings.history_size
        );
        Ok(ForegroundModel::new(
            background,
            history,
            self.settings.threshold,
            smoother,
        ))
    }

    /// Background posts pass the classification filter (minimum length
    /// only), unless `require_hashtag` asks for the training filter instead.
    fn load_background(&self) -> Result<BackgroundModel> {
        let accept = |text: &str| {
            if self.settings.background.require_hashtag {
                self.filter.for_training(text)
            } else {
                self.filter.for_classification(text)
            }
        };
        let posts: Vec<Vec<String>> = match &self.background_source {
            BackgroundSource::Posts(texts) => texts
                .iter()
                .filter_map(|text| accept(text.as_str()))
                .collect(),
            BackgroundSource::File(path) => Corpus::load_file(path)?
                .texts(self.settings.tweet_index)
                .filter_map(accept)
                .collect(),
        };

        debug!("Building background model from {} posts", posts.len());
        Ok(BackgroundModel::from_posts(
            self.settings.background_options(),
            &posts,
        ))
    }

    /// Score a post without learning from it. `None` if the post is too
    /// short to judge.
    pub fn predict(&mut self, text: &str) -> Result<Option<Prediction>> {
        let Some(words) = self.filter.for_classification(text) else {
            trace!("Skipping post below {} words", self.filter.min_words());
            return Ok(None);
        };

        let model = self.model()?;
        let perplexity = model.perplexity(&words);
        let in_topic = model.classify(&words);
        trace!("Perplexity {perplexity:.3} for {} words", words.len());

        Ok(Some(Prediction {
            perplexity,
            in_topic,
        }))
    }

    /// Fold a post into the history if it is a valid training example.
    pub fn train(&mut self, text: &str) -> Result<bool> {
        let Some(words) = self.filter.for_training(text) else {
            return Ok(false);
        };
        self.model()?.add_tweet(&words);
        self.trained += 1;
        Ok(true)
    }

    /// Predict, record the outcome against `label` if both are known, then
    /// train.
    pub fn process(&mut self, text: &str, label: Option<bool>) -> Result<Option<Prediction>> {
        let prediction = self.predict(text)?;
        if let (Some(predicted), Some(actual)) =
            (prediction.and_then(|p| p.in_topic), label)
        {
            self.evaluation.record(predicted, actual);
        }
        self.train(text)?;
        Ok(prediction)
    }

    /// Stream every record of a labelled corpus through [`process`](Self::process).
    pub fn run(&mut self, corpus: &Corpus) -> Result<&Evaluation> {
        for record in corpus.records() {
            let Some(text) = record.value(self.settings.tweet_index) else {
                continue;
            };
            self.process(text, corpus.class_label(record))?;
        }
        debug!(
            "Stream finished: {} posts trained, {}",
            self.trained, self.evaluation
        );
        Ok(&self.evaluation)
    }

    pub fn evaluation(&self) -> &Evaluation {
        &self.evaluation
    }

    /// Posts folded into the history so far.
    pub fn trained(&self) -> u64 {
        self.trained
    }

    /// The engine, once it has been built.
    pub fn foreground(&self) -> Option<&ForegroundModel> {
        self.model.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Drop the engine and all counters. The background is rebuilt on the
    /// next post.
    pub fn reset(&mut self) {
        if let Some(mut model) = self.model.take() {
            model.reset();
        }
        self.evaluation.reset();
        self.trained = 0;
    }
}
