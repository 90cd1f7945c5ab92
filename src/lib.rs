//! Topicsmooth - online topic-perplexity scoring of short posts.
//!
//! # Overview
//!
//! Each incoming post is scored by how surprising it is relative to two
//! probability sources:
//!
//! - a static background vocabulary distribution built once from a corpus,
//! - a bounded rolling history of recent posts tagged with the topic.
//!
//! The two are blended by a smoothing strategy into per-word probabilities,
//! aggregated into a perplexity score, and optionally thresholded into an
//! in-topic decision. Posts are scored first and only then learned from.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  ARFF corpus    │ ← Background and stream data (corpus.rs)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  TweetFilter    │ ← Tokenising, hashtag handling (filter.rs)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StreamClassifier│ ← Test-then-train loop, evaluation (classifier.rs)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ ForegroundModel │ ← Smoothing and perplexity (foreground.rs)
//! └───┬─────────┬───┘
//!     │         │
//!     ▼         ▼
//! ┌────────┐ ┌──────────┐
//! │Backgr. │ │ History  │ ← background.rs, history.rs
//! └────────┘ └──────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use topicsmooth::background::{BackgroundModel, BackgroundOptions};
//! use topicsmooth::foreground::{ForegroundModel, Smoothing};
//! use topicsmooth::history::HistoryPolicy;
//!
//! let mut background = BackgroundModel::new(BackgroundOptions::plain());
//! background.build_probabilities(["rain", "sun", "sun", "cloud"]);
//!
//! let mut model = ForegroundModel::new(
//!     background,
//!     HistoryPolicy::Queue.build(1000),
//!     Some(200.0),
//!     Smoothing::StupidBackoff { alpha: 0.3 }.build().unwrap(),
//! );
//!
//! let post = vec!["rain".to_string(), "cloud".to_string()];
//! let before = model.perplexity(&post);
//! model.add_tweet(&post);
//! assert!(model.perplexity(&post) < before);
//! ```

pub mod background;
pub mod classifier;
pub mod config;
pub mod corpus;
pub mod error;
pub mod evaluation;
pub mod filter;
pub mod foreground;
pub mod history;

pub use background::{BackgroundModel, BackgroundOptions, PrunedMass};
pub use classifier::{BackgroundSource, Prediction, StreamClassifier};
pub use config::Settings;
pub use error::{Error, Result};
pub use foreground::{ForegroundModel, Smoother, Smoothing, SmoothingKind};
pub use history::{Forget, HistoryPolicy, HistoryRetention, Queue, WordCounts};
