//! Topicsmooth command-line runner.
//!
//! Streams a labelled ARFF file through a [`StreamClassifier`] in
//! test-then-train order and reports precision, recall and accuracy.
//!
//! # Initialization Sequence
//! 1. Load stored settings (or defaults) and apply command-line overrides
//! 2. Optionally persist the resulting settings
//! 3. Load the evaluation stream
//! 4. Build the classifier; the background corpus is read on the first post
//! 5. Run the stream and print the measurements

use std::path::PathBuf;

use clap::Parser;
use log::info;

use topicsmooth::background::PrunedMass;
use topicsmooth::corpus::Corpus;
use topicsmooth::foreground::SmoothingKind;
use topicsmooth::history::HistoryPolicy;
use topicsmooth::{BackgroundSource, Settings, StreamClassifier};

#[derive(Parser, Debug)]
#[command(name = "topicsmooth")]
#[command(about = "Online topic-perplexity scoring of short posts")]
#[command(version)]
struct Args {
    /// ARFF file the background vocabulary is built from
    #[arg(short = 'p', long)]
    background: PathBuf,

    /// Labelled ARFF file to stream through the classifier
    #[arg(short, long)]
    stream: PathBuf,

    /// Read settings from this file instead of the user config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Topic hashtag; only posts carrying it are used for training
    #[arg(short = 't', long)]
    hashtag: Option<String>,

    /// Smoothing strategy
    #[arg(short = 'f', long, value_enum)]
    smoothing: Option<SmoothingKind>,

    /// History retention policy
    #[arg(short = 'r', long, value_enum)]
    history: Option<HistoryPolicy>,

    /// Number of posts retained in the history
    #[arg(short = 'H', long)]
    history_size: Option<usize>,

    /// Perplexity above which a post is classified in-topic
    #[arg(short = 'm', long, conflicts_with = "no_threshold")]
    threshold: Option<f64>,

    /// Only report perplexities, never classify
    #[arg(long)]
    no_threshold: bool,

    /// Absolute discounting sigma
    #[arg(long)]
    sigma: Option<f64>,

    /// Jelinek-Mercer lambda
    #[arg(long)]
    lambda: Option<f64>,

    /// Bayesian smoothing mu
    #[arg(long)]
    mu: Option<f64>,

    /// Stupid backoff alpha
    #[arg(long)]
    alpha: Option<f64>,

    /// Minimum number of non-hashtag words in a post
    #[arg(short = 'w', long)]
    min_words: Option<usize>,

    /// Column of the post text in the ARFF files
    #[arg(short = 'i', long)]
    tweet_index: Option<usize>,

    /// Renormalize the background over the retained vocabulary
    #[arg(long)]
    renormalize: bool,

    /// Build the background only from posts carrying the topic hashtag
    #[arg(long)]
    background_hashtag: bool,

    /// Save the effective settings as the new user config
    #[arg(long)]
    save_config: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(hashtag) = &self.hashtag {
            settings.hashtag = hashtag.clone();
        }
        if let Some(smoothing) = self.smoothing {
            settings.smoothing = smoothing;
        }
        if let Some(history) = self.history {
            settings.history = history;
        }
        if let Some(size) = self.history_size {
            settings.history_size = size;
        }
        if self.no_threshold {
            settings.threshold = None;
        } else if let Some(threshold) = self.threshold {
            settings.threshold = Some(threshold);
        }
        if let Some(sigma) = self.sigma {
            settings.absolute_discounting_sigma = sigma;
        }
        if let Some(lambda) = self.lambda {
            settings.jelinek_mercer_lambda = lambda;
        }
        if let Some(mu) = self.mu {
            settings.bayesian_mu = mu;
        }
        if let Some(alpha) = self.alpha {
            settings.stupid_backoff_alpha = alpha;
        }
        if let Some(min_words) = self.min_words {
            settings.min_words = min_words;
        }
        if let Some(index) = self.tweet_index {
            settings.tweet_index = index;
        }
        if self.renormalize {
            settings.background.pruned_mass = PrunedMass::Renormalize;
        }
        if self.background_hashtag {
            settings.background.require_hashtag = true;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    args.apply(&mut settings);

    if args.save_config {
        settings.save()?;
        info!("Saved settings to the user config");
    }

    let stream = Corpus::load_file(&args.stream)?;
    let mut classifier =
        StreamClassifier::new(settings, BackgroundSource::File(args.background.clone()))?;

    let evaluation = classifier.run(&stream)?;
    println!("{evaluation}");
    for (name, value) in evaluation.measurements() {
        println!("{name}: {value:.4}");
    }

    Ok(())
}
