use topicsmooth::background::{BackgroundModel, BackgroundOptions, PrunedMass};
use topicsmooth::foreground::{ForegroundModel, Smoothing, PROBABILITY_FLOOR};
use topicsmooth::history::{Forget, HistoryPolicy, HistoryRetention, Queue};

fn post(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn animals() -> Vec<&'static str> {
    let mut words = vec!["cat"; 3];
    words.extend(vec!["dog"; 11]);
    words
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

#[test]
fn background_pruning_zeroes_rare_words() {
    let options = BackgroundOptions {
        min_count: 3,
        ..BackgroundOptions::plain()
    };
    let mut background = BackgroundModel::new(options);
    background.build_probabilities(animals());

    assert_eq!(background.probability("cat"), 0.0);
    assert!(background.probability("dog") > 0.0);
}

#[test]
fn background_normalization_without_pruning() {
    let words = "the quick brown fox jumps over the lazy dog and the cat".split(' ');
    let mut background = BackgroundModel::new(BackgroundOptions::plain());
    background.build_probabilities(words);

    assert!((background.probability_mass() - 1.0).abs() < 1e-9);
}

#[test]
fn forget_keeps_only_the_latest_post_after_overflow() {
    let history_size = 5;
    let mut history = Forget::new(history_size);
    for i in 0..=history_size {
        history.add_tweet(&[format!("w{i}")]);
    }

    assert_eq!(history.all_words_count(), 1);
    assert_eq!(history.len(), 1);
}

#[test]
fn queue_evicts_in_fifo_order() {
    let mut history = Queue::new(2);
    history.add_tweet(&post(&["x"]));
    history.add_tweet(&post(&["y"]));
    history.add_tweet(&post(&["z"]));

    assert_eq!(history.word_count("x"), 0);
    assert_eq!(history.word_count("y"), 1);
    assert_eq!(history.word_count("z"), 1);
}

#[test]
fn history_total_matches_counts_under_churn() {
    let posts = [
        post(&["a", "b", "a"]),
        post(&["c"]),
        post(&["a", "d"]),
        post(&[]),
        post(&["b", "b", "e"]),
    ];
    for policy in [HistoryPolicy::Forget, HistoryPolicy::Queue] {
        let mut history = policy.build(3);
        for p in posts.iter().cycle().take(17) {
            history.add_tweet(p);
            let sum: u64 = ["a", "b", "c", "d", "e"]
                .iter()
                .map(|w| history.word_count(w))
                .sum();
            assert_eq!(sum, history.all_words_count(), "{policy}");
            assert!(history.len() <= history.capacity());
        }
    }
}

#[test]
fn stupid_backoff_with_empty_history() {
    let mut background = BackgroundModel::new(BackgroundOptions::plain());
    background.build_probabilities(["word", "a", "b", "c", "d"]);
    let model = ForegroundModel::new(
        background,
        HistoryPolicy::Queue.build(10),
        None,
        Smoothing::StupidBackoff { alpha: 0.3 }.build().unwrap(),
    );

    assert_eq!(model.probability("word"), (0.3 / 1.3) * 0.2);
}

#[test]
fn perplexity_is_lower_for_expected_words() {
    let mut background = BackgroundModel::new(BackgroundOptions::plain());
    background.build_probabilities(["sun", "sun", "sun", "rain"]);

    for smoothing in [
        Smoothing::AbsoluteDiscounting { sigma: 0.9 },
        Smoothing::JelinekMercer { lambda: 0.4 },
        Smoothing::Bayesian { mu: 10.0 },
        Smoothing::StupidBackoff { alpha: 0.3 },
        Smoothing::BackgroundOnly,
    ] {
        let mut model = ForegroundModel::new(
            background.clone(),
            HistoryPolicy::Queue.build(10),
            None,
            smoothing.build().unwrap(),
        );
        model.add_tweet(&post(&["sun", "storm"]));

        let expected = model.perplexity(&["sun", "sun"]);
        let surprising = model.perplexity(&["hail", "snow"]);
        assert!(expected < surprising, "{smoothing:?}");
        assert!(surprising.is_finite(), "{smoothing:?}");
    }
}

#[test]
fn zero_probability_words_hit_the_floor() {
    let model = ForegroundModel::new(
        BackgroundModel::new(BackgroundOptions::plain()),
        HistoryPolicy::Forget.build(10),
        Some(1.0),
        Smoothing::BackgroundOnly.build().unwrap(),
    );

    let perplexity = model.perplexity(&["nothing"]);
    assert!((perplexity * PROBABILITY_FLOOR - 1.0).abs() < 1e-6);
    assert_eq!(model.classify(&["nothing"]), Some(true));
}

#[test]
fn reset_then_replay_reproduces_counts() {
    let posts = [
        post(&["a", "b"]),
        post(&["b", "c"]),
        post(&["c", "c", "d"]),
        post(&["a"]),
    ];
    let mut model = ForegroundModel::new(
        BackgroundModel::new(BackgroundOptions::plain()),
        HistoryPolicy::Queue.build(3),
        None,
        Smoothing::Bayesian { mu: 100.0 }.build().unwrap(),
    );

    for p in &posts {
        model.add_tweet(p);
    }
    let words = ["a", "b", "c", "d"];
    let first: Vec<u64> = words.iter().map(|w| model.history().word_count(w)).collect();

    model.reset();
    for p in &posts {
        model.add_tweet(p);
    }
    let second: Vec<u64> = words.iter().map(|w| model.history().word_count(w)).collect();

    assert_eq!(first, second);
    assert_eq!(first, vec![1, 1, 3, 1]);
}

#[test]
fn end_to_end_animals_with_absent_pruned_mass() {
    let options = BackgroundOptions {
        min_count: 10,
        ..BackgroundOptions::plain()
    };
    let mut background = BackgroundModel::new(options);
    background.build_probabilities(animals());
    assert!(close(background.probability("dog"), 11.0 / 14.0));

    let model = ForegroundModel::new(
        background,
        HistoryPolicy::Queue.build(1000),
        None,
        Smoothing::StupidBackoff { alpha: 0.3 }.build().unwrap(),
    );
    assert!(close(model.probability("dog"), (0.3 / 1.3) * (11.0 / 14.0)));
    assert_eq!(model.probability("cat"), 0.0);
}

#[test]
fn end_to_end_animals_with_renormalized_background() {
    let options = BackgroundOptions {
        min_count: 10,
        pruned_mass: PrunedMass::Renormalize,
        ..BackgroundOptions::plain()
    };
    let mut background = BackgroundModel::new(options);
    background.build_probabilities(animals());
    assert_eq!(background.probability("dog"), 1.0);

    let model = ForegroundModel::new(
        background,
        HistoryPolicy::Queue.build(1000),
        None,
        Smoothing::StupidBackoff { alpha: 0.3 }.build().unwrap(),
    );
    assert!(close(model.probability("dog"), 0.3 / 1.3));
    assert!((model.probability("dog") - 0.2308).abs() < 1e-4);
    assert_eq!(model.probability("cat"), 0.0);
}
