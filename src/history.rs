//! Bounded rolling history of recently seen in-topic posts.
//!
//! A history retains the word counts of at most `capacity` posts. When a new
//! post arrives and the history is full, the retention policy decides what to
//! give up first:
//!
//! - [`Forget`] drops the whole history and starts again from empty.
//! - [`Queue`] evicts only the oldest post (FIFO).
//!
//! Capacity counts posts, not words. A capacity of zero behaves like a
//! capacity of one: the history only ever holds the latest post.

use std::collections::VecDeque;
use std::fmt;

use ahash::AHashMap;
use clap::ValueEnum;
use log::{error, trace};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A multiset of words with a running total of occurrences.
///
/// `total()` always equals the sum of all counts. Removing a word that has no
/// occurrences left fails instead of going negative. Words whose count drops
/// back to zero stay in the map; callers must treat zero and absent alike.
///
/// Every successful mutation bumps `version()`, so a caller holding a version
/// can tell whether the counts changed since it last looked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordCounts {
    counts: AHashMap<String, u64>,
    total: u64,
    version: u64,
}

impl WordCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, word: &str) {
        match self.counts.get_mut(word) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(word.to_string(), 1);
            }
        }
        self.total += 1;
        self.version += 1;
    }

    pub fn remove(&mut self, word: &str) -> Result<()> {
        match self.counts.get_mut(word) {
            Some(count) if *count > 0 => {
                *count -= 1;
                self.total -= 1;
                self.version += 1;
                Ok(())
            }
            _ => Err(Error::CounterUnderflow(word.to_string())),
        }
    }

    /// Occurrences of `word`, zero if it was never seen.
    pub fn count(&self, word: &str) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct words in the map, including lazily kept zeros.
    pub fn unique(&self) -> usize {
        self.counts.len()
    }

    /// Mutations applied so far. A failed `remove` leaves it unchanged.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn clear(&mut self) {
        self.counts.clear();
        self.total = 0;
        self.version += 1;
    }
}

/// A bounded store of recent posts' word counts.
///
/// Implementations only differ in what they evict once `len() == capacity()`.
pub trait HistoryRetention: fmt::Debug {
    /// Admit a post, running the eviction policy first if the history is full.
    fn add_tweet(&mut self, words: &[String]);

    /// `c(w)`: occurrences of `word` across the retained posts.
    fn word_count(&self, word: &str) -> u64;

    /// `C`: total word occurrences across the retained posts.
    fn all_words_count(&self) -> u64;

    /// `V`: distinct words currently in the history.
    fn unique_word_count(&self) -> usize;

    /// Number of posts currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    /// Forget every retained post.
    fn reset(&mut self);
}

/// Clears the entire history whenever it fills up.
#[derive(Debug, Clone)]
pub struct Forget {
    capacity: usize,
    posts: usize,
    counts: WordCounts,
}

impl Forget {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            posts: 0,
            counts: WordCounts::new(),
        }
    }
}

impl HistoryRetention for Forget {
    fn add_tweet(&mut self, words: &[String]) {
        if self.posts >= self.capacity {
            trace!("History full at {} posts, forgetting everything", self.posts);
            self.reset();
        }
        self.posts += 1;
        for word in words {
            self.counts.add(word);
        }
    }

    fn word_count(&self, word: &str) -> u64 {
        self.counts.count(word)
    }

    fn all_words_count(&self) -> u64 {
        self.counts.total()
    }

    fn unique_word_count(&self) -> usize {
        self.counts.unique()
    }

    fn len(&self) -> usize {
        self.posts
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn reset(&mut self) {
        self.counts.clear();
        self.posts = 0;
    }
}

/// Evicts the oldest retained post whenever the history is full.
#[derive(Debug, Clone)]
pub struct Queue {
    capacity: usize,
    counts: WordCounts,
    /// Admitted posts, oldest first.
    posts: VecDeque<Vec<String>>,
}

impl Queue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            counts: WordCounts::new(),
            posts: VecDeque::with_capacity(capacity.min(4096)),
        }
    }

    fn evict_oldest(&mut self) {
        let Some(oldest) = self.posts.pop_front() else {
            return;
        };
        trace!("History full, evicting oldest post of {} words", oldest.len());
        for word in &oldest {
            // Every word of a queued post was counted on admission.
            if let Err(e) = self.counts.remove(word) {
                error!("History counts out of sync: {e}");
            }
        }
    }
}

impl HistoryRetention for Queue {
    fn add_tweet(&mut self, words: &[String]) {
        if self.posts.len() >= self.capacity {
            self.evict_oldest();
        }
        for word in words {
            self.counts.add(word);
        }
        self.posts.push_back(words.to_vec());
    }

    fn word_count(&self, word: &str) -> u64 {
        self.counts.count(word)
    }

    fn all_words_count(&self) -> u64 {
        self.counts.total()
    }

    fn unique_word_count(&self) -> usize {
        self.counts.unique()
    }

    fn len(&self) -> usize {
        self.posts.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn reset(&mut self) {
        self.counts.clear();
        self.posts.clear();
    }
}

/// Which retention policy to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    Forget,
    /// FIFO eviction of the oldest post.
    #[default]
    Queue,
}

impl HistoryPolicy {
    pub fn build(self, capacity: usize) -> Box<dyn HistoryRetention> {
        match self {
            HistoryPolicy::Forget => Box::new(Forget::new(capacity)),
            HistoryPolicy::Queue => Box::new(Queue::new(capacity)),
        }
    }
}

impl fmt::Display for HistoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryPolicy::Forget => write!(f, "forget"),
            HistoryPolicy::Queue => write!(f, "queue"),
        }
    }
}
