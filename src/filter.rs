//! Turning raw post text into the word sequences the engine scores.
//!
//! Filtering is deliberately crude, matching how the models were tuned:
//!
//! 1. lower-case and split on whitespace,
//! 2. strip leading characters that are neither ASCII letters nor `#`,
//! 3. drop the topic hashtag itself (remembering that it was there),
//! 4. require at least `min_words` words that are not hashtags.
//!
//! Training additionally requires the topic hashtag to have been present:
//! only posts that were explicitly tagged teach the history what the topic
//! looks like.

/// Stop words excluded from background counting by default.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "i", "a", "about", "an", "are", "as", "at", "be", "by", "com", "for", "from", "how", "in",
    "is", "it", "of", "on", "or", "that", "the", "this", "to", "was", "what", "when", "where",
    "who", "will", "with", "www",
];

/// Result of sanitising one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub words: Vec<String>,
    /// Whether the topic hashtag was found (and removed).
    pub had_hashtag: bool,
}

impl Sanitized {
    /// Words that are not themselves hashtags.
    pub fn content_words(&self) -> usize {
        self.words.iter().filter(|w| !w.starts_with('#')).count()
    }
}

#[derive(Debug, Clone)]
pub struct TweetFilter {
    hashtag: String,
    min_words: usize,
}

impl TweetFilter {
    pub fn new(hashtag: &str, min_words: usize) -> Self {
        Self {
            hashtag: Self::normalize_hashtag(hashtag),
            min_words,
        }
    }

    /// Lower-case the tag and make sure it starts with `#`. An empty tag
    /// stays empty.
    pub fn normalize_hashtag(tag: &str) -> String {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || tag.starts_with('#') {
            tag
        } else {
            format!("#{tag}")
        }
    }

    pub fn hashtag(&self) -> &str {
        &self.hashtag
    }

    pub fn min_words(&self) -> usize {
        self.min_words
    }

    pub fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    pub fn sanitize(&self, tokens: Vec<String>) -> Sanitized {
        let mut had_hashtag = false;
        let mut words = Vec::with_capacity(tokens.len());

        for token in tokens {
            let word = token.trim_start_matches(|c: char| !(c.is_ascii_alphabetic() || c == '#'));
            if word.is_empty() {
                continue;
            }
            if word == self.hashtag {
                had_hashtag = true;
                continue;
            }
            words.push(word.to_string());
        }

        Sanitized { words, had_hashtag }
    }

    /// Words to score, or `None` if the post is too short to judge.
    pub fn for_classification(&self, text: &str) -> Option<Vec<String>> {
        let sanitized = self.sanitize(Self::tokenize(text));
        (sanitized.content_words() >= self.min_words).then_some(sanitized.words)
    }

    /// Words to learn from, or `None` if the post is too short or was not
    /// tagged with the topic hashtag.
    pub fn for_training(&self, text: &str) -> Option<Vec<String>> {
        let sanitized = self.sanitize(Self::tokenize(text));
        (sanitized.had_hashtag && sanitized.content_words() >= self.min_words)
            .then_some(sanitized.words)
    }
}
