//! Online precision / recall / accuracy bookkeeping.

use std::fmt;

/// Confusion-matrix counters accumulated one prediction at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub true_positive: u64,
    pub true_negative: u64,
    pub false_positive: u64,
    pub false_negative: u64,
}

impl Evaluation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.true_positive += 1,
            (true, false) => self.false_positive += 1,
            (false, true) => self.false_negative += 1,
            (false, false) => self.true_negative += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.true_positive + self.true_negative + self.false_positive + self.false_negative
    }

    /// `tp / (tp + fp)`, zero before any positive prediction.
    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    /// `tp / (tp + fn)`, zero before any positive example.
    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    /// Named measurements in reporting order.
    pub fn measurements(&self) -> [(&'static str, f64); 3] {
        [
            ("Precision", self.precision()),
            ("Recall", self.recall()),
            ("Accuracy", self.accuracy()),
        ]
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} predictions", self.total())?;
        for (name, value) in self.measurements() {
            write!(f, ", {name} {value:.4}")?;
        }
        Ok(())
    }
}
