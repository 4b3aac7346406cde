use std::collections::VecDeque;

/// Number of most-recent spelling samples retained per card.
pub const SPELLING_WINDOW: usize = 10;

/// Rolling window of typed-answer spelling results for one word.
///
/// Productive-mode sessions record whether the learner's typed answer
/// matched the expected word (exact, case-insensitive). Only the last
/// [`SPELLING_WINDOW`] samples are kept.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpellingTracker {
    samples: VecDeque<bool>,
}

impl SpellingTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate from persisted samples, keeping only the newest window.
    #[must_use]
    pub fn from_samples(samples: impl IntoIterator<Item = bool>) -> Self {
        let mut samples: VecDeque<bool> = samples.into_iter().collect();
        while samples.len() > SPELLING_WINDOW {
            samples.pop_front();
        }
        Self { samples }
    }

    /// Records one typed answer against the expected word.
    ///
    /// Comparison is exact after trimming, ignoring case. Returns whether
    /// the sample was counted as correct.
    pub fn record(&mut self, expected: &str, given: &str) -> bool {
        let correct = expected.trim().to_lowercase() == given.trim().to_lowercase();
        if self.samples.len() == SPELLING_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(correct);
        correct
    }

    /// Fraction of retained samples that were correct.
    ///
    /// Returns `None` until at least one sample has been recorded, so the
    /// UI can distinguish "no data" from "0% correct".
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let correct = self.samples.iter().filter(|&&s| s).count();
        #[allow(clippy::cast_precision_loss)]
        Some(correct as f64 / self.samples.len() as f64)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples oldest-first, for persistence.
    #[must_use]
    pub fn samples(&self) -> Vec<bool> {
        self.samples.iter().copied().collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_is_case_insensitive_and_trimmed() {
        let mut tracker = SpellingTracker::new();
        assert!(tracker.record("Haus", " haus "));
        assert!(!tracker.record("Haus", "Hause"));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn accuracy_is_fraction_of_samples() {
        let mut tracker = SpellingTracker::new();
        assert_eq!(tracker.accuracy(), None);

        tracker.record("Haus", "haus");
        tracker.record("Haus", "hsau");
        tracker.record("Haus", "haus");
        tracker.record("Haus", "haus");

        assert_eq!(tracker.accuracy(), Some(0.75));
    }

    #[test]
    fn window_keeps_only_last_ten_samples() {
        let mut tracker = SpellingTracker::new();
        for _ in 0..SPELLING_WINDOW {
            tracker.record("Haus", "falsch");
        }
        assert_eq!(tracker.accuracy(), Some(0.0));

        // Ten correct answers push all the misses out of the window.
        for _ in 0..SPELLING_WINDOW {
            tracker.record("Haus", "Haus");
        }
        assert_eq!(tracker.len(), SPELLING_WINDOW);
        assert_eq!(tracker.accuracy(), Some(1.0));
    }

    #[test]
    fn from_samples_truncates_to_window() {
        let samples = vec![false; SPELLING_WINDOW + 5]
            .into_iter()
            .chain(std::iter::once(true));
        let tracker = SpellingTracker::from_samples(samples);
        assert_eq!(tracker.len(), SPELLING_WINDOW);
        // The newest sample (the single `true`) survives truncation.
        assert_eq!(tracker.samples().last(), Some(&true));
    }
}
