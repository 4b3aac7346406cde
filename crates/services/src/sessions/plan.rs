use rand::rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

use lingua_core::model::ReviewCard;

/// Selection result for a session build.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub cards: Vec<ReviewCard>,
    pub due_selected: usize,
    pub new_selected: usize,
}

impl SessionPlan {
    /// Total number of cards in this plan.
    #[must_use]
    pub fn total(&self) -> usize {
        self.cards.len()
    }

    /// Returns true when no cards were selected for this session.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Builds a session queue: due cards first, new cards filling the
/// remaining slots, the whole queue shuffled.
pub struct SessionQueueBuilder {
    limit: usize,
    shuffle: bool,
}

impl SessionQueueBuilder {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            shuffle: true,
        }
    }

    /// Disable the final shuffle (deterministic tests only).
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Build a session plan from repository-provided due and new cards.
    ///
    /// - `due_cards` are sorted by `next_review_at` (re-sorted here so the
    ///   ordering does not depend on the repository's discipline) and take
    ///   priority up to the limit.
    /// - `new_cards` fill whatever slots remain, in creation order.
    /// - The concatenated queue is then Fisher-Yates shuffled so due and
    ///   new items interleave unpredictably.
    pub fn build(
        self,
        due_cards: impl IntoIterator<Item = ReviewCard>,
        new_cards: impl IntoIterator<Item = ReviewCard>,
    ) -> SessionPlan {
        let mut due: Vec<ReviewCard> = due_cards.into_iter().collect();
        due.sort_by(|a, b| {
            a.next_review_at()
                .cmp(&b.next_review_at())
                .then_with(|| a.word().cmp(b.word()))
        });

        let mut selected: Vec<ReviewCard> = due.into_iter().take(self.limit).collect();
        let due_selected = selected.len();
        let selected_keys: HashSet<(String, _)> = selected
            .iter()
            .map(|c| (c.word().to_owned(), c.mode()))
            .collect();

        let remaining = self.limit.saturating_sub(selected.len());
        let mut new_selected = 0;
        if remaining > 0 {
            let fillers: Vec<ReviewCard> = new_cards
                .into_iter()
                .filter(|c| !selected_keys.contains(&(c.word().to_owned(), c.mode())))
                .take(remaining)
                .collect();
            new_selected = fillers.len();
            selected.extend(fillers);
        }

        if self.shuffle {
            let mut rng = rng();
            selected.as_mut_slice().shuffle(&mut rng);
        }

        SessionPlan {
            cards: selected,
            due_selected,
            new_selected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingua_core::model::{Quality, StudyMode};
    use lingua_core::scheduler::Scheduler;
    use lingua_core::time::fixed_now;

    fn new_card(word: &str) -> ReviewCard {
        ReviewCard::new(word, StudyMode::Receptive, fixed_now()).unwrap()
    }

    fn due_card(word: &str, days_overdue: i64) -> ReviewCard {
        let mut card = new_card(word);
        let scheduler = Scheduler::new();
        let reviewed_at = fixed_now() - chrono::Duration::days(days_overdue + 4);
        scheduler.advance(&mut card, Quality::Easy, reviewed_at);
        card
    }

    #[test]
    fn builder_prioritizes_due_and_fills_with_new() {
        let due = vec![due_card("eins", 3), due_card("zwei", 1)];
        let fresh = vec![new_card("drei"), new_card("vier"), new_card("fünf")];

        let plan = SessionQueueBuilder::new(4)
            .with_shuffle(false)
            .build(due, fresh);

        assert_eq!(plan.due_selected, 2);
        assert_eq!(plan.new_selected, 2);
        assert_eq!(plan.total(), 4);
        // Without the shuffle: due sorted most-overdue first, then fillers.
        let words: Vec<&str> = plan.cards.iter().map(ReviewCard::word).collect();
        assert_eq!(words, vec!["eins", "zwei", "drei", "vier"]);
    }

    #[test]
    fn builder_caps_due_cards_at_limit() {
        let due = vec![due_card("eins", 5), due_card("zwei", 3), due_card("drei", 1)];

        let plan = SessionQueueBuilder::new(2)
            .with_shuffle(false)
            .build(due, vec![new_card("vier")]);

        assert_eq!(plan.due_selected, 2);
        assert_eq!(plan.new_selected, 0);
        let words: Vec<&str> = plan.cards.iter().map(ReviewCard::word).collect();
        assert_eq!(words, vec!["eins", "zwei"]);
    }

    #[test]
    fn builder_shuffle_keeps_the_same_card_set() {
        let due = vec![due_card("eins", 2)];
        let fresh = vec![new_card("zwei"), new_card("drei")];

        let plan = SessionQueueBuilder::new(5).build(due, fresh);

        assert_eq!(plan.total(), 3);
        let mut words: Vec<&str> = plan.cards.iter().map(ReviewCard::word).collect();
        words.sort_unstable();
        assert_eq!(words, vec!["drei", "eins", "zwei"]);
    }

    #[test]
    fn builder_handles_empty_input() {
        let plan = SessionQueueBuilder::new(5).build(Vec::new(), Vec::new());
        assert!(plan.is_empty());
        assert_eq!(plan.due_selected, 0);
        assert_eq!(plan.new_selected, 0);
    }
}
