//! Per-conversation turn history with a character budget.
//!
//! Each conversation starts with the configured system turn. [`trim`] evicts
//! the oldest non-system turns until the history fits the budget or only one
//! turn is left; turns are never truncated.

use std::collections::HashMap;

use crate::llm::{Role, Turn};
use crate::subsystems::comms::ConversationId;

pub struct HistoryStore {
    system_prompt: String,
    conversations: HashMap<ConversationId, Vec<Turn>>,
}

impl HistoryStore {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self { system_prompt: system_prompt.into(), conversations: HashMap::new() }
    }

    /// History for `id`, seeded with the system turn on first use.
    pub fn get_or_create(&mut self, id: ConversationId) -> &mut Vec<Turn> {
        let system_prompt = &self.system_prompt;
        self.conversations
            .entry(id)
            .or_insert_with(|| vec![Turn::system(system_prompt.clone())])
    }

    pub fn get(&self, id: ConversationId) -> Option<&[Turn]> {
        self.conversations.get(&id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: ConversationId) -> bool {
        self.conversations.contains_key(&id)
    }

    /// Append to an existing history. Returns `false` (and drops the turn)
    /// when the conversation has no history.
    pub fn append(&mut self, id: ConversationId, turn: Turn) -> bool {
        match self.conversations.get_mut(&id) {
            Some(turns) => {
                turns.push(turn);
                true
            }
            None => false,
        }
    }

    /// Drop the whole history. `false` means there was nothing to clear.
    pub fn clear(&mut self, id: ConversationId) -> bool {
        self.conversations.remove(&id).is_some()
    }
}

/// Sum of content characters across `turns`.
pub fn total_len(turns: &[Turn]) -> usize {
    turns.iter().map(Turn::char_len).sum()
}

/// Evict oldest turns until `total_len(turns) <= budget` or one turn remains.
/// A leading system turn is never evicted.
pub fn trim(turns: &mut Vec<Turn>, budget: usize) {
    let mut total = total_len(turns);
    let first_evictable = match turns.first() {
        Some(t) if t.role == Role::System => 1,
        _ => 0,
    };

    while total > budget && turns.len() > 1 && turns.len() > first_evictable {
        let removed = turns.remove(first_evictable);
        total -= removed.char_len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Content;

    fn user(n: usize) -> Turn {
        Turn::user(Content::Plain("u".repeat(n)))
    }

    fn assistant(n: usize) -> Turn {
        Turn::assistant("a".repeat(n))
    }

    #[test]
    fn get_or_create_seeds_system_turn() {
        let mut store = HistoryStore::new("be helpful");
        let turns = store.get_or_create(ConversationId(7));
        assert_eq!(turns, &vec![Turn::system("be helpful")]);
        assert!(store.contains(ConversationId(7)));
    }

    #[test]
    fn append_requires_existing_history() {
        let mut store = HistoryStore::new("sys");
        assert!(!store.append(ConversationId(1), assistant(3)));
        assert!(!store.contains(ConversationId(1)));

        store.get_or_create(ConversationId(1));
        assert!(store.append(ConversationId(1), assistant(3)));
        assert_eq!(store.get(ConversationId(1)).unwrap().len(), 2);
    }

    #[test]
    fn clear_reports_whether_anything_was_removed() {
        let mut store = HistoryStore::new("sys");
        assert!(!store.clear(ConversationId(5)));
        store.get_or_create(ConversationId(5));
        assert!(store.clear(ConversationId(5)));
        assert!(store.get(ConversationId(5)).is_none());
    }

    #[test]
    fn under_budget_is_untouched() {
        let mut turns = vec![Turn::system("sys"), user(10), assistant(10)];
        trim(&mut turns, 100);
        assert_eq!(turns.len(), 3);
    }

    #[test]
    fn evicts_oldest_non_system_turn_first() {
        // system (10) + 2990 + 2990 = 5990, then a 50-char user turn.
        let mut turns = vec![Turn::system("s".repeat(10)), assistant(2990), user(2990)];
        turns.push(user(50));
        trim(&mut turns, 6000);

        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0], Turn::system("s".repeat(10)));
        assert_eq!(turns[1], user(2990));
        assert_eq!(turns.last(), Some(&user(50)));
        assert!(total_len(&turns) <= 6000);
    }

    #[test]
    fn system_turn_survives_heavy_trimming() {
        let mut turns = vec![Turn::system("sys"), user(500), assistant(500), user(500)];
        trim(&mut turns, 10);
        assert_eq!(turns, vec![Turn::system("sys")]);
    }

    #[test]
    fn single_oversized_turn_is_kept_whole() {
        let mut turns = vec![user(100)];
        trim(&mut turns, 10);
        assert_eq!(turns, vec![user(100)]);
    }

    #[test]
    fn without_system_turn_evicts_from_front() {
        let mut turns = vec![user(5), assistant(5), user(5)];
        trim(&mut turns, 10);
        assert_eq!(turns, vec![assistant(5), user(5)]);
    }

    #[test]
    fn trim_postcondition_holds_across_budgets() {
        let base = vec![Turn::system("system"), user(40), assistant(120), user(7), assistant(300), user(1)];
        for budget in [0, 1, 6, 7, 50, 128, 300, 310, 1000] {
            let mut turns = base.clone();
            trim(&mut turns, budget);
            assert!(
                total_len(&turns) <= budget || turns.len() == 1,
                "budget {budget}: len {} total {}",
                turns.len(),
                total_len(&turns)
            );
            assert_eq!(turns[0].role, Role::System);
            // Survivors keep their relative order and are a suffix of the evictable turns.
            assert_eq!(&turns[1..], &base[base.len() - (turns.len() - 1)..]);
        }
    }
}
