//! Bounded in-memory conversation history.

use crate::envelope::{ChatTurn, ContextBundle};
use serde::Deserialize;
use std::collections::{BTreeSet, VecDeque};

/// Default number of turns kept.
pub(crate) const DEFAULT_HISTORY_SIZE: usize = 50;

/// Default number of relevant memories returned by a query.
const DEFAULT_RELEVANT_LIMIT: usize = 3;

/// Default number of recent turns placed in a context bundle.
const DEFAULT_RECENT_LIMIT: usize = 10;

/// Words shorter than this are ignored when ranking relevance.
const MIN_WORD_LENGTH: usize = 3;

/// Limits applied when building a context bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextOptions {
    /// Maximum number of recent turns.
    pub recent_limit: usize,
    /// Maximum number of relevant memories.
    pub relevant_limit: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            recent_limit: DEFAULT_RECENT_LIMIT,
            relevant_limit: DEFAULT_RELEVANT_LIMIT,
        }
    }
}

/// Conversation history holding at most `capacity` turns.
///
/// Adding a turn to a full history evicts the oldest one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationMemory {
    capacity: usize,
    turns: VecDeque<ChatTurn>,
}

impl ConversationMemory {
    /// Creates an empty history. A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            turns: VecDeque::new(),
        }
    }

    /// Returns the maximum number of turns kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity, evicting the oldest turns if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict();
    }

    /// Returns the number of stored turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns whether no turn is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Appends a turn.
    pub fn add(&mut self, turn: ChatTurn) {
        self.turns.push_back(turn);
        self.evict();
    }

    /// Returns up to `limit` most recent turns, oldest first. `None` returns
    /// the whole history.
    #[must_use]
    pub fn recent(&self, limit: Option<usize>) -> Vec<ChatTurn> {
        let count = limit.unwrap_or(self.turns.len()).min(self.turns.len());
        self.turns
            .iter()
            .skip(self.turns.len() - count)
            .cloned()
            .collect()
    }

    /// Returns up to `limit` turns sharing words with `query`.
    ///
    /// Turns are ranked by the number of distinct shared words, then by
    /// recency. Turns sharing no word are never returned.
    #[must_use]
    pub fn relevant(&self, query: &str, limit: Option<usize>) -> Vec<ChatTurn> {
        rank(self.turns.iter(), query, limit.unwrap_or(DEFAULT_RELEVANT_LIMIT))
    }

    /// Builds the context for `current`.
    ///
    /// The newest turn is left out when it is the current message itself,
    /// and relevant memories are searched only among turns older than the
    /// recent window so no turn appears twice.
    #[must_use]
    pub fn build_context(&self, current: &str, options: ContextOptions) -> ContextBundle {
        let mut history: Vec<&ChatTurn> = self.turns.iter().collect();
        if history
            .last()
            .is_some_and(|turn| turn.is_user() && turn.content == current)
        {
            history.pop();
        }
        let window_start = history.len().saturating_sub(options.recent_limit);
        let (older, recent) = history.split_at(window_start);

        ContextBundle {
            recent_messages: recent.iter().map(|turn| (*turn).clone()).collect(),
            relevant_memories: rank(older.iter().copied(), current, options.relevant_limit),
        }
    }

    /// Removes every turn and returns how many were stored.
    pub fn clear(&mut self) -> usize {
        let removed = self.turns.len();
        self.turns.clear();
        removed
    }

    fn evict(&mut self) {
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

fn rank<'a>(turns: impl Iterator<Item = &'a ChatTurn>, query: &str, limit: usize) -> Vec<ChatTurn> {
    let wanted = words(query);
    if wanted.is_empty() || limit == 0 {
        return Vec::new();
    }
    let mut scored: Vec<(usize, usize, &ChatTurn)> = turns
        .enumerate()
        .filter_map(|(position, turn)| {
            let score = words(&turn.content).intersection(&wanted).count();
            (score > 0).then_some((score, position, turn))
        })
        .collect();
    scored.sort_by(|left, right| right.0.cmp(&left.0).then(right.1.cmp(&left.1)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, _, turn)| turn.clone())
        .collect()
}

fn words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= MIN_WORD_LENGTH)
        .map(str::to_lowercase)
        .collect()
}
