//! Follow-up detection: "mostre cada uma" right after a query reply refers
//! back to that query and asks for its details.

use {
    tally_common::types::IntentType,
    tally_config::ContinuationConfig,
    tally_sessions::Turn,
};

use crate::text::Normalized;

pub struct ContinuationDetector {
    max_words: usize,
    lookback_turns: usize,
    cues: Vec<String>,
}

impl ContinuationDetector {
    #[must_use]
    pub fn new(config: &ContinuationConfig) -> Self {
        let cues = config
            .anaphora
            .iter()
            .chain(config.detail_words.iter())
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        Self {
            max_words: config.max_words,
            lookback_turns: config.lookback_turns,
            cues,
        }
    }

    /// Whether `text` continues the most recent query in `history`.
    ///
    /// `history` holds the turns before this message, oldest first.
    #[must_use]
    pub fn is_continuation(&self, text: &str, history: &[Turn]) -> bool {
        let norm = Normalized::new(text);
        if norm.word_count() == 0 || norm.word_count() > self.max_words {
            return false;
        }
        if !self.cues.iter().any(|cue| norm.has(cue)) {
            return false;
        }
        self.follows_query(history)
    }

    /// The latest user turn decides when it was classified; only an
    /// unclassified one falls back to scanning the last few turns.
    fn follows_query(&self, history: &[Turn]) -> bool {
        let is_query = |turn: &Turn| {
            turn.classification
                .as_ref()
                .is_some_and(|r| r.kind == IntentType::Query)
        };

        if let Some(record) = history
            .iter()
            .rev()
            .find(|t| t.is_user())
            .and_then(|t| t.classification.as_ref())
        {
            return record.kind == IntentType::Query;
        }
        history
            .iter()
            .rev()
            .take(self.lookback_turns)
            .any(is_query)
    }
}
