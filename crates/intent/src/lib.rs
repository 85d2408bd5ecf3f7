//! Turns a chat message into an [`IntentRecord`](tally_common::types::IntentRecord).
//!
//! [`IntentClassifier`] combines the remote provider from `tally-nlu` with a
//! deterministic keyword analyzer, follow-up detection, and enrichment from
//! the user's recent ledger entries.

pub mod amount;
pub mod classifier;
pub mod continuation;
pub mod degraded;
pub mod enrich;
pub mod error;
pub mod keywords;
pub mod offline;
pub mod remote;
pub mod text;

pub use {
    amount::{extract_amount, extract_quantity, strip_quantity},
    classifier::{ClassifyInput, IntentClassifier},
    continuation::ContinuationDetector,
    enrich::Enrichment,
    error::{Error, Result},
    offline::{
        CorrectionCue, OfflineAnalyzer, correction_cue, is_correction, is_undo, mentions_undo,
    },
};
