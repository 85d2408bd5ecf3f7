//! Collaborator interfaces the router depends on.
//!
//! Identity, ledger, media interpretation, and outbound delivery are owned by
//! other systems. Each seam is a narrow async trait; the `Noop` variants let
//! the router run before a real collaborator is wired in.

use {
    async_trait::async_trait,
    chrono::NaiveDate,
    serde::{Deserialize, Serialize},
    tally_common::types::{IntentRecord, IntentType, MediaPayload},
    tracing::{info, warn},
};

/// Error type returned by collaborator methods.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    Message { message: String },

    /// The address is already bound to a different user.
    #[error("address {address} is bound to user {bound_to}")]
    Conflict { address: String, bound_to: String },

    /// Transient failure; the user may retry.
    #[error("{0} unavailable")]
    Unavailable(String),

    #[error("{0}")]
    Serde(#[from] serde_json::Error),
}

impl ServiceError {
    #[must_use]
    pub fn message(message: impl std::fmt::Display) -> Self {
        Self::Message {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<String> for ServiceError {
    fn from(value: String) -> Self {
        Self::message(value)
    }
}

impl From<&str> for ServiceError {
    fn from(value: &str) -> Self {
        Self::message(value)
    }
}

pub type ServiceResult<T = ()> = Result<T, ServiceError>;

// ── Identity ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: String,
    /// Unix millis.
    pub created_at: i64,
}

/// Maps conversation addresses to users.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_address(&self, address: &str) -> ServiceResult<Option<User>>;
    async fn get_or_create_user(&self, email: &str) -> ServiceResult<User>;
    /// Bind `address` to `user_id`. Returns [`ServiceError::Conflict`] when the
    /// address already belongs to someone else.
    async fn bind_address(&self, address: &str, user_id: &str) -> ServiceResult;
    /// Bind unconditionally, replacing any previous owner.
    async fn rebind_address(&self, address: &str, user_id: &str) -> ServiceResult;
}

// ── Ledger ──────────────────────────────────────────────────────────────────

/// Entry ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    pub user_id: String,
    pub kind: IntentType,
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
}

impl NewEntry {
    /// Build an entry from a classified record. `None` when the record
    /// carries no usable amount.
    #[must_use]
    pub fn from_record(user_id: &str, record: &IntentRecord, date: NaiveDate) -> Option<Self> {
        let amount = record.amount.filter(|a| a.is_finite() && *a > 0.0)?;
        Some(Self {
            user_id: user_id.to_string(),
            kind: record.kind,
            amount,
            category: record.category_or_default().to_string(),
            description: record
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| record.category_or_default().to_string()),
            date,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: String,
    pub kind: IntentType,
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
    /// Unix millis.
    pub created_at: i64,
}

/// Sums per kind over a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub income: f64,
    pub fixed_expense: f64,
    pub variable_expense: f64,
    pub investment: f64,
    pub entries: usize,
}

impl LedgerTotals {
    pub fn add(&mut self, kind: IntentType, amount: f64) {
        match kind {
            IntentType::Income | IntentType::Sale => self.income += amount,
            IntentType::FixedExpense => self.fixed_expense += amount,
            IntentType::VariableExpense => self.variable_expense += amount,
            IntentType::Investment => self.investment += amount,
            IntentType::Query | IntentType::Correction | IntentType::Other => return,
        }
        self.entries += 1;
    }

    #[must_use]
    pub fn expenses(&self) -> f64 {
        self.fixed_expense + self.variable_expense
    }

    #[must_use]
    pub fn balance(&self) -> f64 {
        self.income - self.expenses() - self.investment
    }
}

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn record(&self, entry: NewEntry) -> ServiceResult<LedgerEntry>;
    /// Most recent first.
    async fn recent_entries(&self, user_id: &str, limit: usize) -> ServiceResult<Vec<LedgerEntry>>;
    async fn last_entry(&self, user_id: &str) -> ServiceResult<Option<LedgerEntry>>;
    /// Returns whether an entry was removed.
    async fn delete_entry(&self, user_id: &str, entry_id: i64) -> ServiceResult<bool>;
    async fn update_amount(
        &self,
        user_id: &str,
        entry_id: i64,
        amount: f64,
    ) -> ServiceResult<Option<LedgerEntry>>;
    /// Totals for entries dated on or after `since` (all entries when `None`).
    async fn totals(&self, user_id: &str, since: Option<NaiveDate>) -> ServiceResult<LedgerTotals>;
}

// ── Media ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MediaContext {
    pub conversation_id: String,
    pub user_id: Option<String>,
}

/// Text extracted from media, optionally with a ready classification.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInput {
    pub text: String,
    /// When present the classifier is skipped.
    pub hint: Option<IntentRecord>,
}

impl NormalizedInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hint: None,
        }
    }
}

/// Transcribes audio and reads images (receipts, product photos).
#[async_trait]
pub trait MediaInterpreter: Send + Sync {
    async fn process(
        &self,
        media: &MediaPayload,
        context: &MediaContext,
    ) -> ServiceResult<NormalizedInput>;
}

pub struct NoopMediaInterpreter;

#[async_trait]
impl MediaInterpreter for NoopMediaInterpreter {
    async fn process(
        &self,
        media: &MediaPayload,
        _context: &MediaContext,
    ) -> ServiceResult<NormalizedInput> {
        Err(ServiceError::Unavailable(format!("{} interpreter", media.kind)))
    }
}

// ── Outbound ────────────────────────────────────────────────────────────────

/// Sends replies back to the originating conversation.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, conversation_id: &str, text: &str) -> ServiceResult;
}

/// Logs replies instead of sending them.
pub struct NoopChannelOutbound;

#[async_trait]
impl ChannelOutbound for NoopChannelOutbound {
    async fn send_text(&self, conversation_id: &str, text: &str) -> ServiceResult {
        if text.is_empty() {
            warn!(conversation_id, "dropping empty outbound message");
        } else {
            info!(conversation_id, len = text.len(), "outbound message (noop channel)");
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, tally_common::types::MediaKind};

    #[test]
    fn new_entry_requires_positive_amount() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let record = IntentRecord::new(IntentType::VariableExpense, 0.9);
        assert!(NewEntry::from_record("u1", &record, date).is_none());

        let record = record.with_amount(Some(-5.0));
        assert!(NewEntry::from_record("u1", &record, date).is_none());

        let record = IntentRecord::new(IntentType::VariableExpense, 0.9)
            .with_amount(Some(50.0))
            .with_category("alimentação");
        let entry = NewEntry::from_record("u1", &record, date).unwrap();
        assert_eq!(entry.category, "alimentação");
        assert_eq!(entry.description, "alimentação");
    }

    #[test]
    fn totals_ignore_non_monetary_kinds() {
        let mut totals = LedgerTotals::default();
        totals.add(IntentType::Income, 100.0);
        totals.add(IntentType::Sale, 50.0);
        totals.add(IntentType::FixedExpense, 30.0);
        totals.add(IntentType::VariableExpense, 20.0);
        totals.add(IntentType::Query, 999.0);
        assert_eq!(totals.entries, 4);
        assert!((totals.income - 150.0).abs() < f64::EPSILON);
        assert!((totals.balance() - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn noop_media_is_unavailable() {
        let media = MediaPayload {
            kind: MediaKind::Audio,
            mime_type: "audio/ogg".into(),
            data: vec![1, 2, 3],
        };
        let err = NoopMediaInterpreter
            .process(&media, &MediaContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert_eq!(err.to_string(), "audio interpreter unavailable");
    }

    #[test]
    fn conflict_is_detectable() {
        let err = ServiceError::Conflict {
            address: "5511".into(),
            bound_to: "u2".into(),
        };
        assert!(err.is_conflict());
        assert!(!ServiceError::from("x").is_conflict());
    }
}
