//! Dual-path intent classification.
//!
//! Follow-ups to a query short-circuit to an itemized query. Otherwise the
//! remote provider is tried under a hard timeout and any failure falls back
//! to the offline analyzer, putting the remote path into a cooldown. Both
//! paths end with contextual enrichment from the user's recent entries.

use std::{sync::Arc, time::Duration};

use {
    tally_common::types::{DEFAULT_CATEGORY, DateHint, IntentRecord, IntentType, QueryKind},
    tally_config::{ClassifierConfig, NluConfig},
    tally_nlu::NluProvider,
    tally_service_traits::{Ledger, LedgerEntry},
    tally_sessions::Turn,
    tracing::{debug, warn},
};

use crate::{
    amount::extract_amount,
    continuation::ContinuationDetector,
    degraded::DegradedState,
    enrich::Enrichment,
    error::{Error, Result},
    offline::{OfflineAnalyzer, QUERY_CONFIDENCE, date_hint},
    remote::{SYSTEM_PROMPT, build_prompt, parse_remote_output},
    text::Normalized,
};

/// What the classifier sees for one message.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyInput<'a> {
    pub text: &'a str,
    /// Authenticated user, used to load recent ledger entries.
    pub user_id: Option<&'a str>,
    /// Turns before this message, oldest first.
    pub history: &'a [Turn],
}

struct RemotePath {
    provider: Arc<dyn NluProvider>,
    timeout: Duration,
    degraded: DegradedState,
}

impl RemotePath {
    async fn classify(&self, text: &str, recent: &[LedgerEntry]) -> Result<IntentRecord> {
        let prompt = build_prompt(text, recent);
        let raw = tokio::time::timeout(
            self.timeout,
            self.provider.classify_remote(SYSTEM_PROMPT, &prompt),
        )
        .await
        .map_err(|_| Error::Timeout(self.timeout))??;
        parse_remote_output(&raw)
    }
}

pub struct IntentClassifier {
    remote: Option<RemotePath>,
    ledger: Arc<dyn Ledger>,
    offline: OfflineAnalyzer,
    continuation: ContinuationDetector,
    enrichment: Enrichment,
}

impl IntentClassifier {
    /// Offline-only classifier.
    #[must_use]
    pub fn new(config: &ClassifierConfig, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            remote: None,
            ledger,
            offline: OfflineAnalyzer::new(),
            continuation: ContinuationDetector::new(&config.continuation),
            enrichment: Enrichment::new(config),
        }
    }

    #[must_use]
    pub fn with_remote(
        mut self,
        provider: Arc<dyn NluProvider>,
        timeout: Duration,
        cooldown: Duration,
    ) -> Self {
        self.remote = Some(RemotePath {
            provider,
            timeout,
            degraded: DegradedState::new(cooldown),
        });
        self
    }

    /// Enable the remote path described by `nlu` when it is usable.
    #[must_use]
    pub fn with_nlu_config(self, nlu: &NluConfig) -> Self {
        match tally_nlu::build_chain(nlu) {
            Some(chain) => self.with_remote(
                chain,
                Duration::from_secs(nlu.timeout_secs),
                Duration::from_secs(nlu.cooldown_secs),
            ),
            None => {
                debug!("remote NLU not configured, classifying offline");
                self
            },
        }
    }

    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Whether the remote path is currently cooling down.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.remote
            .as_ref()
            .is_some_and(|remote| remote.degraded.is_degraded())
    }

    /// Classify one message. Never fails: every error degrades to the
    /// offline analyzer.
    pub async fn classify(&self, input: &ClassifyInput<'_>) -> IntentRecord {
        if self.continuation.is_continuation(input.text, input.history) {
            debug!("follow-up to a query, classifying as itemized query");
            return continuation_record(input.text, input.history);
        }

        let recent = self.recent_entries(input.user_id).await;
        let record = match self.classify_remote(input.text, &recent).await {
            Some(record) => complete(record, input.text),
            None => self.offline.analyze(input.text),
        };
        let record = self.enrichment.apply(record, &recent);
        debug!(
            intent = %record.kind,
            confidence = record.confidence,
            category = record.category_or_default(),
            "classified message"
        );
        record
    }

    async fn recent_entries(&self, user_id: Option<&str>) -> Vec<LedgerEntry> {
        let Some(user_id) = user_id else {
            return Vec::new();
        };
        match self
            .ledger
            .recent_entries(user_id, self.enrichment.window())
            .await
        {
            Ok(entries) => entries,
            Err(error) => {
                warn!(user_id, %error, "could not load recent entries for classification");
                Vec::new()
            },
        }
    }

    async fn classify_remote(&self, text: &str, recent: &[LedgerEntry]) -> Option<IntentRecord> {
        let remote = self.remote.as_ref()?;
        if remote.degraded.is_degraded() {
            debug!(error = %Error::Degraded, "using offline analyzer");
            return None;
        }
        match remote.classify(text, recent).await {
            Ok(record) => {
                remote.degraded.clear();
                Some(record)
            },
            Err(error) => {
                let degrade = error.degrades_remote();
                warn!(
                    provider = remote.provider.name(),
                    model = remote.provider.id(),
                    %error,
                    degrade,
                    "remote classification failed, falling back to offline analyzer"
                );
                if degrade {
                    remote.degraded.mark();
                }
                None
            },
        }
    }
}

/// Fill gaps in a remote record from the message itself.
fn complete(mut record: IntentRecord, text: &str) -> IntentRecord {
    let norm = Normalized::new(text);
    if record.amount.is_none() && !matches!(record.kind, IntentType::Query) {
        record.amount = extract_amount(text);
    }
    if record.description.is_none() {
        record.description = Some(text.trim().to_string()).filter(|d| !d.is_empty());
    }
    if record.date_hint == DateHint::Unspecified {
        record.date_hint = date_hint(&norm);
    }
    record
}

/// Itemized query carrying over the period and category of the query it
/// follows.
fn continuation_record(text: &str, history: &[Turn]) -> IntentRecord {
    let previous = history
        .iter()
        .rev()
        .filter_map(|turn| turn.classification.as_ref())
        .find(|record| record.kind == IntentType::Query);

    let mut record = IntentRecord::new(IntentType::Query, QUERY_CONFIDENCE)
        .with_category(previous.map_or(DEFAULT_CATEGORY, IntentRecord::category_or_default))
        .with_description(text.trim())
        .with_intention("detalhar a consulta anterior")
        .with_rationale("continuação de uma consulta recente");
    record.query = Some(QueryKind::Itemized);
    if let Some(previous) = previous {
        record.date_hint = previous.date_hint;
    }
    record
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use {
        super::*,
        async_trait::async_trait,
        chrono::NaiveDate,
        tally_service_traits::{LedgerTotals, NewEntry, ServiceError, ServiceResult},
    };

    enum Reply {
        Json(&'static str),
        Fail,
        Reject,
        Hang,
    }

    struct FakeNlu {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl FakeNlu {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl NluProvider for FakeNlu {
        fn name(&self) -> &str {
            "fake"
        }

        fn id(&self) -> &str {
            "fake-model"
        }

        async fn classify_remote(&self, _system: &str, _prompt: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Json(raw) => Ok(raw.to_string()),
                Reply::Fail => anyhow::bail!("429 Too Many Requests"),
                Reply::Reject => anyhow::bail!("400 Bad Request"),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(String::new())
                },
            }
        }
    }

    #[derive(Default)]
    struct FakeLedger {
        entries: Mutex<Vec<LedgerEntry>>,
        broken: bool,
    }

    impl FakeLedger {
        fn with_categories(categories: &[&str]) -> Arc<Self> {
            let entries = categories
                .iter()
                .enumerate()
                .map(|(i, category)| LedgerEntry {
                    id: i as i64 + 1,
                    user_id: "u1".into(),
                    kind: IntentType::VariableExpense,
                    amount: 10.0,
                    category: (*category).into(),
                    description: String::new(),
                    date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                    created_at: 0,
                })
                .collect();
            Arc::new(Self {
                entries: Mutex::new(entries),
                broken: false,
            })
        }
    }

    #[async_trait]
    impl Ledger for FakeLedger {
        async fn record(&self, _entry: NewEntry) -> ServiceResult<LedgerEntry> {
            Err(ServiceError::message("read-only"))
        }

        async fn recent_entries(
            &self,
            _user_id: &str,
            limit: usize,
        ) -> ServiceResult<Vec<LedgerEntry>> {
            if self.broken {
                return Err(ServiceError::Unavailable("ledger".into()));
            }
            Ok(self.entries.lock().unwrap().iter().take(limit).cloned().collect())
        }

        async fn last_entry(&self, _user_id: &str) -> ServiceResult<Option<LedgerEntry>> {
            Ok(self.entries.lock().unwrap().first().cloned())
        }

        async fn delete_entry(&self, _user_id: &str, _entry_id: i64) -> ServiceResult<bool> {
            Ok(false)
        }

        async fn update_amount(
            &self,
            _user_id: &str,
            _entry_id: i64,
            _amount: f64,
        ) -> ServiceResult<Option<LedgerEntry>> {
            Ok(None)
        }

        async fn totals(
            &self,
            _user_id: &str,
            _since: Option<NaiveDate>,
        ) -> ServiceResult<LedgerTotals> {
            Ok(LedgerTotals::default())
        }
    }

    fn offline(ledger: Arc<dyn Ledger>) -> IntentClassifier {
        IntentClassifier::new(&ClassifierConfig::default(), ledger)
    }

    fn input<'a>(text: &'a str, history: &'a [Turn]) -> ClassifyInput<'a> {
        ClassifyInput {
            text,
            user_id: Some("u1"),
            history,
        }
    }

    #[tokio::test]
    async fn remote_record_is_used() {
        let nlu = FakeNlu::new(Reply::Json(
            r#"{"type":"income","confidence":0.93,"amount":5000,"category":"salário"}"#,
        ));
        let classifier = offline(Arc::new(FakeLedger::default())).with_remote(
            nlu.clone(),
            Duration::from_secs(1),
            Duration::from_secs(60),
        );
        let record = classifier.classify(&input("Recebi 5000 de salário", &[])).await;
        assert_eq!(record.kind, IntentType::Income);
        assert!((record.confidence - 0.93).abs() < 1e-6);
        assert_eq!(record.description.as_deref(), Some("Recebi 5000 de salário"));
        assert_eq!(nlu.calls.load(Ordering::SeqCst), 1);
        assert!(!classifier.is_degraded());
    }

    #[tokio::test]
    async fn remote_gaps_filled_from_text() {
        let nlu = FakeNlu::new(Reply::Json(r#"{"type":"variable-expense","confidence":0.8}"#));
        let classifier = offline(Arc::new(FakeLedger::default())).with_remote(
            nlu,
            Duration::from_secs(1),
            Duration::from_secs(60),
        );
        let record = classifier.classify(&input("gastei 45 ontem", &[])).await;
        assert_eq!(record.amount, Some(45.0));
        assert_eq!(record.date_hint, DateHint::Yesterday);
    }

    #[tokio::test]
    async fn timeout_falls_back_and_degrades() {
        let nlu = FakeNlu::new(Reply::Hang);
        let classifier = offline(Arc::new(FakeLedger::default())).with_remote(
            nlu.clone(),
            Duration::from_millis(20),
            Duration::from_secs(60),
        );
        let record = classifier.classify(&input("Gastei 50 no supermercado", &[])).await;
        assert_eq!(record.kind, IntentType::VariableExpense);
        assert_eq!(record.category_or_default(), "alimentação");
        assert!(classifier.is_degraded());

        // Cooling down: the provider is not called again.
        classifier.classify(&input("Gastei 10 no mercado", &[])).await;
        assert_eq!(nlu.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn service_error_and_malformed_output_fall_back() {
        for reply in [Reply::Fail, Reply::Json("desculpe, não sei")] {
            let classifier = offline(Arc::new(FakeLedger::default())).with_remote(
                FakeNlu::new(reply),
                Duration::from_secs(1),
                Duration::from_secs(60),
            );
            let record = classifier.classify(&input("Recebi 5000 de salário", &[])).await;
            assert_eq!(record.kind, IntentType::Income);
            assert_eq!(record.amount, Some(5000.0));
            assert!(classifier.is_degraded());
        }
    }

    #[tokio::test]
    async fn rejected_request_falls_back_without_cool_down() {
        let nlu = FakeNlu::new(Reply::Reject);
        let classifier = offline(Arc::new(FakeLedger::default())).with_remote(
            nlu.clone(),
            Duration::from_secs(1),
            Duration::from_secs(60),
        );
        let record = classifier.classify(&input("Recebi 5000 de salário", &[])).await;
        assert_eq!(record.kind, IntentType::Income);
        assert!(!classifier.is_degraded());

        classifier.classify(&input("Gastei 10 no mercado", &[])).await;
        assert_eq!(nlu.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn enrichment_uses_recent_history() {
        let ledger = FakeLedger::with_categories(&[
            "transporte",
            "transporte",
            "lazer",
            "transporte",
            "saúde",
        ]);
        let record = offline(ledger).classify(&input("gastei 30", &[])).await;
        assert_eq!(record.category_or_default(), "transporte");
        assert!((record.confidence - 0.95).abs() < 1e-6);
    }

    #[tokio::test]
    async fn ledger_failure_is_not_fatal() {
        let ledger = Arc::new(FakeLedger {
            broken: true,
            ..FakeLedger::default()
        });
        let record = offline(ledger).classify(&input("gastei 30", &[])).await;
        assert_eq!(record.kind, IntentType::VariableExpense);
        assert_eq!(record.category_or_default(), DEFAULT_CATEGORY);
    }

    #[tokio::test]
    async fn follow_up_becomes_itemized_query() {
        let mut query = Turn::user("quanto gastei ontem?");
        let mut previous = IntentRecord::new(IntentType::Query, 0.9).with_category("alimentação");
        previous.date_hint = DateHint::Yesterday;
        query.classification = Some(previous);
        let history = vec![query, Turn::agent("Você gastou R$ 80,00.")];

        let nlu = FakeNlu::new(Reply::Fail);
        let classifier = offline(Arc::new(FakeLedger::default())).with_remote(
            nlu.clone(),
            Duration::from_secs(1),
            Duration::from_secs(60),
        );
        let record = classifier.classify(&input("mostre cada uma", &history)).await;
        assert_eq!(record.kind, IntentType::Query);
        assert_eq!(record.query, Some(QueryKind::Itemized));
        assert_eq!(record.date_hint, DateHint::Yesterday);
        assert_eq!(record.category_or_default(), "alimentação");
        assert_eq!(nlu.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn follow_up_after_expense_is_not_itemized() {
        let mut expense = Turn::user("gastei 50 no mercado");
        expense.classification = Some(IntentRecord::new(IntentType::VariableExpense, 0.85));
        let history = vec![expense, Turn::agent("Despesa registrada.")];
        let record = offline(Arc::new(FakeLedger::default()))
            .classify(&input("mostre cada uma", &history))
            .await;
        assert_ne!(record.query, Some(QueryKind::Itemized));
    }
}
