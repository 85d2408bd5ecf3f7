use std::collections::HashMap;

use {
    tally_common::types::{DEFAULT_CATEGORY, IntentRecord, IntentType},
    tally_config::ClassifierConfig,
    tally_service_traits::LedgerEntry,
};

/// Upper bound for confidence raised by enrichment.
pub const ENRICHED_CONFIDENCE_CAP: f32 = 0.95;

/// Fills in a missing category from the user's recent ledger history.
#[derive(Debug, Clone, Copy)]
pub struct Enrichment {
    window: usize,
    min_share: usize,
    increment: f32,
}

impl Enrichment {
    #[must_use]
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            window: config.enrichment_window,
            min_share: config.enrichment_min_share.max(1),
            increment: config.enrichment_increment,
        }
    }

    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Substitute the dominant recent category when the record has none.
    /// `recent` is most recent first.
    #[must_use]
    pub fn apply(&self, mut record: IntentRecord, recent: &[LedgerEntry]) -> IntentRecord {
        if !matches!(
            record.kind,
            IntentType::Income
                | IntentType::FixedExpense
                | IntentType::VariableExpense
                | IntentType::Investment
        ) {
            return record;
        }
        if record.category_or_default() != DEFAULT_CATEGORY {
            return record;
        }
        let Some(category) = self.dominant(recent) else {
            return record;
        };

        record.category = Some(category.to_string());
        record.confidence = (record.confidence + self.increment)
            .min(ENRICHED_CONFIDENCE_CAP)
            .max(record.confidence);
        let note = format!("categoria \"{category}\" inferida do histórico recente");
        record.rationale = Some(match record.rationale.take() {
            Some(previous) if !previous.is_empty() => format!("{previous}; {note}"),
            _ => note,
        });
        record
    }

    fn dominant<'a>(&self, recent: &'a [LedgerEntry]) -> Option<&'a str> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for entry in recent.iter().take(self.window) {
            if entry.category != DEFAULT_CATEGORY && !entry.category.trim().is_empty() {
                *counts.entry(entry.category.as_str()).or_default() += 1;
            }
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n >= self.min_share)
            .max_by_key(|(_, n)| *n)
            .map(|(category, _)| category)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, chrono::NaiveDate};

    fn entry(id: i64, category: &str) -> LedgerEntry {
        LedgerEntry {
            id,
            user_id: "u1".into(),
            kind: IntentType::VariableExpense,
            amount: 10.0,
            category: category.into(),
            description: category.into(),
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            created_at: 0,
        }
    }

    fn enrichment() -> Enrichment {
        Enrichment::new(&ClassifierConfig::default())
    }

    #[test]
    fn dominant_category_is_substituted() {
        let recent = vec![
            entry(5, "alimentação"),
            entry(4, "transporte"),
            entry(3, "alimentação"),
            entry(2, "alimentação"),
            entry(1, "lazer"),
        ];
        let record = IntentRecord::new(IntentType::VariableExpense, 0.85)
            .with_amount(Some(30.0))
            .with_category(DEFAULT_CATEGORY)
            .with_rationale("regra local: \"gastei\"");
        let enriched = enrichment().apply(record, &recent);
        assert_eq!(enriched.category.as_deref(), Some("alimentação"));
        assert!((enriched.confidence - 0.95).abs() < 1e-6);
        assert!(enriched.rationale.unwrap().contains("histórico"));
    }

    #[test]
    fn confidence_is_capped() {
        let recent = vec![entry(3, "lazer"), entry(2, "lazer"), entry(1, "lazer")];
        let record = IntentRecord::new(IntentType::FixedExpense, 0.9);
        let enriched = enrichment().apply(record, &recent);
        assert!(enriched.confidence <= ENRICHED_CONFIDENCE_CAP);
    }

    #[test]
    fn no_dominant_category_leaves_record() {
        let recent = vec![
            entry(4, "alimentação"),
            entry(3, "transporte"),
            entry(2, "alimentação"),
            entry(1, "lazer"),
        ];
        let record = IntentRecord::new(IntentType::VariableExpense, 0.7);
        let enriched = enrichment().apply(record.clone(), &recent);
        assert_eq!(enriched, record);
    }

    #[test]
    fn only_window_is_considered() {
        let recent = vec![
            entry(6, "transporte"),
            entry(5, "lazer"),
            entry(4, "compras"),
            entry(3, "alimentação"),
            entry(2, "alimentação"),
            entry(1, "alimentação"),
        ];
        let record = IntentRecord::new(IntentType::VariableExpense, 0.7);
        assert!(enrichment().apply(record, &recent).category.is_none());
    }

    #[test]
    fn known_category_and_non_money_kinds_untouched() {
        let recent = vec![entry(3, "lazer"), entry(2, "lazer"), entry(1, "lazer")];
        let categorized = IntentRecord::new(IntentType::VariableExpense, 0.7).with_category("saúde");
        assert_eq!(
            enrichment().apply(categorized, &recent).category.as_deref(),
            Some("saúde")
        );
        let other = IntentRecord::new(IntentType::Other, 0.4);
        assert!(enrichment().apply(other, &recent).confidence < 0.5);
    }
}
