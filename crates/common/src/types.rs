//! Intent records and media payloads shared by the classifier, the
//! dispatcher, and the collaborator seams.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category used whenever no rule or model produced one.
pub const DEFAULT_CATEGORY: &str = "outros";

/// Closed taxonomy of financial operations a message can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentType {
    Income,
    FixedExpense,
    VariableExpense,
    Investment,
    Query,
    Correction,
    Sale,
    Other,
}

impl IntentType {
    pub const ALL: [IntentType; 8] = [
        Self::Income,
        Self::FixedExpense,
        Self::VariableExpense,
        Self::Investment,
        Self::Query,
        Self::Correction,
        Self::Sale,
        Self::Other,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::FixedExpense => "fixed-expense",
            Self::VariableExpense => "variable-expense",
            Self::Investment => "investment",
            Self::Query => "query",
            Self::Correction => "correction",
            Self::Sale => "sale",
            Self::Other => "other",
        }
    }

    /// Parse the labels remote models tend to produce (English or Portuguese,
    /// any separator). Unknown labels map to [`IntentType::Other`].
    #[must_use]
    pub fn parse_lenient(label: &str) -> Self {
        let normalized: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| match c {
                '_' | ' ' => '-',
                other => other,
            })
            .collect();
        match normalized.as_str() {
            "income" | "receita" | "entrada" => Self::Income,
            "fixed-expense" | "despesa-fixa" | "gasto-fixo" => Self::FixedExpense,
            "variable-expense" | "expense" | "despesa-variavel" | "despesa-variável"
            | "despesa" | "gasto" => Self::VariableExpense,
            "investment" | "investimento" => Self::Investment,
            "query" | "consulta" => Self::Query,
            "correction" | "correcao" | "correção" => Self::Correction,
            "sale" | "venda" => Self::Sale,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn is_expense(self) -> bool {
        matches!(self, Self::FixedExpense | Self::VariableExpense)
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative date the user referred to. Handlers resolve it against "today".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateHint {
    #[default]
    Today,
    Yesterday,
    DayBeforeYesterday,
    Unspecified,
}

impl DateHint {
    /// Number of days before today this hint points to.
    #[must_use]
    pub fn days_ago(self) -> i64 {
        match self {
            Self::Today | Self::Unspecified => 0,
            Self::Yesterday => 1,
            Self::DayBeforeYesterday => 2,
        }
    }
}

/// Shape of the answer a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryKind {
    /// Totals per kind.
    Summary,
    /// One line per ledger entry.
    Itemized,
}

/// Structured classification of one user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRecord {
    #[serde(rename = "type")]
    pub kind: IntentType,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub date_hint: DateHint,
    #[serde(default)]
    pub intention: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryKind>,
}

impl IntentRecord {
    pub fn new(kind: IntentType, confidence: f32) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            amount: None,
            category: None,
            description: None,
            date_hint: DateHint::default(),
            intention: String::new(),
            rationale: None,
            tip: None,
            query: None,
        }
    }

    #[must_use]
    pub fn with_amount(mut self, amount: Option<f64>) -> Self {
        self.amount = amount;
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_intention(mut self, intention: impl Into<String>) -> Self {
        self.intention = intention.into();
        self
    }

    #[must_use]
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    /// Category with the default applied.
    #[must_use]
    pub fn category_or_default(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
    }

    #[must_use]
    pub fn is_low_confidence(&self, threshold: f32) -> bool {
        self.confidence < threshold
    }
}

/// Media kinds a channel can attach to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Image,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => f.write_str("audio"),
            Self::Image => f.write_str("image"),
        }
    }
}

/// Raw media attached to an inbound message.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub kind: MediaKind,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl fmt::Debug for MediaPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaPayload")
            .field("kind", &self.kind)
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lenient_accepts_portuguese_and_separators() {
        assert_eq!(IntentType::parse_lenient("Receita"), IntentType::Income);
        assert_eq!(
            IntentType::parse_lenient("despesa_fixa"),
            IntentType::FixedExpense
        );
        assert_eq!(
            IntentType::parse_lenient("variable expense"),
            IntentType::VariableExpense
        );
        assert_eq!(IntentType::parse_lenient("banana"), IntentType::Other);
    }

    #[test]
    fn kind_serializes_under_type_key() {
        let record = IntentRecord::new(IntentType::FixedExpense, 0.9).with_amount(Some(1200.0));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "fixed-expense");
        assert_eq!(json["amount"], 1200.0);
        assert_eq!(json["date_hint"], "today");
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(IntentRecord::new(IntentType::Query, 1.7).confidence, 1.0);
        assert_eq!(IntentRecord::new(IntentType::Query, -0.2).confidence, 0.0);
    }

    #[test]
    fn blank_category_falls_back_to_default() {
        let record = IntentRecord::new(IntentType::VariableExpense, 0.8).with_category("  ");
        assert_eq!(record.category_or_default(), DEFAULT_CATEGORY);
    }

    #[test]
    fn media_debug_hides_bytes() {
        let media = MediaPayload {
            kind: MediaKind::Image,
            mime_type: "image/jpeg".into(),
            data: vec![0; 2048],
        };
        let rendered = format!("{media:?}");
        assert!(rendered.contains("len: 2048"));
    }
}
