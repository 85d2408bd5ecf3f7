//! Deterministic keyword analyzer used when the remote path is unavailable.
//!
//! Rules are evaluated in order and the first match decides the intent type;
//! a message matching nothing becomes `other` with a confidence low enough to
//! always ask for clarification.

use tally_common::types::{DEFAULT_CATEGORY, DateHint, IntentRecord, IntentType, QueryKind};

use crate::{
    amount::{extract_amount, extract_quantity, strip_quantity},
    keywords::{self, CategoryTable},
    text::Normalized,
};

pub const CORRECTION_CONFIDENCE: f32 = 0.90;
pub const SALE_CONFIDENCE: f32 = 0.85;
pub const QUERY_CONFIDENCE: f32 = 0.90;
pub const INCOME_CONFIDENCE: f32 = 0.90;
pub const FIXED_EXPENSE_CONFIDENCE: f32 = 0.90;
pub const VARIABLE_EXPENSE_CONFIDENCE: f32 = 0.85;
pub const INVESTMENT_CONFIDENCE: f32 = 0.85;
pub const GENERIC_EXPENSE_CONFIDENCE: f32 = 0.70;
pub const OTHER_CONFIDENCE: f32 = 0.40;

const MAX_DESCRIPTION_CHARS: usize = 120;

/// What a correction message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionCue {
    Amend,
    Undo,
}

/// Classify correction wording in `text`, if any.
///
/// Undo needs a standalone cue ("desfaz") or an undo verb pointing at an
/// entry ("apaga o último"). A transaction verb with an amount ("paguei 120
/// pra cancelar a assinatura") describes a new entry and is never an undo.
#[must_use]
pub fn correction_cue(text: &str) -> Option<CorrectionCue> {
    cue(&Normalized::new(text), extract_amount(text)).map(|(cue, _)| cue)
}

#[must_use]
pub fn is_correction(text: &str) -> bool {
    correction_cue(text).is_some()
}

#[must_use]
pub fn is_undo(text: &str) -> bool {
    correction_cue(text) == Some(CorrectionCue::Undo)
}

/// Any undo verb, with or without an entry reference. Used while a sale is
/// open, where a bare "cancela" already has an obvious target.
#[must_use]
pub fn mentions_undo(text: &str) -> bool {
    let norm = Normalized::new(text);
    norm.has_any(keywords::UNDO_VERBS) || norm.has_any(keywords::UNDO_STANDALONE)
}

fn cue(norm: &Normalized, amount: Option<f64>) -> Option<(CorrectionCue, &'static str)> {
    let undo = norm.first_of(keywords::UNDO_STANDALONE).or_else(|| {
        norm.has_any(keywords::ENTRY_REFERENCE)
            .then(|| norm.first_of(keywords::UNDO_VERBS))
            .flatten()
    });
    if let Some(term) = undo
        && !(amount.is_some() && norm.has_any(keywords::TRANSACTION_VERBS))
    {
        return Some((CorrectionCue::Undo, term));
    }
    norm.first_of(keywords::AMEND)
        .map(|term| (CorrectionCue::Amend, term))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Correction(CorrectionCue),
    Sale,
    Query,
    Income,
    Expense,
    Investment,
    GenericExpense,
}

struct Rule {
    terms: &'static [&'static str],
    branch: Branch,
}

const RULES: &[Rule] = &[
    Rule {
        terms: keywords::SALE,
        branch: Branch::Sale,
    },
    Rule {
        terms: keywords::QUERY,
        branch: Branch::Query,
    },
    Rule {
        terms: keywords::INCOME,
        branch: Branch::Income,
    },
    Rule {
        terms: keywords::EXPENSE,
        branch: Branch::Expense,
    },
    Rule {
        terms: keywords::INVESTMENT,
        branch: Branch::Investment,
    },
    Rule {
        terms: keywords::GENERIC_EXPENSE,
        branch: Branch::GenericExpense,
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineAnalyzer;

impl OfflineAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn analyze(&self, text: &str) -> IntentRecord {
        let norm = Normalized::new(text);
        let amount = extract_amount(text);
        let quantity = extract_quantity(text);

        let matched = cue(&norm, amount)
            .map(|(cue, term)| (Branch::Correction(cue), term))
            .or_else(|| {
                RULES
                    .iter()
                    .find_map(|rule| norm.first_of(rule.terms).map(|term| (rule.branch, term)))
            })
            .or_else(|| quantity.map(|_| (Branch::Sale, "quantidade")));

        let mut record = match matched {
            Some((branch, term)) => build(branch, &norm).with_rationale(format!(
                "regra local: \"{term}\""
            )),
            None => IntentRecord::new(IntentType::Other, OTHER_CONFIDENCE)
                .with_category(DEFAULT_CATEGORY)
                .with_intention("entender a mensagem")
                .with_rationale("nenhuma regra local reconheceu a mensagem"),
        };

        record.amount = match (record.kind, quantity) {
            (IntentType::Sale, Some(_)) => extract_amount(&strip_quantity(text)),
            _ => amount,
        };
        record.date_hint = date_hint(&norm);
        if record.description.is_none() {
            record.description = description(text);
        }
        record
    }
}

fn build(branch: Branch, norm: &Normalized) -> IntentRecord {
    let business = norm.has_any(keywords::BUSINESS);
    match branch {
        Branch::Correction(cue) => IntentRecord::new(IntentType::Correction, CORRECTION_CONFIDENCE)
            .with_category(DEFAULT_CATEGORY)
            .with_intention(match cue {
                CorrectionCue::Undo => "desfazer o último lançamento",
                CorrectionCue::Amend => "corrigir o último lançamento",
            }),
        Branch::Sale => IntentRecord::new(IntentType::Sale, SALE_CONFIDENCE)
            .with_category(keywords::BUSINESS_INCOME_CATEGORY)
            .with_intention("registrar uma venda"),
        Branch::Query => {
            let mut record = IntentRecord::new(IntentType::Query, QUERY_CONFIDENCE)
                .with_category(
                    categorize(norm, keywords::PERSONAL_EXPENSE_CATEGORIES)
                        .unwrap_or(DEFAULT_CATEGORY),
                )
                .with_intention("consultar lançamentos");
            record.query = Some(if norm.has_any(keywords::ITEMIZED) {
                QueryKind::Itemized
            } else {
                QueryKind::Summary
            });
            record
        },
        Branch::Income => {
            let category = if business {
                keywords::BUSINESS_INCOME_CATEGORY
            } else {
                categorize(norm, keywords::PERSONAL_INCOME_CATEGORIES).unwrap_or(DEFAULT_CATEGORY)
            };
            IntentRecord::new(IntentType::Income, INCOME_CONFIDENCE)
                .with_category(category)
                .with_intention("registrar receita")
        },
        Branch::Expense | Branch::GenericExpense => {
            let fixed = norm.has_any(keywords::FIXED_EXPENSE);
            let (kind, confidence) = match (branch, fixed) {
                (Branch::GenericExpense, _) => (
                    if fixed {
                        IntentType::FixedExpense
                    } else {
                        IntentType::VariableExpense
                    },
                    GENERIC_EXPENSE_CONFIDENCE,
                ),
                (_, true) => (IntentType::FixedExpense, FIXED_EXPENSE_CONFIDENCE),
                (_, false) => (IntentType::VariableExpense, VARIABLE_EXPENSE_CONFIDENCE),
            };
            let category = match (business, fixed) {
                (true, true) => keywords::BUSINESS_FIXED_EXPENSE_CATEGORY,
                (true, false) => keywords::BUSINESS_VARIABLE_EXPENSE_CATEGORY,
                (false, _) => categorize(norm, keywords::PERSONAL_EXPENSE_CATEGORIES)
                    .unwrap_or(DEFAULT_CATEGORY),
            };
            IntentRecord::new(kind, confidence)
                .with_category(category)
                .with_intention(if fixed {
                    "registrar despesa fixa"
                } else {
                    "registrar despesa"
                })
        },
        Branch::Investment => IntentRecord::new(IntentType::Investment, INVESTMENT_CONFIDENCE)
            .with_category(
                categorize(norm, keywords::INVESTMENT_CATEGORIES).unwrap_or(DEFAULT_CATEGORY),
            )
            .with_intention("registrar investimento"),
    }
}

fn categorize(norm: &Normalized, table: CategoryTable) -> Option<&'static str> {
    table
        .iter()
        .find(|(terms, _)| norm.has_any(terms))
        .map(|(_, category)| *category)
}

/// Relative date mentioned in the message.
#[must_use]
pub fn date_hint(norm: &Normalized) -> DateHint {
    if norm.has_any(keywords::DAY_BEFORE_YESTERDAY) {
        DateHint::DayBeforeYesterday
    } else if norm.has_any(keywords::YESTERDAY) {
        DateHint::Yesterday
    } else if norm.has_any(keywords::TODAY) {
        DateHint::Today
    } else {
        DateHint::Unspecified
    }
}

fn description(text: &str) -> Option<String> {
    let trimmed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_DESCRIPTION_CHARS).collect())
}
