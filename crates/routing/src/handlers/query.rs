//! Balance and spending questions.

use std::fmt::Write as _;

use {
    tally_common::types::{DEFAULT_CATEGORY, IntentRecord, IntentType, QueryKind},
    tally_service_traits::LedgerEntry,
};

use crate::{
    error::Result,
    handlers::HandlerContext,
    money::format_brl,
    period::{Period, query_period},
    replies::{kind_label, short_date},
};

/// Upper bound on entries scanned for itemized or per-category answers.
const SCAN_LIMIT: usize = 200;

pub async fn handle(ctx: &HandlerContext<'_>, record: &IntentRecord) -> Result<String> {
    let period = query_period(record.date_hint, ctx.today);
    let category = Some(record.category_or_default()).filter(|c| *c != DEFAULT_CATEGORY);

    match (record.query.unwrap_or(QueryKind::Summary), category) {
        (QueryKind::Itemized, _) => itemized(ctx, &period, category).await,
        (QueryKind::Summary, Some(category)) => category_total(ctx, &period, category).await,
        (QueryKind::Summary, None) => summary(ctx, &period).await,
    }
}

async fn summary(ctx: &HandlerContext<'_>, period: &Period) -> Result<String> {
    let totals = ctx.ledger.totals(ctx.user_id(), Some(period.since)).await?;
    if totals.entries == 0 {
        return Ok(format!("Você não tem lançamentos {}.", period.label));
    }
    let mut reply = format!("Resumo {}:\n", period.label);
    let _ = writeln!(reply, "Receitas: {}", format_brl(totals.income));
    let _ = writeln!(reply, "Despesas fixas: {}", format_brl(totals.fixed_expense));
    let _ = writeln!(reply, "Despesas variáveis: {}", format_brl(totals.variable_expense));
    let _ = writeln!(reply, "Investimentos: {}", format_brl(totals.investment));
    let _ = write!(reply, "Saldo: {}", format_brl(totals.balance()));
    Ok(reply)
}

async fn category_total(
    ctx: &HandlerContext<'_>,
    period: &Period,
    category: &str,
) -> Result<String> {
    let entries = entries_in(ctx, period, Some(category)).await?;
    let spent: f64 = entries
        .iter()
        .filter(|e| e.kind.is_expense())
        .map(|e| e.amount)
        .sum();
    let received: f64 = entries
        .iter()
        .filter(|e| matches!(e.kind, IntentType::Income | IntentType::Sale))
        .map(|e| e.amount)
        .sum();

    Ok(match (spent > 0.0, received > 0.0) {
        (false, false) => format!("Nenhum lançamento em {category} {}.", period.label),
        (true, false) => format!(
            "Você gastou {} com {category} {}.",
            format_brl(spent),
            period.label
        ),
        (false, true) => format!(
            "Você recebeu {} em {category} {}.",
            format_brl(received),
            period.label
        ),
        (true, true) => format!(
            "Em {category} {}: gastos de {} e entradas de {}.",
            period.label,
            format_brl(spent),
            format_brl(received)
        ),
    })
}

async fn itemized(
    ctx: &HandlerContext<'_>,
    period: &Period,
    category: Option<&str>,
) -> Result<String> {
    let entries = entries_in(ctx, period, category).await?;
    if entries.is_empty() {
        return Ok(format!("Nenhum lançamento {}.", period.label));
    }

    let mut reply = format!("Lançamentos {}:\n", period.label);
    // Oldest first reads like a statement.
    for entry in entries.iter().rev() {
        let _ = writeln!(
            reply,
            "- {} {} {} em {} ({})",
            short_date(entry.date),
            kind_label(entry.kind),
            format_brl(entry.amount),
            entry.category,
            entry.description
        );
    }
    let _ = write!(reply, "Total: {} lançamento(s)", entries.len());
    Ok(reply)
}

/// Entries in the period, most recent first.
async fn entries_in(
    ctx: &HandlerContext<'_>,
    period: &Period,
    category: Option<&str>,
) -> Result<Vec<LedgerEntry>> {
    let entries = ctx.ledger.recent_entries(ctx.user_id(), SCAN_LIMIT).await?;
    Ok(entries
        .into_iter()
        .filter(|e| e.date >= period.since)
        .filter(|e| category.is_none_or(|c| e.category == c))
        .collect())
}
