//! User-facing reply texts (Portuguese).

use {
    chrono::NaiveDate,
    tally_common::types::IntentType,
    tally_service_traits::LedgerEntry,
};

use crate::money::format_brl;

pub const APOLOGY: &str =
    "Desculpe, não consegui processar sua mensagem agora. Tente novamente em instantes.";

pub const CLARIFY: &str = "Não entendi bem. Você pode reformular? Por exemplo: \
\"gastei 50 no mercado\", \"recebi 2000 de salário\" ou \"quanto gastei este mês?\"";

pub const NOTHING_TO_CORRECT: &str = "Não encontrei nenhum lançamento para corrigir.";

pub const SALE_CANCELLED: &str = "Venda cancelada.";

#[must_use]
pub fn kind_label(kind: IntentType) -> &'static str {
    match kind {
        IntentType::Income => "Receita",
        IntentType::FixedExpense => "Despesa fixa",
        IntentType::VariableExpense => "Despesa",
        IntentType::Investment => "Investimento",
        IntentType::Sale => "Venda",
        IntentType::Query | IntentType::Correction | IntentType::Other => "Lançamento",
    }
}

fn registered(kind: IntentType) -> &'static str {
    match kind {
        IntentType::Investment | IntentType::Query | IntentType::Correction | IntentType::Other => {
            "registrado"
        },
        _ => "registrada",
    }
}

#[must_use]
pub fn short_date(date: NaiveDate) -> String {
    date.format("%d/%m").to_string()
}

/// One-line description of a stored entry.
#[must_use]
pub fn describe(entry: &LedgerEntry) -> String {
    format!(
        "{} de {} ({})",
        kind_label(entry.kind),
        format_brl(entry.amount),
        entry.category
    )
}

#[must_use]
pub fn recorded(entry: &LedgerEntry, today: NaiveDate, tip: Option<&str>) -> String {
    let mut reply = format!(
        "{} {}: {} em {}",
        kind_label(entry.kind),
        registered(entry.kind),
        format_brl(entry.amount),
        entry.category
    );
    if entry.date != today {
        reply.push_str(&format!(", dia {}", short_date(entry.date)));
    }
    reply.push('.');
    if let Some(tip) = tip.filter(|t| !t.trim().is_empty()) {
        reply.push_str(&format!("\nDica: {}", tip.trim()));
    }
    reply
}

#[must_use]
pub fn ask_amount(kind: IntentType) -> String {
    match kind {
        IntentType::Income => "Qual foi o valor recebido?".into(),
        IntentType::Investment => "Qual foi o valor investido?".into(),
        _ => "Qual foi o valor gasto?".into(),
    }
}

#[must_use]
pub fn ask_correct_amount(entry: &LedgerEntry) -> String {
    format!(
        "Qual é o valor correto para o último lançamento ({})?",
        describe(entry)
    )
}

#[must_use]
pub fn amended(entry: &LedgerEntry, previous: f64) -> String {
    format!(
        "Corrigi o último lançamento: {} → {} ({}).",
        format_brl(previous),
        format_brl(entry.amount),
        entry.category
    )
}

#[must_use]
pub fn removed(entry: &LedgerEntry) -> String {
    format!("Removi o último lançamento: {}.", describe(entry))
}

#[must_use]
pub fn sale_opened(amount: Option<f64>) -> String {
    match amount {
        Some(amount) => format!(
            "Venda de {}. Quantas unidades foram vendidas? Ex.: \"3 unidades\".",
            format_brl(amount)
        ),
        None => "Certo! Quantas unidades foram vendidas e qual o valor total? \
                 Ex.: \"3 unidades por 45\"."
            .into(),
    }
}

pub const SALE_NEEDS_AMOUNT: &str = "Ainda preciso do valor da venda. Ex.: \"3 unidades por 45\" \
                                     ou \"cancela a venda\" para desistir.";

pub const SALE_CLARIFY: &str = "Não entendi a resposta sobre a venda. Informe a quantidade e o \
                                valor (ex.: \"3 unidades por 45\") ou responda \"cancela a \
                                venda\" para desistir.";

#[must_use]
pub fn sale_recorded(entry: &LedgerEntry, quantity: Option<u32>) -> String {
    match quantity {
        Some(q) => format!(
            "Venda registrada: {q} unidade(s), total {}.",
            format_brl(entry.amount)
        ),
        None => format!("Venda registrada: {}.", format_brl(entry.amount)),
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: IntentType, day: u32) -> LedgerEntry {
        LedgerEntry {
            id: 1,
            user_id: "u1".into(),
            kind,
            amount: 1234.5,
            category: "alimentação".into(),
            description: "mercado".into(),
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            created_at: 0,
        }
    }

    #[test]
    fn recorded_reply_mentions_date_only_when_not_today() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 18).unwrap();
        assert_eq!(
            recorded(&entry(IntentType::VariableExpense, 18), today, None),
            "Despesa registrada: R$ 1.234,50 em alimentação."
        );
        let reply = recorded(&entry(IntentType::Investment, 17), today, Some("diversifique"));
        assert!(reply.starts_with("Investimento registrado"));
        assert!(reply.contains("dia 17/03"));
        assert!(reply.ends_with("Dica: diversifique"));
    }
}
