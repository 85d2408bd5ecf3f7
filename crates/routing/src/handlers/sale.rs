//! Two-step sales: a sale intent opens a pending sale, the next message
//! supplies quantity and value.

use {
    tally_common::types::{IntentRecord, IntentType},
    tally_intent::{
        extract_amount, extract_quantity, keywords, mentions_undo, strip_quantity,
        text::Normalized,
    },
    tally_service_traits::NewEntry,
    tracing::info,
};

use crate::{
    error::Result,
    handlers::HandlerContext,
    pending::PendingSale,
    replies,
};

const UNIT_PRICE: &[&str] = &["cada", "unitario", "a unidade", "por unidade"];

/// Quantity and value read from a reply to an open sale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleReply {
    pub quantity: Option<u32>,
    pub total: Option<f64>,
}

#[must_use]
pub fn parse_reply(text: &str) -> SaleReply {
    let quantity = extract_quantity(text);
    let amount = extract_amount(&strip_quantity(text));
    let total = match (amount, quantity) {
        (Some(price), Some(q)) if Normalized::new(text).has_any(UNIT_PRICE) => {
            Some(price * f64::from(q))
        },
        (amount, _) => amount,
    };
    SaleReply { quantity, total }
}

/// Whether an open sale should consume this message. A confident,
/// unrelated intent (an expense, a query, personal income) passes through.
/// Low-confidence messages are claimed so the sale is never left behind,
/// but the dispatcher only asks for clarification on them.
#[must_use]
pub fn claims(record: &IntentRecord, threshold: f32) -> bool {
    if record.is_low_confidence(threshold) {
        return true;
    }
    match record.kind {
        IntentType::Other | IntentType::Sale => true,
        IntentType::Income => record.category_or_default() == keywords::BUSINESS_INCOME_CATEGORY,
        _ => false,
    }
}

/// Open a pending sale, or record it at once when the message already
/// carries both quantity and value.
pub async fn open(ctx: &HandlerContext<'_>, record: &IntentRecord) -> Result<String> {
    let description = record
        .description
        .clone()
        .unwrap_or_else(|| ctx.request.text.trim().to_string());
    let reply = parse_reply(&ctx.request.text);
    if let (Some(quantity), Some(total)) = (reply.quantity, reply.total) {
        return record_sale(ctx, description, Some(quantity), total).await;
    }
    ctx.pending.open(ctx.user_id(), description, record.amount);
    info!(user_id = ctx.user_id(), amount = ?record.amount, "pending sale opened");
    Ok(replies::sale_opened(record.amount))
}

/// Continue an open sale with the user's reply.
pub async fn continue_sale(
    ctx: &HandlerContext<'_>,
    pending: PendingSale,
) -> Result<String> {
    if mentions_undo(&ctx.request.text) {
        ctx.pending.close(ctx.user_id());
        info!(user_id = ctx.user_id(), "pending sale cancelled");
        return Ok(replies::SALE_CANCELLED.to_string());
    }
    let reply = parse_reply(&ctx.request.text);
    let ready = reply.quantity.is_some() || reply.total.is_some();
    let Some(total) = reply.total.or(pending.amount).filter(|_| ready) else {
        return Ok(replies::SALE_NEEDS_AMOUNT.to_string());
    };
    record_sale(ctx, pending.description, reply.quantity, total).await
}

async fn record_sale(
    ctx: &HandlerContext<'_>,
    description: String,
    quantity: Option<u32>,
    total: f64,
) -> Result<String> {
    let description = match quantity {
        Some(q) => format!("{q} un. - {description}"),
        None => description,
    };
    let entry = NewEntry {
        user_id: ctx.user_id().to_string(),
        kind: IntentType::Sale,
        amount: total,
        category: keywords::BUSINESS_INCOME_CATEGORY.to_string(),
        description,
        date: ctx.today,
    };
    let stored = ctx.ledger.record(entry).await?;
    ctx.pending.close(ctx.user_id());
    info!(
        user_id = ctx.user_id(),
        entry_id = stored.id,
        amount = stored.amount,
        "sale recorded"
    );
    Ok(replies::sale_recorded(&stored, quantity))
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("3 unidades por 45", Some(3), Some(45.0))]
    #[case("vendi 2 peças a 30 cada", Some(2), Some(60.0))]
    #[case("foram 120 reais", None, Some(120.0))]
    #[case("5x", Some(5), None)]
    #[case("hmm", None, None)]
    fn parses_quantity_and_total(
        #[case] text: &str,
        #[case] quantity: Option<u32>,
        #[case] total: Option<f64>,
    ) {
        let reply = parse_reply(text);
        assert_eq!(reply.quantity, quantity, "{text}");
        assert_eq!(reply.total, total, "{text}");
    }

    #[test]
    fn confident_expense_is_not_claimed() {
        let expense = IntentRecord::new(IntentType::VariableExpense, 0.85);
        assert!(!claims(&expense, 0.5));
        assert!(claims(&IntentRecord::new(IntentType::Other, 0.9), 0.5));
    }

    #[test]
    fn vague_messages_stay_with_the_sale() {
        let vague = IntentRecord::new(IntentType::VariableExpense, 0.3);
        assert!(claims(&vague, 0.5));
    }

    #[test]
    fn only_business_income_is_claimed() {
        let salary = IntentRecord::new(IntentType::Income, 0.9).with_category("salário");
        assert!(!claims(&salary, 0.5));
        let sales = IntentRecord::new(IntentType::Income, 0.9).with_category("vendas");
        assert!(claims(&sales, 0.5));
    }
}
