//! Income, expense, and investment: book the record as a ledger entry.

use {
    tally_common::types::IntentRecord,
    tally_service_traits::NewEntry,
    tracing::info,
};

use crate::{error::Result, handlers::HandlerContext, period::entry_date, replies};

pub async fn record_entry(ctx: &HandlerContext<'_>, record: &IntentRecord) -> Result<String> {
    let date = entry_date(record.date_hint, ctx.today);
    let Some(entry) = NewEntry::from_record(ctx.user_id(), record, date) else {
        return Ok(replies::ask_amount(record.kind));
    };

    let stored = ctx.ledger.record(entry).await?;
    info!(
        user_id = ctx.user_id(),
        entry_id = stored.id,
        intent = %stored.kind,
        amount = stored.amount,
        category = %stored.category,
        "entry recorded"
    );
    Ok(replies::recorded(&stored, ctx.today, record.tip.as_deref()))
}
