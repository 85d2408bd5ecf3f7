//! Amend or undo the user's most recent entry.

use {
    tally_common::types::{IntentRecord, IntentType},
    tally_intent::{extract_amount, is_correction, is_undo, mentions_undo},
    tracing::info,
};

use crate::{error::Result, handlers::HandlerContext, replies};

/// Correction phrasing, independent of the record's type. The caller still
/// gates on confidence before running [`handle`].
#[must_use]
pub fn detect(text: &str, record: &IntentRecord) -> bool {
    record.kind == IntentType::Correction || is_correction(text)
}

pub async fn handle(ctx: &HandlerContext<'_>, record: &IntentRecord) -> Result<String> {
    let text = &ctx.request.text;
    let undo = is_undo(text);

    if mentions_undo(text) && ctx.pending.close(ctx.user_id()).is_some() {
        info!(user_id = ctx.user_id(), "pending sale cancelled");
        return Ok(replies::SALE_CANCELLED.to_string());
    }

    let Some(last) = ctx.ledger.last_entry(ctx.user_id()).await? else {
        return Ok(replies::NOTHING_TO_CORRECT.to_string());
    };

    if undo {
        if !ctx.ledger.delete_entry(ctx.user_id(), last.id).await? {
            return Ok(replies::NOTHING_TO_CORRECT.to_string());
        }
        info!(user_id = ctx.user_id(), entry_id = last.id, "entry removed");
        return Ok(replies::removed(&last));
    }

    let Some(amount) = record.amount.or_else(|| extract_amount(text)) else {
        return Ok(replies::ask_correct_amount(&last));
    };
    match ctx
        .ledger
        .update_amount(ctx.user_id(), last.id, amount)
        .await?
    {
        Some(updated) => {
            info!(
                user_id = ctx.user_id(),
                entry_id = updated.id,
                from = last.amount,
                to = updated.amount,
                "entry amended"
            );
            Ok(replies::amended(&updated, last.amount))
        },
        None => Ok(replies::NOTHING_TO_CORRECT.to_string()),
    }
}
