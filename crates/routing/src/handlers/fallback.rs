use tally_common::types::{IntentRecord, IntentType};

use crate::{
    error::Result,
    handlers::{HandlerContext, entry::record_entry},
    replies,
};

/// Confident "other": a bare amount is booked as a variable expense,
/// anything else asks the user to rephrase.
pub async fn handle(ctx: &HandlerContext<'_>, record: &IntentRecord) -> Result<String> {
    if record.amount.is_none() {
        return Ok(replies::CLARIFY.to_string());
    }
    let mut expense = record.clone();
    expense.kind = IntentType::VariableExpense;
    record_entry(ctx, &expense).await
}
