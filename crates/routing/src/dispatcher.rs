//! Routes a classified message to exactly one handler.
//!
//! Precedence:
//! 1. Correction phrasing (any record type)
//! 2. Open sale for the user
//! 3. Confidence gate
//! 4. Record type
//!
//! Stages 1 and 2 still see low-confidence messages, but answer them with a
//! clarifying question instead of touching the ledger.

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use {
    chrono::{Local, NaiveDate},
    futures::FutureExt,
    tally_common::types::{IntentRecord, IntentType},
    tally_service_traits::Ledger,
    tracing::{debug, error, warn},
};

use crate::{
    error::Result,
    handlers::{HandlerContext, correction, entry, fallback, query, sale},
    pending::{PendingSale, PendingSales},
    replies,
};

/// Default confidence below which the user is asked to rephrase.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub user_id: String,
    pub conversation_id: String,
    pub text: String,
    pub record: IntentRecord,
}

/// Outcome of the precedence chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Correction,
    SaleFlow(PendingSale),
    SaleClarify,
    Clarify,
    Income,
    Expense,
    Investment,
    Query,
    Sale,
    Fallback,
}

impl Route {
    /// Whether the route ends in a per-type handler (stage 4).
    #[must_use]
    pub fn is_type_handler(&self) -> bool {
        !matches!(
            self,
            Self::Correction | Self::SaleFlow(_) | Self::SaleClarify | Self::Clarify
        )
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Correction => "correction",
            Self::SaleFlow(_) => "sale-flow",
            Self::SaleClarify => "sale-clarify",
            Self::Clarify => "clarify",
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Investment => "investment",
            Self::Query => "query",
            Self::Sale => "sale",
            Self::Fallback => "fallback",
        }
    }
}

pub struct Dispatcher {
    ledger: Arc<dyn Ledger>,
    pending: PendingSales,
    threshold: f32,
}

impl Dispatcher {
    #[must_use]
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self {
            ledger,
            pending: PendingSales::default(),
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_pending_sale_ttl(mut self, ttl: Duration) -> Self {
        self.pending = PendingSales::new(ttl);
        self
    }

    #[must_use]
    pub fn pending_sales(&self) -> &PendingSales {
        &self.pending
    }

    /// Run the precedence chain without touching any handler.
    #[must_use]
    pub fn route(&self, request: &DispatchRequest) -> Route {
        let record = &request.record;
        let low = record.is_low_confidence(self.threshold);

        if correction::detect(&request.text, record) {
            return if low {
                Route::Clarify
            } else {
                Route::Correction
            };
        }
        if let Some(pending) = self.pending.get(&request.user_id)
            && sale::claims(record, self.threshold)
        {
            return if low {
                Route::SaleClarify
            } else {
                Route::SaleFlow(pending)
            };
        }
        if low {
            return Route::Clarify;
        }
        match record.kind {
            IntentType::Income => Route::Income,
            IntentType::FixedExpense | IntentType::VariableExpense => Route::Expense,
            IntentType::Investment => Route::Investment,
            IntentType::Query => Route::Query,
            IntentType::Correction => Route::Correction,
            IntentType::Sale => Route::Sale,
            IntentType::Other => Route::Fallback,
        }
    }

    /// Produce the reply for one classified message. Never fails.
    pub async fn dispatch(&self, request: &DispatchRequest) -> String {
        self.dispatch_on(request, Local::now().date_naive()).await
    }

    /// [`Self::dispatch`] with an explicit "today".
    pub async fn dispatch_on(&self, request: &DispatchRequest, today: NaiveDate) -> String {
        let route = self.route(request);
        let handler = route.name();
        debug!(
            conversation_id = %request.conversation_id,
            user_id = %request.user_id,
            intent = %request.record.kind,
            confidence = request.record.confidence,
            handler,
            "dispatching"
        );

        let ctx = HandlerContext {
            ledger: self.ledger.as_ref(),
            pending: &self.pending,
            request,
            today,
        };
        match AssertUnwindSafe(run(route, &ctx)).catch_unwind().await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(
                    conversation_id = %request.conversation_id,
                    intent = %request.record.kind,
                    confidence = request.record.confidence,
                    handler,
                    error = %e,
                    "handler failed"
                );
                replies::APOLOGY.to_string()
            },
            Err(panic) => {
                error!(
                    conversation_id = %request.conversation_id,
                    intent = %request.record.kind,
                    confidence = request.record.confidence,
                    handler,
                    panic = panic_message(panic.as_ref()),
                    "handler panicked"
                );
                replies::APOLOGY.to_string()
            },
        }
    }
}

async fn run(route: Route, ctx: &HandlerContext<'_>) -> Result<String> {
    let record = &ctx.request.record;
    match route {
        Route::Correction => correction::handle(ctx, record).await,
        Route::SaleFlow(pending) => sale::continue_sale(ctx, pending).await,
        Route::SaleClarify => Ok(replies::SALE_CLARIFY.to_string()),
        Route::Clarify => Ok(replies::CLARIFY.to_string()),
        Route::Income | Route::Expense | Route::Investment => entry::record_entry(ctx, record).await,
        Route::Query => query::handle(ctx, record).await,
        Route::Sale => sale::open(ctx, record).await,
        Route::Fallback => fallback::handle(ctx, record).await,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
