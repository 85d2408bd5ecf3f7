//! Key rotation with per-key circuit breakers.
//!
//! Each configured API key becomes one chain entry. A retryable failure
//! (quota, rate limit, auth, 5xx) moves on to the next key; a key that fails
//! `max_failures` times in a row is skipped until its cooldown elapses.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use {async_trait::async_trait, tracing::warn};

use crate::provider::NluProvider;

/// How a provider error should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NluErrorKind {
    /// 429 or "resource exhausted".
    RateLimit,
    /// 401/403, bad or revoked key.
    AuthError,
    /// Daily quota or billing exhausted.
    QuotaExhausted,
    /// 5xx.
    ServerError,
    /// 400; the same request fails on every key.
    InvalidRequest,
    /// Transport failures and anything unrecognised.
    Unknown,
}

impl NluErrorKind {
    #[must_use]
    pub fn should_failover(self) -> bool {
        !matches!(self, Self::InvalidRequest)
    }

    /// Whether the error means the service as a whole is unhappy with us.
    #[must_use]
    pub fn is_quota_like(self) -> bool {
        matches!(self, Self::RateLimit | Self::QuotaExhausted)
    }
}

/// Classify an error by its message.
#[must_use]
pub fn classify_error(err: &anyhow::Error) -> NluErrorKind {
    let msg = err.to_string().to_lowercase();

    if msg.contains("quota")
        || msg.contains("billing")
        || msg.contains("insufficient_quota")
        || msg.contains("usage limit")
    {
        return NluErrorKind::QuotaExhausted;
    }

    if msg.contains("429")
        || msg.contains("rate limit")
        || msg.contains("rate_limit")
        || msg.contains("too many requests")
        || msg.contains("resource_exhausted")
        || msg.contains("resource exhausted")
    {
        return NluErrorKind::RateLimit;
    }

    if msg.contains("401")
        || msg.contains("403")
        || msg.contains("unauthorized")
        || msg.contains("forbidden")
        || msg.contains("api key not valid")
        || msg.contains("invalid api key")
        || msg.contains("permission_denied")
    {
        return NluErrorKind::AuthError;
    }

    if msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
        || msg.contains("504")
        || msg.contains("internal")
        || msg.contains("unavailable")
        || msg.contains("overloaded")
    {
        return NluErrorKind::ServerError;
    }

    if msg.contains("400") || msg.contains("bad request") || msg.contains("invalid_argument") {
        return NluErrorKind::InvalidRequest;
    }

    NluErrorKind::Unknown
}

/// When a single key's breaker opens and for how long.
#[derive(Debug, Clone, Copy)]
pub struct BreakerPolicy {
    pub max_failures: usize,
    pub cooldown: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            max_failures: 3,
            cooldown: Duration::from_secs(60),
        }
    }
}

struct BreakerState {
    consecutive_failures: AtomicUsize,
    last_failure: Mutex<Option<Instant>>,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            consecutive_failures: AtomicUsize::new(0),
            last_failure: Mutex::new(None),
        }
    }

    fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    fn record_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
        *self.last_failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }

    /// Open circuit means the key is skipped.
    fn is_tripped(&self, policy: BreakerPolicy) -> bool {
        if self.consecutive_failures.load(Ordering::SeqCst) < policy.max_failures {
            return false;
        }
        let last = self.last_failure.lock().unwrap_or_else(|e| e.into_inner());
        match *last {
            Some(t) if t.elapsed() < policy.cooldown => true,
            _ => {
                drop(last);
                self.consecutive_failures.store(0, Ordering::SeqCst);
                false
            },
        }
    }
}

struct ChainEntry {
    provider: Arc<dyn NluProvider>,
    state: BreakerState,
}

/// Tries entries in order. Implements [`NluProvider`] itself so callers do
/// not see the rotation.
pub struct ProviderChain {
    chain: Vec<ChainEntry>,
    policy: BreakerPolicy,
}

impl ProviderChain {
    /// `None` when `providers` is empty.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn NluProvider>>, policy: BreakerPolicy) -> Option<Self> {
        if providers.is_empty() {
            return None;
        }
        let chain = providers
            .into_iter()
            .map(|provider| ChainEntry {
                provider,
                state: BreakerState::new(),
            })
            .collect();
        Some(Self { chain, policy })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Entries currently accepting requests.
    #[must_use]
    pub fn available(&self) -> usize {
        self.chain
            .iter()
            .filter(|e| !e.state.is_tripped(self.policy))
            .count()
    }
}

#[async_trait]
impl NluProvider for ProviderChain {
    fn name(&self) -> &str {
        self.chain
            .first()
            .map_or("chain", |e| e.provider.name())
    }

    fn id(&self) -> &str {
        self.chain.first().map_or("chain", |e| e.provider.id())
    }

    async fn classify_remote(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        let mut errors = Vec::new();

        for (index, entry) in self.chain.iter().enumerate() {
            if entry.state.is_tripped(self.policy) {
                continue;
            }

            match entry.provider.classify_remote(system, prompt).await {
                Ok(text) => {
                    entry.state.record_success();
                    return Ok(text);
                },
                Err(e) => {
                    let kind = classify_error(&e);
                    entry.state.record_failure();

                    if !kind.should_failover() {
                        return Err(e);
                    }

                    warn!(
                        provider = entry.provider.name(),
                        key_index = index,
                        error = %e,
                        kind = ?kind,
                        "NLU key failed, trying next"
                    );
                    errors.push(format!("key {index}: {e}"));
                },
            }
        }

        if errors.is_empty() {
            anyhow::bail!("all NLU keys are cooling down");
        }
        anyhow::bail!("all NLU keys failed: {}", errors.join("; "))
    }
}
