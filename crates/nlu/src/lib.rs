//! Remote natural-language classification.
//!
//! Providers implement [`NluProvider`]. Several API keys for the same
//! service are wrapped in a [`ProviderChain`] that rotates past keys that hit
//! quota or auth errors and skips keys whose breaker has tripped.

pub mod chain;
pub mod gemini;
pub mod provider;

use std::{sync::Arc, time::Duration};

use {secrecy::ExposeSecret, tally_config::NluConfig, tracing::warn};

pub use {
    chain::{BreakerPolicy, NluErrorKind, ProviderChain, classify_error},
    gemini::GeminiProvider,
    provider::NluProvider,
};

/// Build the provider chain described by the config. `None` when the remote
/// path is disabled, has no usable key, or names an unknown provider.
#[must_use]
pub fn build_chain(config: &NluConfig) -> Option<Arc<dyn NluProvider>> {
    if !config.is_usable() {
        return None;
    }
    if config.provider != "gemini" {
        warn!(provider = %config.provider, "unknown NLU provider, remote path disabled");
        return None;
    }

    let providers: Vec<Arc<dyn NluProvider>> = config
        .api_keys
        .iter()
        .filter(|k| !k.expose_secret().trim().is_empty())
        .map(|key| {
            Arc::new(GeminiProvider::new(
                key.clone(),
                config.model.clone(),
                config.base_url.clone(),
            )) as Arc<dyn NluProvider>
        })
        .collect();

    let policy = BreakerPolicy {
        max_failures: config.breaker_failures.max(1),
        cooldown: Duration::from_secs(config.breaker_cooldown_secs),
    };
    ProviderChain::new(providers, policy).map(|chain| Arc::new(chain) as Arc<dyn NluProvider>)
}

#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    #[test]
    fn no_keys_means_no_chain() {
        assert!(build_chain(&NluConfig::default()).is_none());
    }

    #[test]
    fn unknown_provider_means_no_chain() {
        let config = NluConfig {
            provider: "mystery".into(),
            api_keys: vec![Secret::new("k".into())],
            ..NluConfig::default()
        };
        assert!(build_chain(&config).is_none());
    }

    #[test]
    fn keys_become_chain_entries() {
        let config = NluConfig {
            api_keys: vec![Secret::new("k1".into()), Secret::new(" ".into())],
            ..NluConfig::default()
        };
        let chain = build_chain(&config);
        assert_eq!(chain.map(|c| c.name().to_string()).as_deref(), Some("gemini"));
    }
}
