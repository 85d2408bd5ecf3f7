//! Config schema types (router, auth, nlu, classifier, ledger).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    pub router: RouterConfig,
    pub auth: AuthConfig,
    pub nlu: NluConfig,
    pub classifier: ClassifierConfig,
    pub ledger: LedgerConfig,
}

/// Inbound pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// How long a channel message id stays marked in-flight. Defaults to 5s.
    pub dedup_window_secs: u64,
    /// Sweep expired in-flight markers every N admissions.
    pub dedup_sweep_every: u64,
    /// Turns kept per conversation. Defaults to 5.
    pub context_capacity: usize,
    /// How long an unanswered sale confirmation stays open. Defaults to 10 minutes.
    pub pending_sale_ttl_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            dedup_window_secs: 5,
            dedup_sweep_every: 256,
            context_capacity: 5,
            pending_sale_ttl_secs: 600,
        }
    }
}

/// Login dialogue rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Minimum accepted password length. Defaults to 6.
    pub min_password_len: usize,
    /// How long an unfinished login dialogue is kept. Defaults to 10 minutes.
    pub login_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_len: 6,
            login_ttl_secs: 600,
        }
    }
}

/// Remote NLU service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NluConfig {
    /// When false the classifier only uses the offline analyzer.
    pub enabled: bool,
    /// Provider name. Only "gemini" is built in.
    pub provider: String,
    pub model: String,
    pub base_url: String,
    /// API keys tried in order; a failing key rotates to the next one.
    #[serde(serialize_with = "serialize_secrets")]
    pub api_keys: Vec<Secret<String>>,
    /// Hard timeout for one remote classification. Defaults to 10s.
    pub timeout_secs: u64,
    /// How long the remote path is skipped after a failure. Defaults to 60s.
    pub cooldown_secs: u64,
    /// Consecutive failures before a single key is skipped.
    pub breaker_failures: usize,
    /// How long a tripped key stays skipped.
    pub breaker_cooldown_secs: u64,
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "gemini".into(),
            model: "gemini-2.0-flash".into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_keys: Vec::new(),
            timeout_secs: 10,
            cooldown_secs: 60,
            breaker_failures: 3,
            breaker_cooldown_secs: 60,
        }
    }
}

impl NluConfig {
    /// Whether the remote path can run at all.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.enabled
            && self
                .api_keys
                .iter()
                .any(|k| !k.expose_secret().trim().is_empty())
    }
}

/// Intent classification tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Records below this confidence get a clarification reply.
    pub low_confidence_threshold: f32,
    /// Confidence added when ledger history fills in the category.
    pub enrichment_increment: f32,
    /// Ledger entries inspected for enrichment.
    pub enrichment_window: usize,
    /// Entries (out of the window) one category needs to dominate.
    pub enrichment_min_share: usize,
    pub continuation: ContinuationConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: 0.5,
            enrichment_increment: 0.1,
            enrichment_window: 5,
            enrichment_min_share: 3,
            continuation: ContinuationConfig::default(),
        }
    }
}

/// Follow-up detection after a query reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuationConfig {
    /// Longer messages are never treated as follow-ups.
    pub max_words: usize,
    /// Turns searched for a query when the previous user turn was not one.
    pub lookback_turns: usize,
    /// Demonstrative or anaphoric cues ("essas", "cada uma").
    pub anaphora: Vec<String>,
    /// Explicit detail/list/show vocabulary.
    pub detail_words: Vec<String>,
}

impl Default for ContinuationConfig {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| (*w).to_string()).collect();
        Self {
            max_words: 6,
            lookback_turns: 3,
            anaphora: owned(&[
                "cada uma", "cada um", "essas", "esses", "estas", "estes", "elas", "eles",
                "delas", "deles", "isso", "disso",
            ]),
            detail_words: owned(&[
                "detalhe",
                "detalhes",
                "detalhar",
                "detalha",
                "lista",
                "listar",
                "liste",
                "mostre",
                "mostra",
                "mostrar",
                "quais",
                "discrimina",
                "discriminar",
            ]),
        }
    }
}

/// Ledger backend selection for the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    /// SQLite URL used by the `sqlite` backend.
    pub database_url: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Memory,
            database_url: "sqlite://tally.db?mode=rwc".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    #[default]
    Memory,
    Sqlite,
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_secrets<S: serde::Serializer>(
    secrets: &[Secret<String>],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;

    let mut seq = serializer.serialize_seq(Some(secrets.len()))?;
    for secret in secrets {
        seq.serialize_element(secret.expose_secret())?;
    }
    seq.end()
}

impl TallyConfig {
    /// Copy of the config with every secret replaced by a fixed marker,
    /// suitable for printing.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.nlu.api_keys = copy
            .nlu
            .api_keys
            .iter()
            .map(|_| Secret::new("[REDACTED]".to_string()))
            .collect();
        copy
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = TallyConfig::default();
        assert_eq!(cfg.router.dedup_window_secs, 5);
        assert_eq!(cfg.router.context_capacity, 5);
        assert_eq!(cfg.nlu.timeout_secs, 10);
        assert_eq!(cfg.auth.min_password_len, 6);
        assert_eq!(cfg.auth.login_ttl_secs, 600);
        assert!((cfg.classifier.low_confidence_threshold - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: TallyConfig = toml::from_str(
            r#"
            [nlu]
            api_keys = ["k1", "k2"]
            timeout_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.nlu.api_keys.len(), 2);
        assert_eq!(cfg.nlu.timeout_secs, 3);
        assert_eq!(cfg.nlu.model, "gemini-2.0-flash");
        assert_eq!(cfg.router.dedup_window_secs, 5);
        assert!(cfg.nlu.is_usable());
    }

    #[test]
    fn blank_keys_are_not_usable() {
        let cfg: TallyConfig = toml::from_str("[nlu]\napi_keys = [\"  \"]\n").unwrap();
        assert!(!cfg.nlu.is_usable());
    }

    #[test]
    fn redacted_hides_keys() {
        let mut cfg = TallyConfig::default();
        cfg.nlu.api_keys = vec![Secret::new("super-secret".into())];
        let rendered = toml::to_string(&cfg.redacted()).unwrap();
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn ledger_backend_parses_lowercase() {
        let cfg: TallyConfig = toml::from_str("[ledger]\nbackend = \"sqlite\"\n").unwrap();
        assert_eq!(cfg.ledger.backend, LedgerBackend::Sqlite);
    }
}
