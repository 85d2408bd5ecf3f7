//! Configuration validation.
//!
//! Checks a TOML config for syntax, unknown or misspelled fields, type
//! errors, and values that parse but make no sense at runtime.

use std::{collections::HashMap, path::Path};

use secrecy::ExposeSecret;

use crate::schema::{LedgerBackend, TallyConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// "syntax", "unknown-field", "type-error", "range", "nlu", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "nlu.timeout_secs"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    let leaves = |keys: &[&'static str]| {
        Struct(keys.iter().map(|k| (*k, Leaf)).collect::<HashMap<_, _>>())
    };

    Struct(HashMap::from([
        (
            "router",
            leaves(&[
                "dedup_window_secs",
                "dedup_sweep_every",
                "context_capacity",
                "pending_sale_ttl_secs",
            ]),
        ),
        ("auth", leaves(&["min_password_len", "login_ttl_secs"])),
        (
            "nlu",
            leaves(&[
                "enabled",
                "provider",
                "model",
                "base_url",
                "api_keys",
                "timeout_secs",
                "cooldown_secs",
                "breaker_failures",
                "breaker_cooldown_secs",
            ]),
        ),
        (
            "classifier",
            Struct(HashMap::from([
                ("low_confidence_threshold", Leaf),
                ("enrichment_increment", Leaf),
                ("enrichment_window", Leaf),
                ("enrichment_min_share", Leaf),
                (
                    "continuation",
                    leaves(&["max_words", "lookback_turns", "anaphora", "detail_words"]),
                ),
            ])),
        ),
        ("ledger", leaves(&["backend", "database_url"])),
    ]))
}

const KNOWN_NLU_PROVIDERS: &[&str] = &["gemini"];

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or the discovered one when
/// `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let is_toml = actual_path
        .extension()
        .and_then(|e| e.to_str())
        .is_none_or(|e| e == "toml");

    match std::fs::read_to_string(actual_path) {
        Ok(content) if is_toml => {
            let mut result = validate_toml_str(&content);
            result.config_path = Some(actual_path.clone());
            result
        },
        Ok(_) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "field-level checks only run on TOML files",
            )],
            config_path: Some(actual_path.clone()),
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate a TOML string without touching the file system.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("TOML syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&toml_value, &build_schema_map(), "", &mut diagnostics);

    match toml::from_str::<TallyConfig>(toml_str) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (toml::Value::Table(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };
    let known: Vec<&str> = fields.keys().copied().collect();
    for (key, child) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match fields.get(key.as_str()) {
            Some(child_schema) => check_unknown_fields(child, child_schema, &path, diagnostics),
            None => {
                let message = match suggest(key, &known, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic::new(
                    Severity::Error,
                    "unknown-field",
                    path,
                    message,
                ));
            },
        }
    }
}

fn check_semantics(config: &TallyConfig, diagnostics: &mut Vec<Diagnostic>) {
    let mut range = |path: &str, message: &str| {
        diagnostics.push(Diagnostic::new(Severity::Error, "range", path, message));
    };

    if config.router.dedup_window_secs == 0 {
        range("router.dedup_window_secs", "must be at least 1 second");
    }
    if config.router.dedup_sweep_every == 0 {
        range("router.dedup_sweep_every", "must be at least 1");
    }
    if config.router.context_capacity == 0 {
        range("router.context_capacity", "must keep at least one turn");
    }
    if config.auth.min_password_len == 0 {
        range("auth.min_password_len", "must be at least 1");
    }
    if config.auth.login_ttl_secs == 0 {
        range("auth.login_ttl_secs", "must be at least 1 second");
    }
    if config.nlu.timeout_secs == 0 {
        range("nlu.timeout_secs", "must be at least 1 second");
    }
    if config.nlu.breaker_failures == 0 {
        range("nlu.breaker_failures", "must be at least 1");
    }
    let threshold = config.classifier.low_confidence_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        range("classifier.low_confidence_threshold", "must be within 0.0..=1.0");
    }
    let increment = config.classifier.enrichment_increment;
    if !(0.0..=1.0).contains(&increment) {
        range("classifier.enrichment_increment", "must be within 0.0..=1.0");
    }
    if config.classifier.enrichment_min_share > config.classifier.enrichment_window {
        range(
            "classifier.enrichment_min_share",
            "cannot exceed classifier.enrichment_window",
        );
    }

    if !KNOWN_NLU_PROVIDERS.contains(&config.nlu.provider.as_str()) {
        let message = match suggest(&config.nlu.provider, KNOWN_NLU_PROVIDERS, 3) {
            Some(s) => format!("unknown provider (did you mean \"{s}\"?)"),
            None => "unknown provider; the remote path will stay disabled".to_string(),
        };
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "nlu",
            "nlu.provider",
            message,
        ));
    }

    if config.nlu.enabled
        && config
            .nlu
            .api_keys
            .iter()
            .all(|k| k.expose_secret().trim().is_empty())
    {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "nlu",
            "nlu.api_keys",
            "no API key configured; classification runs offline only",
        ));
    }

    if config.ledger.backend == LedgerBackend::Sqlite
        && !config.ledger.database_url.starts_with("sqlite:")
    {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "range",
            "ledger.database_url",
            "sqlite backend needs a sqlite: URL",
        ));
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn paths(result: &ValidationResult, category: &str) -> Vec<String> {
        result
            .diagnostics
            .iter()
            .filter(|d| d.category == category)
            .map(|d| d.path.clone())
            .collect()
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("condição", "condicao"), 2);
    }

    #[test]
    fn empty_config_only_reports_offline_mode() {
        let result = validate_toml_str("");
        assert!(!result.has_errors());
        assert_eq!(paths(&result, "nlu"), vec!["nlu.api_keys"]);
    }

    #[test]
    fn unknown_nested_key_gets_suggestion() {
        let result = validate_toml_str("[router]\ncontext_capcity = 3\n");
        let diag = result
            .diagnostics
            .iter()
            .find(|d| d.category == "unknown-field")
            .unwrap();
        assert_eq!(diag.path, "router.context_capcity");
        assert!(diag.message.contains("context_capacity"));
    }

    #[test]
    fn unknown_top_level_key() {
        let result = validate_toml_str("[routr]\n");
        assert!(result.has_errors());
        assert_eq!(paths(&result, "unknown-field"), vec!["routr"]);
    }

    #[test]
    fn syntax_error_short_circuits() {
        let result = validate_toml_str("[router\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn type_error_reported() {
        let result = validate_toml_str("[router]\ncontext_capacity = \"five\"\n");
        assert_eq!(result.count(Severity::Error), 1);
        assert_eq!(result.diagnostics[0].category, "type-error");
    }

    #[test]
    fn out_of_range_values_flagged() {
        let result = validate_toml_str(
            r#"
            [router]
            context_capacity = 0
            [auth]
            login_ttl_secs = 0
            [classifier]
            low_confidence_threshold = 1.5
            enrichment_window = 2
            enrichment_min_share = 3
            [nlu]
            api_keys = ["k"]
            "#,
        );
        let mut flagged = paths(&result, "range");
        flagged.sort();
        assert_eq!(flagged, vec![
            "auth.login_ttl_secs",
            "classifier.enrichment_min_share",
            "classifier.low_confidence_threshold",
            "router.context_capacity",
        ]);
    }

    #[test]
    fn misspelled_provider_warned() {
        let result = validate_toml_str("[nlu]\nprovider = \"gemni\"\napi_keys = [\"k\"]\n");
        let diag = result
            .diagnostics
            .iter()
            .find(|d| d.path == "nlu.provider")
            .unwrap();
        assert_eq!(diag.severity, Severity::Warning);
        assert!(diag.message.contains("gemini"));
    }

    #[test]
    fn sqlite_backend_requires_sqlite_url() {
        let result = validate_toml_str(
            "[ledger]\nbackend = \"sqlite\"\ndatabase_url = \"postgres://x\"\n[nlu]\nenabled = false\n",
        );
        assert!(result.has_errors());
        assert_eq!(paths(&result, "range"), vec!["ledger.database_url"]);
    }

    #[test]
    fn validate_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        std::fs::write(&path, "[nlu]\nenabled = false\n").unwrap();
        let result = validate(Some(&path));
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
    }
}
