use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("valid email regex")
});

/// Normalize and check an email address. Returns the lowercased address.
pub fn email(input: &str) -> Result<String> {
    let candidate = input.trim().to_lowercase();
    if candidate.is_empty() {
        return Err(Error::validation("email", "empty"));
    }
    if !EMAIL_RE.is_match(&candidate) {
        return Err(Error::validation("email", "not an email address"));
    }
    Ok(candidate)
}

/// Check a password against the minimum length (in characters).
pub fn password(input: &str, min_len: usize) -> Result<()> {
    let len = input.trim().chars().count();
    if len < min_len {
        return Err(Error::validation(
            "password",
            format!("{len} characters, need at least {min_len}"),
        ));
    }
    Ok(())
}
