//! Monetary amount extraction from free text.
//!
//! Brazilian formatting is the default: `.` groups thousands and `,` marks
//! decimals (`1.234,56`). A dot followed by one or two digits is read as a
//! decimal point (`50.5`). A trailing `mil` or `k` multiplies by 1000.

use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;

#[allow(clippy::expect_used)]
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,3}(?:\.\d{3})+(?:,\d+)?|\d+(?:[.,]\d+)?)(\s*(?:mil|k)\b)?")
        .expect("valid amount regex")
});

#[allow(clippy::expect_used)]
static THOUSANDS_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(?:\.\d{3})+$").expect("valid thousands regex"));

#[allow(clippy::expect_used)]
static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)\s*(?:unidades|unidade|un|itens|item|pe[cç]as|pe[cç]a|x)\b")
        .expect("valid quantity regex")
});

/// Units mentioned in the text, as in "3 unidades" or "5x".
#[must_use]
pub fn extract_quantity(text: &str) -> Option<u32> {
    QUANTITY_RE
        .captures(text)
        .and_then(|caps| caps.get(1)?.as_str().parse().ok())
        .filter(|quantity| *quantity > 0)
}

/// The text without its quantity phrase, so the next number is a price.
#[must_use]
pub fn strip_quantity(text: &str) -> Cow<'_, str> {
    QUANTITY_RE.replace(text, " ")
}

/// First positive amount in the text.
#[must_use]
pub fn extract_amount(text: &str) -> Option<f64> {
    let caps = AMOUNT_RE.captures(text)?;
    let literal = caps.get(1)?.as_str();
    let mut value = parse_literal(literal)?;
    if caps.get(2).is_some() {
        value *= 1000.0;
    }
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Parse a single numeric literal in Brazilian or plain format.
#[must_use]
pub fn parse_literal(literal: &str) -> Option<f64> {
    let literal = literal.trim();
    let canonical = if literal.contains(',') {
        literal.replace('.', "").replace(',', ".")
    } else if THOUSANDS_ONLY_RE.is_match(literal) {
        literal.replace('.', "")
    } else {
        literal.to_string()
    };
    canonical.parse::<f64>().ok()
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("Gastei 50 no supermercado", 50.0)]
    #[case("Recebi 5000 de salário", 5000.0)]
    #[case("paguei R$ 1.234,56 de aluguel", 1234.56)]
    #[case("almoço 50,5", 50.5)]
    #[case("R$50", 50.0)]
    #[case("uber 23.90", 23.9)]
    #[case("vendi 10.000 em produtos", 10000.0)]
    #[case("investi 2,5 mil no tesouro", 2500.0)]
    #[case("ganhei 3k de bônus", 3000.0)]
    #[case("gastei 20 e depois 30", 20.0)]
    fn extracts_first_amount(#[case] text: &str, #[case] expected: f64) {
        let got = extract_amount(text).unwrap();
        assert!((got - expected).abs() < 1e-9, "{text}: got {got}");
    }

    #[rstest]
    #[case("quanto gastei este mês?")]
    #[case("mostre cada uma")]
    #[case("gastei 0 reais")]
    fn no_amount(#[case] text: &str) {
        assert!(extract_amount(text).is_none());
    }

    #[rstest]
    #[case("3 unidades por 45", Some(3))]
    #[case("vendi 2 peças a 30 cada", Some(2))]
    #[case("5x", Some(5))]
    #[case("foram 120 reais", None)]
    #[case("0 unidades", None)]
    fn quantities(#[case] text: &str, #[case] expected: Option<u32>) {
        assert_eq!(extract_quantity(text), expected);
    }

    #[test]
    fn price_follows_stripped_quantity() {
        assert_eq!(extract_amount(&strip_quantity("3 unidades por 45")), Some(45.0));
        assert_eq!(extract_amount(&strip_quantity("foram 120")), Some(120.0));
    }

    #[test]
    fn parse_literal_formats() {
        assert_eq!(parse_literal("1.500"), Some(1500.0));
        assert_eq!(parse_literal("12,5"), Some(12.5));
        assert_eq!(parse_literal("abc"), None);
    }
}
