//! Text normalization for keyword matching.

/// Lowercase, accent-folded, punctuation-free view of a message.
///
/// Keyword tables are written without accents; matching is done on whole
/// tokens so "luz" does not fire inside "luzes".
#[derive(Debug, Clone)]
pub struct Normalized {
    tokens: Vec<String>,
    /// Tokens joined with single spaces and padded on both ends.
    padded: String,
}

impl Normalized {
    pub fn new(text: &str) -> Self {
        let folded = fold(text);
        let tokens: Vec<String> = folded
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        let padded = format!(" {} ", tokens.join(" "));
        Self { tokens, padded }
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the term (one word or a space-separated phrase) occurs on
    /// token boundaries.
    #[must_use]
    pub fn has(&self, term: &str) -> bool {
        let term = fold(term);
        let term = term.trim();
        if term.is_empty() {
            return false;
        }
        self.padded.contains(&format!(" {term} "))
    }

    #[must_use]
    pub fn has_any(&self, terms: &[&str]) -> bool {
        terms.iter().any(|t| self.has(t))
    }

    /// First term from `terms` present in the text.
    #[must_use]
    pub fn first_of<'a>(&self, terms: &[&'a str]) -> Option<&'a str> {
        terms.iter().copied().find(|t| self.has(t))
    }

    /// Whether any token starts with one of the prefixes.
    #[must_use]
    pub fn has_prefix(&self, prefixes: &[&str]) -> bool {
        self.tokens
            .iter()
            .any(|t| prefixes.iter().any(|p| t.starts_with(p)))
    }
}

/// Lowercase and strip Portuguese diacritics.
#[must_use]
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_accents_and_case() {
        assert_eq!(fold("Salário de Março"), "salario de marco");
        assert_eq!(fold("AÇÃO"), "acao");
    }

    #[test]
    fn matches_whole_tokens_and_phrases() {
        let n = Normalized::new("Paguei a conta de LUZ, R$ 120!");
        assert!(n.has("luz"));
        assert!(n.has("conta de luz"));
        assert!(!n.has("lu"));
        assert!(n.has("Paguei"));
        assert_eq!(n.word_count(), 7);
    }

    #[test]
    fn accented_terms_match_folded_text() {
        let n = Normalized::new("recebi meu salario");
        assert!(n.has("salário"));
        assert_eq!(n.first_of(&["bonus", "salario"]), Some("salario"));
    }

    #[test]
    fn prefix_matching() {
        let n = Normalized::new("preciso corrigir o valor");
        assert!(n.has_prefix(&["corrig"]));
        assert!(!n.has_prefix(&["desfa"]));
    }

    #[test]
    fn empty_terms_never_match() {
        let n = Normalized::new("qualquer coisa");
        assert!(!n.has(""));
        assert!(!n.has("   "));
    }
}
