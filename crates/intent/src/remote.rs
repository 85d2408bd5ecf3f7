//! Prompt construction and output parsing for the remote classifier.
//!
//! Models are asked for a single JSON object but routinely wrap it in code
//! fences, prefix it with prose, use Portuguese field names, or put numbers
//! in strings. Parsing accepts all of that; only a missing `type` or an
//! unparseable object is rejected.

use std::fmt::Write as _;

use {
    serde_json::{Map, Value},
    tally_common::types::{DEFAULT_CATEGORY, DateHint, IntentRecord, IntentType, QueryKind},
    tally_service_traits::LedgerEntry,
};

use crate::{
    amount::parse_literal,
    error::{Error, Result},
};

/// Confidence assumed when the model omits it.
pub const DEFAULT_REMOTE_CONFIDENCE: f32 = 0.6;

pub const SYSTEM_PROMPT: &str = "\
Você é o classificador de um assistente financeiro pessoal e de pequenos negócios.
Classifique a mensagem do usuário e responda APENAS com um objeto JSON, sem texto extra:
{
  \"type\": \"income\" | \"fixed-expense\" | \"variable-expense\" | \"investment\" | \"query\" | \"correction\" | \"sale\" | \"other\",
  \"confidence\": número entre 0 e 1,
  \"amount\": número positivo ou null,
  \"category\": categoria em português (use \"outros\" se não souber),
  \"description\": descrição curta,
  \"date_hint\": \"today\" | \"yesterday\" | \"day-before-yesterday\" | \"unspecified\",
  \"intention\": o que o usuário quer fazer,
  \"rationale\": justificativa curta,
  \"tip\": dica financeira opcional,
  \"query\": \"summary\" | \"itemized\" (apenas para type = query)
}
Receitas de negócio usam a categoria \"vendas\"; despesas de negócio usam \"despesa variável do negócio\" ou \"despesa fixa do negócio\".
Pedidos para corrigir ou desfazer o último lançamento são \"correction\".
Se a mensagem não for sobre finanças, use \"other\" com confiança baixa.";

/// User prompt: recent ledger entries followed by the message.
#[must_use]
pub fn build_prompt(text: &str, recent: &[LedgerEntry]) -> String {
    let mut prompt = String::new();
    if recent.is_empty() {
        prompt.push_str("Lançamentos recentes: nenhum.\n");
    } else {
        prompt.push_str("Lançamentos recentes do usuário (mais recente primeiro):\n");
        for entry in recent {
            let _ = writeln!(
                prompt,
                "- {} | {} | {:.2} | {} | {}",
                entry.date, entry.kind, entry.amount, entry.category, entry.description
            );
        }
    }
    let _ = write!(prompt, "\nMensagem: {}", text.trim());
    prompt
}

/// Parse whatever the model returned into a record.
pub fn parse_remote_output(raw: &str) -> Result<IntentRecord> {
    let object = extract_object(raw)?;

    let kind = field(&object, &["type", "tipo", "intent"])
        .and_then(Value::as_str)
        .map(IntentType::parse_lenient)
        .ok_or_else(|| Error::malformed("missing \"type\""))?;

    let confidence = field(&object, &["confidence", "confianca", "confiança"])
        .and_then(number)
        .map(|c| if c > 1.0 && c <= 100.0 { c / 100.0 } else { c })
        .filter(|c| c.is_finite())
        .map_or(DEFAULT_REMOTE_CONFIDENCE, |c| c as f32);

    let mut record = IntentRecord::new(kind, confidence)
        .with_amount(
            field(&object, &["amount", "valor"])
                .and_then(number)
                .map(f64::abs)
                .filter(|a| a.is_finite() && *a > 0.0),
        )
        .with_category(
            string(&object, &["category", "categoria"])
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        )
        .with_intention(string(&object, &["intention", "intencao", "intenção"]).unwrap_or_default());

    record.description = string(&object, &["description", "descricao", "descrição"]);
    record.rationale = string(&object, &["rationale", "justificativa", "motivo"]);
    record.tip = string(&object, &["tip", "dica"]);
    record.date_hint = string(&object, &["date_hint", "dateHint", "data"])
        .map_or(DateHint::Unspecified, |d| date_hint(&d));
    if kind == IntentType::Query {
        record.query = Some(
            string(&object, &["query", "consulta", "query_kind"])
                .map_or(QueryKind::Summary, |q| query_kind(&q)),
        );
    }
    Ok(record)
}

fn extract_object(raw: &str) -> Result<Map<String, Value>> {
    let start = raw
        .find('{')
        .ok_or_else(|| Error::malformed("no JSON object in output"))?;
    let end = raw
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| Error::malformed("unterminated JSON object"))?;
    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::malformed("output is not an object")),
        Err(e) => Err(Error::malformed(e.to_string())),
    }
}

fn field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|name| object.get(*name))
        .filter(|v| !v.is_null())
}

fn string(object: &Map<String, Value>, names: &[&str]) -> Option<String> {
    field(object, names)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned = s.trim().trim_start_matches("R$").trim().trim_end_matches('%');
            parse_literal(cleaned)
        },
        _ => None,
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .replace(['_', ' '], "-")
}

fn date_hint(label: &str) -> DateHint {
    match normalize_label(label).as_str() {
        "today" | "hoje" => DateHint::Today,
        "yesterday" | "ontem" => DateHint::Yesterday,
        "day-before-yesterday" | "anteontem" => DateHint::DayBeforeYesterday,
        _ => DateHint::Unspecified,
    }
}

fn query_kind(label: &str) -> QueryKind {
    match normalize_label(label).as_str() {
        "itemized" | "detailed" | "detalhada" | "detalhado" | "itemizada" | "lista" => {
            QueryKind::Itemized
        },
        _ => QueryKind::Summary,
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, chrono::NaiveDate};

    #[test]
    fn plain_object() {
        let record = parse_remote_output(
            r#"{"type":"variable-expense","confidence":0.92,"amount":50,"category":"alimentação","description":"supermercado","date_hint":"today","intention":"registrar despesa"}"#,
        )
        .unwrap();
        assert_eq!(record.kind, IntentType::VariableExpense);
        assert!((record.confidence - 0.92).abs() < 1e-6);
        assert_eq!(record.amount, Some(50.0));
        assert_eq!(record.category_or_default(), "alimentação");
        assert_eq!(record.date_hint, DateHint::Today);
    }

    #[test]
    fn fenced_block_with_prose() {
        let raw = "Claro! Aqui está:\n```json\n{\"tipo\": \"receita\", \"valor\": \"5.000,00\", \"categoria\": \"salário\"}\n```";
        let record = parse_remote_output(raw).unwrap();
        assert_eq!(record.kind, IntentType::Income);
        assert_eq!(record.amount, Some(5000.0));
        assert!((record.confidence - DEFAULT_REMOTE_CONFIDENCE).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_fields_are_tamed() {
        let record = parse_remote_output(
            r#"{"type":"investment","confidence":1.7e3,"amount":-300,"category":""}"#,
        )
        .unwrap();
        assert!(record.confidence <= 1.0);
        assert_eq!(record.amount, Some(300.0));
        assert_eq!(record.category.as_deref(), Some(DEFAULT_CATEGORY));
    }

    #[test]
    fn percent_confidence() {
        let record = parse_remote_output(r#"{"type":"query","confidence":"85%","query":"itemized"}"#)
            .unwrap();
        assert!((record.confidence - 0.85).abs() < 1e-6);
        assert_eq!(record.query, Some(QueryKind::Itemized));
    }

    #[test]
    fn unknown_type_is_other() {
        let record = parse_remote_output(r#"{"type":"greeting","confidence":0.9}"#).unwrap();
        assert_eq!(record.kind, IntentType::Other);
    }

    #[test]
    fn rejects_unusable_output() {
        assert!(matches!(
            parse_remote_output("não entendi"),
            Err(Error::MalformedOutput(_))
        ));
        assert!(matches!(
            parse_remote_output(r#"{"confidence": 0.9}"#),
            Err(Error::MalformedOutput(_))
        ));
        assert!(matches!(
            parse_remote_output(r#"{"type": "income", "amount": "#),
            Err(Error::MalformedOutput(_))
        ));
    }

    #[test]
    fn prompt_lists_recent_entries() {
        let entry = LedgerEntry {
            id: 1,
            user_id: "u1".into(),
            kind: IntentType::VariableExpense,
            amount: 42.5,
            category: "transporte".into(),
            description: "uber".into(),
            date: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
            created_at: 0,
        };
        let prompt = build_prompt("gastei 20", &[entry]);
        assert!(prompt.contains("2026-02-03 | variable-expense | 42.50 | transporte | uber"));
        assert!(prompt.ends_with("Mensagem: gastei 20"));
        assert!(build_prompt("oi", &[]).contains("nenhum"));
    }
}
