#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    tally_auth::{LoginStep, prompts},
    tally_auto_reply::{Router, commands},
    tally_channels::InboundMessage,
    tally_common::types::{IntentRecord, IntentType, MediaKind, MediaPayload},
    tally_config::TallyConfig,
    tally_intent::IntentClassifier,
    tally_ledger::MemoryLedger,
    tally_nlu::NluProvider,
    tally_routing::replies,
    tally_service_traits::{
        ChannelOutbound, IdentityStore, Ledger, MediaContext, MediaInterpreter, NormalizedInput,
        ServiceResult,
    },
};

struct Harness {
    router: Arc<Router>,
    store: Arc<MemoryLedger>,
    seq: AtomicUsize,
}

impl Harness {
    fn new() -> Self {
        Self::with(|router| router)
    }

    fn with(customize: impl FnOnce(Router) -> Router) -> Self {
        let store = Arc::new(MemoryLedger::new());
        let router = Router::new(&TallyConfig::default(), store.clone(), store.clone());
        Self {
            router: Arc::new(customize(router)),
            store,
            seq: AtomicUsize::new(0),
        }
    }

    fn next_id(&self) -> String {
        format!("m{}", self.seq.fetch_add(1, Ordering::SeqCst))
    }

    async fn send(&self, conversation_id: &str, text: &str) -> Option<String> {
        let message = InboundMessage::text(self.next_id(), conversation_id, text);
        self.router.handle(message).await
    }

    /// Bind the address to a user so the conversation is signed in.
    async fn sign_in(&self, conversation_id: &str) -> String {
        let user = self.store.get_or_create_user("ana@example.com").await.unwrap();
        self.store.bind_address(conversation_id, &user.id).await.unwrap();
        user.id
    }
}

#[tokio::test]
async fn login_dialogue_then_expense() {
    let h = Harness::new();
    assert_eq!(h.send("c1", "oi").await.unwrap(), prompts::WELCOME);
    assert_eq!(h.send("c1", "ana@example").await.unwrap(), prompts::INVALID_EMAIL);
    assert!(
        h.send("c1", "Ana@Example.com")
            .await
            .unwrap()
            .contains("senha")
    );
    assert!(h.send("c1", "123").await.unwrap().contains("pelo menos 6"));
    assert_eq!(
        h.send("c1", "segredo123").await.unwrap(),
        prompts::welcome_back("Ana")
    );

    let reply = h.send("c1", "Gastei 50 no supermercado").await.unwrap();
    assert_eq!(reply, "Despesa registrada: R$ 50,00 em alimentação.");

    let user = h.store.find_by_address("c1").await.unwrap().unwrap();
    assert_eq!(user.email, "ana@example.com");
    let entry = h.store.last_entry(&user.id).await.unwrap().unwrap();
    assert!((entry.amount - 50.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn interleaved_logins_stay_per_conversation() {
    let h = Harness::new();
    h.send("c1", "oi").await.unwrap();
    h.send("c2", "oi").await.unwrap();
    assert!(h.send("c1", "ana@example.com").await.unwrap().contains("senha"));

    // c2 is still at the email step.
    assert_eq!(h.send("c2", "segredo123").await.unwrap(), prompts::INVALID_EMAIL);
    assert_eq!(
        h.send("c1", "segredo123").await.unwrap(),
        prompts::welcome_back("Ana")
    );

    let auth = h.router.authenticator();
    assert!(auth.sessions().get("c1").is_some());
    assert!(auth.sessions().get("c2").is_none());
    assert_eq!(auth.pending_step("c2"), Some(LoginStep::Email));
    assert_eq!(h.send("c2", "gastei 10").await.unwrap(), prompts::INVALID_EMAIL);
    assert!(h.store.find_by_address("c2").await.unwrap().is_none());
}

#[tokio::test]
async fn password_is_never_kept_in_context() {
    let h = Harness::new();
    for text in ["oi", "ana@example.com", "segredo123"] {
        h.send("c1", text).await.unwrap();
    }
    let turns = h.router.context().recent("c1", 10);
    assert!(!turns.is_empty());
    assert!(turns.iter().all(|t| !t.text.contains("segredo123")));
}

#[tokio::test]
async fn bound_address_skips_login() {
    let h = Harness::new();
    let user_id = h.sign_in("c1").await;
    let reply = h.send("c1", "Recebi 5000 de salário").await.unwrap();
    assert_eq!(reply, "Receita registrada: R$ 5.000,00 em salário.");
    assert_eq!(
        h.router.authenticator().sessions().get("c1").unwrap().user_id,
        user_id
    );
}

#[tokio::test]
async fn duplicate_delivery_is_dropped() {
    let h = Harness::new();
    h.sign_in("c1").await;
    let message = InboundMessage::text("same-id", "c1", "gastei 10 no café");
    assert!(h.router.handle(message.clone()).await.is_some());
    assert!(h.router.handle(message).await.is_none());

    let user = h.store.find_by_address("c1").await.unwrap().unwrap();
    assert_eq!(h.store.recent_entries(&user.id, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_message_is_dropped() {
    let h = Harness::new();
    assert!(h.send("c1", "   ").await.is_none());
    assert!(h.send("", "oi").await.is_none());
}

#[tokio::test]
async fn follow_up_after_query_is_itemized() {
    let h = Harness::new();
    h.sign_in("c1").await;
    h.send("c1", "Gastei 50 no supermercado").await.unwrap();
    h.send("c1", "Gastei 25 no uber").await.unwrap();

    let summary = h.send("c1", "quanto gastei esse mês?").await.unwrap();
    assert!(summary.starts_with("Resumo neste mês"), "{summary}");
    assert!(summary.contains("Despesas variáveis: R$ 75,00"));

    let detail = h.send("c1", "mostre cada uma").await.unwrap();
    assert!(detail.starts_with("Lançamentos neste mês"), "{detail}");
    assert!(detail.contains("alimentação"));
    assert!(detail.contains("transporte"));
}

#[tokio::test]
async fn follow_up_after_expense_is_not_itemized() {
    let h = Harness::new();
    h.sign_in("c1").await;
    h.send("c1", "Gastei 25 no uber").await.unwrap();
    let reply = h.send("c1", "mostre cada uma").await.unwrap();
    assert_eq!(reply, replies::CLARIFY);
}

#[tokio::test]
async fn correction_amends_last_entry() {
    let h = Harness::new();
    let user_id = h.sign_in("c1").await;
    h.send("c1", "Recebi 500 de freela").await.unwrap();
    let reply = h.send("c1", "na verdade recebi 600").await.unwrap();
    assert!(reply.contains("R$ 500,00 → R$ 600,00"), "{reply}");
    let entries = h.store.recent_entries(&user_id, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn logout_requires_login_again() {
    let h = Harness::new();
    h.sign_in("c1").await;
    assert_eq!(h.send("c1", "ajuda").await.unwrap(), commands::HELP);
    assert_eq!(h.send("c1", "sair").await.unwrap(), commands::LOGGED_OUT);
    assert_eq!(h.send("c1", "gastei 10").await.unwrap(), prompts::WELCOME);
}

#[tokio::test]
async fn unsupported_media_gets_retryable_reply() {
    let h = Harness::new();
    h.sign_in("c1").await;
    let message = InboundMessage::text("m-audio", "c1", "").with_media(MediaPayload {
        kind: MediaKind::Audio,
        mime_type: "audio/ogg".into(),
        data: vec![0; 16],
    });
    let reply = h.router.handle(message).await.unwrap();
    assert!(reply.contains("arquivo"), "{reply}");
}

struct ReceiptReader;

#[async_trait]
impl MediaInterpreter for ReceiptReader {
    async fn process(
        &self,
        _media: &MediaPayload,
        _context: &MediaContext,
    ) -> ServiceResult<NormalizedInput> {
        Ok(NormalizedInput {
            text: "nota fiscal de venda".into(),
            hint: Some(
                IntentRecord::new(IntentType::Income, 0.9)
                    .with_amount(Some(120.0))
                    .with_category("vendas"),
            ),
        })
    }
}

#[tokio::test]
async fn media_hint_skips_classification() {
    let h = Harness::with(|router| router.with_media(Arc::new(ReceiptReader)));
    h.sign_in("c1").await;
    let message = InboundMessage::text("m-img", "c1", "").with_media(MediaPayload {
        kind: MediaKind::Image,
        mime_type: "image/jpeg".into(),
        data: vec![1, 2, 3],
    });
    let reply = h.router.handle(message).await.unwrap();
    assert_eq!(reply, "Receita registrada: R$ 120,00 em vendas.");
}

struct InvestmentModel;

#[async_trait]
impl NluProvider for InvestmentModel {
    fn name(&self) -> &str {
        "fake"
    }

    fn id(&self) -> &str {
        "fake-1"
    }

    async fn classify_remote(&self, _system: &str, prompt: &str) -> anyhow::Result<String> {
        assert!(prompt.contains("Mensagem:"));
        Ok("```json\n{\"type\":\"investment\",\"confidence\":0.9,\"amount\":300,\"category\":\"renda fixa\"}\n```".into())
    }
}

#[tokio::test]
async fn remote_classification_is_used_when_configured() {
    let h = Harness::new();
    let classifier = IntentClassifier::new(&TallyConfig::default().classifier, h.store.clone())
        .with_remote(
            Arc::new(InvestmentModel),
            Duration::from_secs(1),
            Duration::from_secs(60),
        );
    let store = h.store.clone();
    let router = Router::new(&TallyConfig::default(), store.clone(), store).with_classifier(classifier);
    h.sign_in("c9").await;

    let reply = router
        .handle(InboundMessage::text("r1", "c9", "coloquei uma grana no banco"))
        .await
        .unwrap();
    assert_eq!(reply, "Investimento registrado: R$ 300,00 em renda fixa.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_messages_in_one_conversation_all_land() {
    let h = Harness::new();
    let user_id = h.sign_in("c1").await;

    let tasks: Vec<_> = (1..=10)
        .map(|i| {
            let router = h.router.clone();
            tokio::spawn(async move {
                router
                    .handle(InboundMessage::text(
                        format!("p{i}"),
                        "c1",
                        format!("gastei {i} no mercado"),
                    ))
                    .await
            })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().is_some());
    }
    assert_eq!(h.store.recent_entries(&user_id, 20).await.unwrap().len(), 10);
}

#[derive(Default)]
struct CapturingOutbound {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ChannelOutbound for CapturingOutbound {
    async fn send_text(&self, conversation_id: &str, text: &str) -> ServiceResult {
        self.sent
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), text.to_string()));
        Ok(())
    }
}

#[tokio::test]
async fn deliver_sends_reply_through_outbound() {
    let outbound = Arc::new(CapturingOutbound::default());
    let h = Harness::with({
        let outbound = outbound.clone();
        move |router| router.with_outbound(outbound)
    });
    let reply = h
        .router
        .deliver(InboundMessage::text("d1", "c1", "oi"))
        .await
        .unwrap();
    let sent = outbound.sent.lock().unwrap();
    assert_eq!(sent.as_slice(), &[("c1".to_string(), reply)]);
}
