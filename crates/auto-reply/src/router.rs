use std::{sync::Arc, time::Duration};

use {
    tally_auth::{Authenticator, LoginStep},
    tally_channels::{DedupGate, InboundMessage},
    tally_config::TallyConfig,
    tally_intent::{ClassifyInput, IntentClassifier},
    tally_routing::{DispatchRequest, Dispatcher},
    tally_service_traits::{
        ChannelOutbound, IdentityStore, Ledger, MediaContext, MediaInterpreter,
        NoopChannelOutbound, NoopMediaInterpreter, NormalizedInput,
    },
    tally_sessions::{ContextTracker, ConversationLocks, Turn},
    tracing::{debug, error, info, warn},
};

use crate::commands::{self, Command};

/// What is stored in the context in place of a password.
const MASKED_INPUT: &str = "••••••";

const MEDIA_FAILED: &str =
    "Não consegui processar o arquivo que você enviou. Pode tentar de novo ou escrever a mensagem?";
const EMPTY_MESSAGE: &str = "Não recebi nenhum texto. Pode escrever de novo?";
const INTERNAL_ERROR: &str =
    "Desculpe, não consegui processar sua mensagem agora. Tente novamente em instantes.";

/// Entry point for every inbound message.
///
/// Per message: admit → lock the conversation → normalize media → record the
/// user turn → authenticate (or step the login dialogue) → commands →
/// classify → dispatch → record the agent turn.
pub struct Router {
    gate: DedupGate,
    locks: ConversationLocks,
    context: ContextTracker,
    auth: Authenticator,
    classifier: IntentClassifier,
    dispatcher: Dispatcher,
    media: Arc<dyn MediaInterpreter>,
    outbound: Arc<dyn ChannelOutbound>,
}

impl Router {
    /// Router with the remote classifier from `config.nlu` (when usable) and
    /// no-op media and outbound collaborators.
    pub fn new(
        config: &TallyConfig,
        identity: Arc<dyn IdentityStore>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        let classifier =
            IntentClassifier::new(&config.classifier, ledger.clone()).with_nlu_config(&config.nlu);
        let dispatcher = Dispatcher::new(ledger)
            .with_threshold(config.classifier.low_confidence_threshold)
            .with_pending_sale_ttl(Duration::from_secs(config.router.pending_sale_ttl_secs));
        Self {
            gate: DedupGate::with_window(
                Duration::from_secs(config.router.dedup_window_secs),
                config.router.dedup_sweep_every,
            ),
            locks: ConversationLocks::new(),
            context: ContextTracker::new(config.router.context_capacity),
            auth: Authenticator::new(identity, &config.auth),
            classifier,
            dispatcher,
            media: Arc::new(NoopMediaInterpreter),
            outbound: Arc::new(NoopChannelOutbound),
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    #[must_use]
    pub fn with_media(mut self, media: Arc<dyn MediaInterpreter>) -> Self {
        self.media = media;
        self
    }

    #[must_use]
    pub fn with_outbound(mut self, outbound: Arc<dyn ChannelOutbound>) -> Self {
        self.outbound = outbound;
        self
    }

    #[must_use]
    pub fn context(&self) -> &ContextTracker {
        &self.context
    }

    #[must_use]
    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Process one message. `None` means the message was dropped on purpose
    /// (duplicate delivery or unusable input).
    pub async fn handle(&self, message: InboundMessage) -> Option<String> {
        if let Err(e) = message.validate() {
            warn!(message_id = %message.message_id, error = %e, "dropping invalid message");
            return None;
        }
        let conversation_id = message.conversation_id.as_str();
        if !self.gate.admit(&message.message_id) {
            debug!(
                conversation_id,
                message_id = %message.message_id,
                "duplicate delivery dropped"
            );
            return None;
        }

        let _permit = match self.locks.acquire(conversation_id).await {
            Ok(permit) => permit,
            Err(e) => {
                error!(conversation_id, error = %e, "conversation lock unavailable");
                return Some(INTERNAL_ERROR.to_string());
            },
        };

        let reply = self.process(&message).await;
        self.context.append(conversation_id, Turn::agent(&reply));
        info!(
            conversation_id,
            message_id = %message.message_id,
            reply_len = reply.len(),
            "reply ready"
        );
        Some(reply)
    }

    /// [`Self::handle`] and send the reply through the channel outbound.
    pub async fn deliver(&self, message: InboundMessage) -> Option<String> {
        let conversation_id = message.conversation_id.clone();
        let reply = self.handle(message).await?;
        if let Err(e) = self.outbound.send_text(&conversation_id, &reply).await {
            warn!(conversation_id, error = %e, "failed to send reply");
        }
        Some(reply)
    }

    async fn process(&self, message: &InboundMessage) -> String {
        let conversation_id = message.conversation_id.as_str();

        let input = match self.normalize(message).await {
            Ok(input) => input,
            Err(reply) => return reply,
        };
        if input.text.is_empty() && input.hint.is_none() {
            return EMPTY_MESSAGE.to_string();
        }

        // History before this message, for follow-up detection.
        let history = self.context.recent(conversation_id, self.context.capacity());
        let masked = self.auth.pending_step(conversation_id) == Some(LoginStep::Password);
        self.context.append(
            conversation_id,
            Turn::user(if masked { MASKED_INPUT } else { input.text.as_str() }),
        );

        let status = self.auth.authenticate(conversation_id).await;
        let Some(user_id) = status.user_id.filter(|_| status.authenticated) else {
            return self.auth.advance(conversation_id, &input.text).await.prompt;
        };

        match Command::parse(&input.text) {
            Some(Command::Logout) => {
                self.auth.logout(conversation_id);
                self.context.clear(conversation_id);
                return commands::LOGGED_OUT.to_string();
            },
            Some(Command::Help) => return commands::HELP.to_string(),
            None => {},
        }

        let record = match input.hint {
            Some(hint) => {
                debug!(conversation_id, intent = %hint.kind, "using media classification");
                hint
            },
            None => {
                self.classifier
                    .classify(&ClassifyInput {
                        text: &input.text,
                        user_id: Some(&user_id),
                        history: &history,
                    })
                    .await
            },
        };
        self.context
            .attach_classification(conversation_id, record.clone());

        info!(
            conversation_id,
            user_id = %user_id,
            intent = %record.kind,
            confidence = record.confidence,
            "message classified"
        );
        self.dispatcher
            .dispatch(&DispatchRequest {
                user_id,
                conversation_id: conversation_id.to_string(),
                text: input.text,
                record,
            })
            .await
    }

    /// Text plus optional classification hint. Media goes through the
    /// interpreter; its failure is reported back as a retryable reply.
    async fn normalize(&self, message: &InboundMessage) -> Result<NormalizedInput, String> {
        let typed = message.text.trim();
        let Some(media) = &message.media else {
            return Ok(NormalizedInput::text(typed));
        };

        let context = MediaContext {
            conversation_id: message.conversation_id.clone(),
            user_id: self
                .auth
                .sessions()
                .get(&message.conversation_id)
                .map(|s| s.user_id),
        };
        match self.media.process(media, &context).await {
            Ok(mut input) => {
                let extracted = input.text.trim();
                input.text = match (typed.is_empty(), extracted.is_empty()) {
                    (_, true) => typed.to_string(),
                    (true, false) => extracted.to_string(),
                    (false, false) => format!("{typed} {extracted}"),
                };
                Ok(input)
            },
            Err(e) => {
                warn!(
                    conversation_id = %message.conversation_id,
                    media = %media.kind,
                    error = %e,
                    "media interpretation failed"
                );
                Err(MEDIA_FAILED.to_string())
            },
        }
    }
}
