use std::{sync::Arc, time::Duration};

use {
    dashmap::DashSet,
    serde::Serialize,
    tally_config::AuthConfig,
    tally_service_traits::{IdentityStore, User},
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    login::{LoginBook, LoginStep},
    session::SessionRegistry,
    validate,
};

/// Outcome of resolving a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub step: LoginStep,
}

impl AuthStatus {
    fn authenticated(user_id: &str) -> Self {
        Self {
            authenticated: true,
            user_id: Some(user_id.to_string()),
            step: LoginStep::Authenticated,
        }
    }

    fn pending(step: LoginStep) -> Self {
        Self {
            authenticated: false,
            user_id: None,
            step,
        }
    }
}

/// Prompt to send back after one login step, plus the resulting status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginReply {
    pub prompt: String,
    pub status: AuthStatus,
}

pub struct Authenticator {
    identity: Arc<dyn IdentityStore>,
    sessions: SessionRegistry,
    logins: LoginBook,
    /// Conversations that logged out; the address binding no longer signs
    /// them in until they complete the dialogue again.
    signed_out: DashSet<String>,
    min_password_len: usize,
}

impl Authenticator {
    pub fn new(identity: Arc<dyn IdentityStore>, config: &AuthConfig) -> Self {
        Self {
            identity,
            sessions: SessionRegistry::new(),
            logins: LoginBook::new(Duration::from_secs(config.login_ttl_secs)),
            signed_out: DashSet::new(),
            min_password_len: config.min_password_len.max(1),
        }
    }

    /// Replace the idle limit for unfinished login dialogues.
    #[must_use]
    pub fn with_login_ttl(mut self, ttl: Duration) -> Self {
        self.logins = LoginBook::new(ttl);
        self
    }

    /// Resolve a conversation to a user without consuming any input.
    ///
    /// An existing session wins; otherwise an address already bound in the
    /// identity store authenticates immediately and opens a session.
    pub async fn authenticate(&self, conversation_id: &str) -> AuthStatus {
        if let Some(session) = self.sessions.get(conversation_id) {
            return AuthStatus::authenticated(&session.user_id);
        }

        let step = self.logins.step(conversation_id);
        if step == LoginStep::Welcome && !self.signed_out.contains(conversation_id) {
            match self.identity.find_by_address(conversation_id).await {
                Ok(Some(user)) => {
                    self.sessions.establish(conversation_id, &user.id);
                    debug!(conversation_id, user_id = %user.id, "address already bound, session opened");
                    return AuthStatus::authenticated(&user.id);
                },
                Ok(None) => {},
                Err(e) => {
                    warn!(conversation_id, error = %e, "identity lookup failed");
                },
            }
        }

        AuthStatus::pending(step)
    }

    /// Step the login dialogue with one message.
    pub async fn advance(&self, conversation_id: &str, input: &str) -> LoginReply {
        match self.logins.step(conversation_id) {
            LoginStep::Welcome | LoginStep::Authenticated => {
                self.logins.start(conversation_id);
                info!(conversation_id, "login started");
                LoginReply {
                    prompt: prompts::WELCOME.to_string(),
                    status: AuthStatus::pending(LoginStep::Email),
                }
            },
            LoginStep::Email => match validate::email(input) {
                Ok(email) => {
                    self.logins.accept_email(conversation_id, email);
                    LoginReply {
                        prompt: prompts::ask_password(self.min_password_len),
                        status: AuthStatus::pending(LoginStep::Password),
                    }
                },
                Err(e) => {
                    debug!(conversation_id, error = %e, "email rejected");
                    LoginReply {
                        prompt: prompts::INVALID_EMAIL.to_string(),
                        status: AuthStatus::pending(LoginStep::Email),
                    }
                },
            },
            LoginStep::Password => {
                if let Err(e) = validate::password(input, self.min_password_len) {
                    debug!(conversation_id, error = %e, "password rejected");
                    return LoginReply {
                        prompt: prompts::invalid_password(self.min_password_len),
                        status: AuthStatus::pending(LoginStep::Password),
                    };
                }
                match self.complete(conversation_id).await {
                    Ok(user) => LoginReply {
                        prompt: prompts::welcome_back(&user.display_name),
                        status: AuthStatus::authenticated(&user.id),
                    },
                    Err(e) => {
                        warn!(conversation_id, error = %e, "login failed, restarting");
                        self.logins.finish(conversation_id);
                        LoginReply {
                            prompt: prompts::RESTART.to_string(),
                            status: AuthStatus::pending(LoginStep::Welcome),
                        }
                    },
                }
            },
        }
    }

    /// Resolve the pending email to a user and bind this address to it.
    async fn complete(&self, conversation_id: &str) -> Result<User> {
        let email = self
            .logins
            .get(conversation_id)
            .and_then(|p| p.pending_email)
            .ok_or_else(|| Error::MissingEmail {
                conversation_id: conversation_id.to_string(),
            })?;

        let user = self.identity.get_or_create_user(&email).await?;
        match self.identity.bind_address(conversation_id, &user.id).await {
            Ok(()) => {},
            Err(e) if e.is_conflict() => {
                warn!(conversation_id, user_id = %user.id, error = %e, "address bound elsewhere, rebinding");
                self.identity
                    .rebind_address(conversation_id, &user.id)
                    .await?;
            },
            Err(e) => return Err(e.into()),
        }

        self.sessions.establish(conversation_id, &user.id);
        self.logins.finish(conversation_id);
        self.signed_out.remove(conversation_id);
        info!(conversation_id, user_id = %user.id, "login completed");
        Ok(user)
    }

    /// Step the user is currently on, if a login process is open.
    #[must_use]
    pub fn pending_step(&self, conversation_id: &str) -> Option<LoginStep> {
        self.logins.get(conversation_id).map(|p| p.step)
    }

    /// End the session for a conversation. Returns whether one existed.
    pub fn logout(&self, conversation_id: &str) -> bool {
        self.logins.finish(conversation_id);
        let ended = self.sessions.end(conversation_id).is_some();
        self.signed_out.insert(conversation_id.to_string());
        if ended {
            info!(conversation_id, "session ended");
        }
        ended
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }
}

/// Login dialogue texts.
pub mod prompts {
    pub const WELCOME: &str = "Olá! Eu sou o Tally, seu assistente financeiro. \
        Para começar, qual é o seu e-mail?";
    pub const INVALID_EMAIL: &str =
        "Esse e-mail não parece válido. Confira e envie novamente, por favor.";
    pub const RESTART: &str = "Desculpe, tive um problema ao acessar sua conta. \
        Envie qualquer mensagem para recomeçar.";

    pub fn ask_password(min_len: usize) -> String {
        format!("Perfeito! Agora digite a sua senha (mínimo de {min_len} caracteres).")
    }

    pub fn invalid_password(min_len: usize) -> String {
        format!("A senha precisa ter pelo menos {min_len} caracteres. Tente novamente.")
    }

    pub fn welcome_back(name: &str) -> String {
        if name.trim().is_empty() {
            "Pronto! Você está conectado. Me conte suas receitas e despesas.".to_string()
        } else {
            format!("Pronto, {name}! Você está conectado. Me conte suas receitas e despesas.")
        }
    }
}
