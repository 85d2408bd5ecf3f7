use {
    serde::{Deserialize, Serialize},
    tally_common::types::MediaPayload,
};

use crate::error::{Error, Result};

/// One message as delivered by a channel transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Transport-assigned id; re-deliveries carry the same value.
    pub message_id: String,
    /// Stable external address of the conversation (phone number, chat id).
    pub conversation_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(skip)]
    pub media: Option<MediaPayload>,
}

impl InboundMessage {
    pub fn text(
        message_id: impl Into<String>,
        conversation_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            conversation_id: conversation_id.into(),
            text: text.into(),
            media: None,
        }
    }

    #[must_use]
    pub fn with_media(mut self, media: MediaPayload) -> Self {
        self.media = Some(media);
        self
    }

    /// Reject messages the router cannot key or act on.
    pub fn validate(&self) -> Result<()> {
        if self.message_id.trim().is_empty() {
            return Err(Error::invalid_input("missing message id"));
        }
        if self.conversation_id.trim().is_empty() {
            return Err(Error::invalid_input("missing conversation id"));
        }
        if self.text.trim().is_empty() && self.media.is_none() {
            return Err(Error::invalid_input("message has neither text nor media"));
        }
        Ok(())
    }
}
