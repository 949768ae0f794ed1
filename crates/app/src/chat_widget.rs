//! Chat widget: conversation history around the rule-based assistant.
//!
//! Replies that identify a specialty or a professional hand their seed to
//! the booking page through the [`SeedOutbox`].

use std::sync::Arc;

use rdv_core::chat::{ChatAssistant, ChatReply};
use rdv_core::error::CoreError;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::error::AppResult;
use crate::handoff::SeedOutbox;

/// Opening message shown before the user writes anything.
pub const WELCOME_MESSAGE: &str =
    "Bonjour ! Je peux vous aider à trouver un professionnel et à prendre rendez-vous.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatEntry {
    pub speaker: Speaker,
    pub text: String,
}

pub struct ChatWidget {
    assistant: ChatAssistant,
    outbox: Arc<SeedOutbox>,
    history: Vec<ChatEntry>,
}

impl ChatWidget {
    pub fn new(outbox: Arc<SeedOutbox>) -> Self {
        Self {
            assistant: ChatAssistant::new(),
            outbox,
            history: vec![ChatEntry {
                speaker: Speaker::Assistant,
                text: WELCOME_MESSAGE.to_string(),
            }],
        }
    }

    pub fn history(&self) -> &[ChatEntry] {
        &self.history
    }

    /// Answer one user message. A blank message is rejected and not
    /// recorded.
    pub fn send(&mut self, input: &str, catalog: &Catalog) -> AppResult<ChatReply> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CoreError::Validation("Écrivez un message.".to_string()).into());
        }

        self.history.push(ChatEntry {
            speaker: Speaker::User,
            text: input.to_string(),
        });
        let reply = self.assistant.respond(input, &catalog.context());
        tracing::debug!(intent = ?reply.intent, seeded = reply.seed.is_some(), "Chat reply");
        self.history.push(ChatEntry {
            speaker: Speaker::Assistant,
            text: reply.text.clone(),
        });

        let mut reply = reply;
        if let Some(seed) = reply.seed.take() {
            let seed = catalog.locate(seed);
            self.outbox.publish(seed.clone())?;
            reply.seed = Some(seed);
        }
        Ok(reply)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
