use chrono::{DateTime, Utc};
use groundchat_schema::{ChatProxyRequest, Content};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Role name on the upstream wire.
    pub fn as_upstream(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "model",
        }
    }
}

/// A cited web page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            sources: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Sources are filtered to non-empty, unique uris.
    pub fn assistant(text: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            sources: crate::normalize::dedup_sources(sources),
            created_at: Utc::now(),
        }
    }
}

/// Append-only sequence of turns.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: ConversationTurn) -> &ConversationTurn {
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The whole conversation in upstream shape. Sources stay client-side.
    pub fn to_request(&self) -> ChatProxyRequest {
        ChatProxyRequest {
            contents: self
                .turns
                .iter()
                .map(|turn| Content::text(Some(turn.role.as_upstream()), turn.text.clone()))
                .collect(),
        }
    }
}
