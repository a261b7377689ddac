// Conversation assembly for the barista chat
//
// The upstream model always sees the persona preamble, a fixed
// acknowledgement, the caller's history and then the new message.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChatError;

/// Persona and menu preamble sent as the first user turn
pub const SYSTEM_PROMPT: &str = "You are Maggie, the friendly AI barista at Love Over Coffee. You're warm, enthusiastic, and extremely knowledgeable about coffee, beverages, and the cafe's menu. Your personality is welcoming and slightly playful.

Key traits:
- You love helping customers discover new drinks
- You can recommend pairings between coffee and food
- You share fun coffee facts occasionally
- You're proud of the cafe's cozy atmosphere
- Keep responses concise and friendly (2-3 sentences max unless they ask for details)

The cafe serves:
- Hot coffees: Cappuccino, Latte, Mocha, Espresso, Flat White
- Cold coffees: Cafe Frappe, Caramel Frappe, Tiramisu Frappe, Oreo Frappe
- Ice Teas: Lemon Mint, Peach, Strawberry, Blueberry
- Mocktails: Virgin Mojito, Mango Mojito, Cranberry Mojito
- Shakes: Oreo, Nutella, Dark Chocolate, Strawberry
- Food: Pizzas, Sandwiches, Pasta, Garlic Bread, Nachos, Fries

Always be helpful and recommend items based on customer preferences.";

/// Model turn acknowledging the preamble
pub const PERSONA_ACK: &str = "Got it! I'm Maggie, ready to help!";

/// Speaker of a turn as the upstream API names it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
}

/// One text fragment of a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// One turn of the conversation sent upstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: ContentRole,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: ContentRole, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part { text: text.into() }],
        }
    }
}

/// A prior turn as the browser widget reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    /// `assistant` turns belong to the model, everything else to the user
    pub fn upstream_role(&self) -> ContentRole {
        if self.role == "assistant" {
            ContentRole::Model
        } else {
            ContentRole::User
        }
    }
}

/// Validated chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
        }
    }

    /// Validate a loosely-typed JSON body
    ///
    /// `message` must be a non-empty string. A `history` that is not an array
    /// is treated as empty, and history entries without string `role` and
    /// `content` are skipped.
    pub fn from_json(body: &Value) -> Result<Self, ChatError> {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .ok_or(ChatError::EmptyMessage)?;

        let history = body
            .get("history")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let role = entry.get("role").and_then(Value::as_str)?;
                        let content = entry.get("content").and_then(Value::as_str)?;
                        Some(ChatTurn {
                            role: role.to_string(),
                            content: content.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            message: message.to_string(),
            history,
        })
    }

    /// Full conversation in upstream order
    pub fn conversation(&self) -> Vec<Content> {
        let mut contents = Vec::with_capacity(self.history.len() + 3);
        contents.push(Content::text(ContentRole::User, SYSTEM_PROMPT));
        contents.push(Content::text(ContentRole::Model, PERSONA_ACK));
        contents.extend(
            self.history
                .iter()
                .map(|turn| Content::text(turn.upstream_role(), turn.content.clone())),
        );
        contents.push(Content::text(ContentRole::User, self.message.clone()));
        contents
    }
}
