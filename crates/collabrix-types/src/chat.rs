use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Author of a transcript turn.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Speaker label used when a transcript is flattened into a prompt.
    pub fn prompt_label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Bot",
            Role::System => "System",
        }
    }
}

/// One role-tagged message in a chat transcript.
///
/// Turns are immutable once appended; transcript order is append order,
/// not timestamp order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Render turns as `Label: content` lines, oldest first.
pub fn render_conversation(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role.prompt_label(), t.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_lowercase_names() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(Role::from_str("system").unwrap(), Role::System);
        assert!(Role::from_str("bot").is_err());
    }

    #[test]
    fn turn_serializes_with_lowercase_role() {
        let turn = Turn::user("hi");
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "hi");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn conversation_uses_bot_label_for_assistant() {
        let turns = vec![Turn::user("hi"), Turn::assistant("hello alice")];
        assert_eq!(render_conversation(&turns), "User: hi\nBot: hello alice");
    }

    #[test]
    fn empty_conversation_renders_empty() {
        assert_eq!(render_conversation(&[]), "");
    }
}
