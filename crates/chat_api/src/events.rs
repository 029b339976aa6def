use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Guardrail action reported when a response was not constrained.
pub const DEFAULT_GUARDRAIL_ACTION: &str = "ALLOW";

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Maps a wire role to a [`Role`]; anything other than `user` is an assistant.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("user") {
            Self::User
        } else {
            Self::Assistant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Source reference attached to an assistant answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    #[serde(default, deserialize_with = "string_or_null")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub reference: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub snippet: String,
    #[serde(default, alias = "docId", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
}

impl Citation {
    pub fn new(
        title: impl Into<String>,
        reference: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            reference: reference.into(),
            snippet: snippet.into(),
            source_id: None,
            page: None,
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Normalized event kind. Unrecognized kinds keep their wire name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Partial,
    ToolResult,
    Final,
    Citations,
    Guardrail,
    Status,
    Message,
    Thinking,
    Unknown(String),
}

impl EventKind {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "partial" => Self::Partial,
            "tool_result" => Self::ToolResult,
            "final" => Self::Final,
            "citations" => Self::Citations,
            "guardrail" => Self::Guardrail,
            "status" => Self::Status,
            "message" => Self::Message,
            "thinking" => Self::Thinking,
            _ => Self::Unknown(value.trim().to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Partial => "partial",
            Self::ToolResult => "tool_result",
            Self::Final => "final",
            Self::Citations => "citations",
            Self::Guardrail => "guardrail",
            Self::Status => "status",
            Self::Message => "message",
            Self::Thinking => "thinking",
            Self::Unknown(name) => name,
        }
    }

    /// Kinds whose text is the cumulative assistant answer so far.
    pub fn is_incremental(&self) -> bool {
        matches!(self, Self::Partial | Self::ToolResult)
    }
}

/// Whole-message payload used by the non-incremental protocol variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePayload {
    pub role: Role,
    pub content: String,
    pub streaming: bool,
}

/// One decoded stream record after schema normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub kind: EventKind,
    pub text: Option<String>,
    pub citations: Option<Vec<Citation>>,
    pub guardrail_action: Option<String>,
    pub message: Option<MessagePayload>,
    pub status: Option<Value>,
}

impl StreamEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            text: None,
            citations: None,
            guardrail_action: None,
            message: None,
            status: None,
        }
    }

    pub fn partial(text: impl Into<String>) -> Self {
        Self::new(EventKind::Partial).with_text(text)
    }

    pub fn tool_result(text: impl Into<String>) -> Self {
        Self::new(EventKind::ToolResult).with_text(text)
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        Self::new(EventKind::Final).with_text(text)
    }

    pub fn citations(citations: Vec<Citation>) -> Self {
        Self::new(EventKind::Citations).with_citations(citations)
    }

    pub fn guardrail(action: impl Into<String>) -> Self {
        Self::new(EventKind::Guardrail).with_guardrail_action(action)
    }

    pub fn message(role: Role, content: impl Into<String>, streaming: bool) -> Self {
        let mut event = Self::new(EventKind::Message);
        event.message = Some(MessagePayload {
            role,
            content: content.into(),
            streaming,
        });
        event
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = Some(citations);
        self
    }

    pub fn with_guardrail_action(mut self, action: impl Into<String>) -> Self {
        self.guardrail_action = Some(action.into());
        self
    }

    /// Returns the event text when present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.is_empty())
    }

    /// Returns the guardrail action when it differs from [`DEFAULT_GUARDRAIL_ACTION`].
    pub fn guardrail_notice(&self) -> Option<&str> {
        self.guardrail_action
            .as_deref()
            .map(str::trim)
            .filter(|action| !action.is_empty())
            .filter(|action| !action.eq_ignore_ascii_case(DEFAULT_GUARDRAIL_ACTION))
    }
}
