//! Conversation transcript and the merge rules that fold stream events into it.
//!
//! The transcript is append-only except for its trailing streaming assistant
//! message. That message is tracked explicitly through `active_assistant`
//! instead of being re-derived from the tail on every event, so a user message
//! appended mid-turn can never resume an older streaming message.

use std::borrow::Cow;

use chat_api::{Citation, EventKind, Role, StreamEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub streaming: bool,
    pub citations: Option<Vec<Citation>>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            streaming: false,
            citations: None,
        }
    }

    pub fn assistant(content: impl Into<String>, streaming: bool) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            streaming,
            citations: None,
        }
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = Some(citations);
        self
    }
}

/// Whether applying an event changed the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Unchanged,
    Updated,
}

impl MergeOutcome {
    pub fn is_updated(self) -> bool {
        matches!(self, Self::Updated)
    }

    fn or(self, other: Self) -> Self {
        if self.is_updated() || other.is_updated() {
            Self::Updated
        } else {
            Self::Unchanged
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
    active_assistant: Option<usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a transcript from existing history.
    ///
    /// Only a streaming assistant message at the tail stays resumable; any
    /// other streaming flag is cleared.
    pub fn from_messages(mut messages: Vec<Message>) -> Self {
        let tail = messages.len().checked_sub(1);
        let mut active_assistant = None;

        for (index, message) in messages.iter_mut().enumerate() {
            if !message.streaming {
                continue;
            }
            if Some(index) == tail && message.role == Role::Assistant {
                active_assistant = Some(index);
            } else {
                message.streaming = false;
            }
        }

        Self {
            messages,
            active_assistant,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Index of the assistant message that partial text currently replaces.
    pub fn active_assistant_index(&self) -> Option<usize> {
        self.active_assistant
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.active_assistant = None;
    }

    /// Appends a user message, sealing any message still streaming.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.append(Message::user(content));
    }

    /// Marks the active streaming message final. Content is kept as is.
    pub fn seal_active(&mut self) -> MergeOutcome {
        let Some(index) = self.active_assistant.take() else {
            return MergeOutcome::Unchanged;
        };

        match self.messages.get_mut(index) {
            Some(message) if message.streaming => {
                message.streaming = false;
                MergeOutcome::Updated
            }
            _ => MergeOutcome::Unchanged,
        }
    }

    /// Folds one decoded event into the transcript in place.
    pub fn apply_event(&mut self, event: &StreamEvent) -> MergeOutcome {
        let content = match &event.kind {
            EventKind::Guardrail => return MergeOutcome::Unchanged,
            EventKind::Partial | EventKind::ToolResult => match event.text() {
                Some(text) => self.upsert_assistant(text, true),
                None => MergeOutcome::Unchanged,
            },
            EventKind::Final => match event.text() {
                Some(text) => self.upsert_assistant(text, false),
                None => self.seal_active(),
            },
            EventKind::Message => self.append_payload(event),
            EventKind::Citations
            | EventKind::Status
            | EventKind::Thinking
            | EventKind::Unknown(_) => MergeOutcome::Unchanged,
        };

        let citations = match &event.citations {
            Some(citations) => self.attach_citations(citations),
            None => MergeOutcome::Unchanged,
        };

        content.or(citations)
    }

    fn upsert_assistant(&mut self, text: &str, streaming: bool) -> MergeOutcome {
        let tail = self.messages.len().checked_sub(1);
        let resumable = self
            .active_assistant
            .filter(|index| Some(*index) == tail)
            .filter(|index| self.messages[*index].streaming);

        let Some(index) = resumable else {
            self.append(Message::assistant(text, streaming));
            return MergeOutcome::Updated;
        };

        if !streaming {
            self.active_assistant = None;
        }

        let message = &mut self.messages[index];
        if message.content == text && message.streaming == streaming {
            return MergeOutcome::Unchanged;
        }
        message.content.clear();
        message.content.push_str(text);
        message.streaming = streaming;
        MergeOutcome::Updated
    }

    fn append_payload(&mut self, event: &StreamEvent) -> MergeOutcome {
        let Some(payload) = &event.message else {
            return MergeOutcome::Unchanged;
        };
        if payload.content.is_empty() {
            return MergeOutcome::Unchanged;
        }

        let message = match payload.role {
            Role::User => Message::user(payload.content.clone()),
            Role::Assistant => Message::assistant(payload.content.clone(), payload.streaming),
        };
        self.append(message);
        MergeOutcome::Updated
    }

    fn attach_citations(&mut self, citations: &[Citation]) -> MergeOutcome {
        let Some(last) = self.messages.last_mut() else {
            return MergeOutcome::Unchanged;
        };
        if last.role != Role::Assistant || last.citations.as_deref() == Some(citations) {
            return MergeOutcome::Unchanged;
        }

        last.citations = Some(citations.to_vec());
        MergeOutcome::Updated
    }

    fn append(&mut self, message: Message) {
        self.seal_active();
        let resumable = message.role == Role::Assistant && message.streaming;
        self.messages.push(message);
        if resumable {
            self.active_assistant = Some(self.messages.len() - 1);
        }
    }
}

/// Applies `event` without mutating `transcript`.
///
/// Returns [`Cow::Borrowed`] when the event changes nothing, so callers can
/// detect no-ops without comparing message lists.
pub fn apply<'a>(transcript: &'a Transcript, event: &StreamEvent) -> Cow<'a, Transcript> {
    let mut next = transcript.clone();
    match next.apply_event(event) {
        MergeOutcome::Unchanged => Cow::Borrowed(transcript),
        MergeOutcome::Updated => Cow::Owned(next),
    }
}
