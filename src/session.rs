use uuid::Uuid;

/// Lazily created, stable identifier for one logical conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionIdentity {
    id: Option<String>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuses a known identifier instead of generating one.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }

    /// Returns the session id, generating a v4 UUID on first use.
    pub fn session_id(&mut self) -> &str {
        self.id.get_or_insert_with(|| Uuid::new_v4().to_string())
    }
}
