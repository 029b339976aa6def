use serde::{Deserialize, Serialize};

/// Caller context sent with every turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionContext {
    pub tenant_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<String>,
    pub locale: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl SubmissionContext {
    pub fn new(tenant_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            ui: None,
            locale: "en".to_owned(),
            roles: Vec::new(),
        }
    }

    pub fn with_ui(mut self, ui: impl Into<String>) -> Self {
        self.ui = Some(ui.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}

/// Request body that opens one turn's response stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSubmission {
    pub session_id: String,
    pub message: String,
    pub context: SubmissionContext,
}

impl ChatSubmission {
    pub fn new(
        session_id: impl Into<String>,
        message: impl Into<String>,
        context: SubmissionContext,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            context,
        }
    }
}
