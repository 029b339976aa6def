//! Widget configuration: a JSON file plus environment overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chat_api::url::DEFAULT_API_BASE;
use chat_api::{ChatApiConfig, SubmissionContext};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "NC_CHAT_CONFIG_PATH";
pub const API_BASE_ENV: &str = "NC_CHAT_API_BASE";
pub const TENANT_ID_ENV: &str = "NC_CHAT_TENANT_ID";
pub const USER_ID_ENV: &str = "NC_CHAT_USER_ID";
pub const ROLES_ENV: &str = "NC_CHAT_ROLES";
pub const UI_ENV: &str = "NC_CHAT_UI";
pub const LOCALE_ENV: &str = "NC_CHAT_LOCALE";

const DEFAULT_LOCALE: &str = "en";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub api_base: String,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub roles: Vec<String>,
    pub ui: Option<String>,
    pub locale: String,
    pub timeout_sec: Option<u64>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_owned(),
            tenant_id: None,
            user_id: None,
            roles: Vec::new(),
            ui: None,
            locale: DEFAULT_LOCALE.to_owned(),
            timeout_sec: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct FileConfig {
    api_base: Option<String>,
    tenant_id: Option<String>,
    user_id: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    ui: Option<String>,
    locale: Option<String>,
    timeout_sec: Option<u64>,
}

impl WidgetConfig {
    /// Loads from `NC_CHAT_CONFIG_PATH` (if set) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env_string_opt(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load(path.as_deref(), env_string_opt)
    }

    /// Loads from an optional JSON file, then applies overrides from `lookup`.
    pub fn load(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => read_file(path)?,
            None => FileConfig::default(),
        };

        let mut config = Self::default();
        if let Some(api_base) = non_blank(file.api_base) {
            config.api_base = api_base;
        }
        config.tenant_id = non_blank(file.tenant_id);
        config.user_id = non_blank(file.user_id);
        config.roles = clean_roles(file.roles);
        config.ui = non_blank(file.ui);
        if let Some(locale) = non_blank(file.locale) {
            config.locale = locale;
        }
        config.timeout_sec = file.timeout_sec;

        let lookup = |key: &str| non_blank(lookup(key));
        if let Some(api_base) = lookup(API_BASE_ENV) {
            config.api_base = api_base;
        }
        if let Some(tenant_id) = lookup(TENANT_ID_ENV) {
            config.tenant_id = Some(tenant_id);
        }
        if let Some(user_id) = lookup(USER_ID_ENV) {
            config.user_id = Some(user_id);
        }
        if let Some(roles) = lookup(ROLES_ENV) {
            config.roles = clean_roles(roles.split(',').map(str::to_owned));
        }
        if let Some(ui) = lookup(UI_ENV) {
            config.ui = Some(ui);
        }
        if let Some(locale) = lookup(LOCALE_ENV) {
            config.locale = locale;
        }

        Ok(config)
    }

    /// Checks that a stream can be opened with this configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tenant_id.is_none() {
            return Err(ConfigError::Missing("tenantId"));
        }
        if self.user_id.is_none() {
            return Err(ConfigError::Missing("userId"));
        }
        if self.timeout_sec == Some(0) {
            return Err(ConfigError::Invalid {
                field: "timeoutSec",
                reason: "must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }

    pub fn submission_context(&self) -> SubmissionContext {
        let mut context = SubmissionContext::new(
            self.tenant_id.clone().unwrap_or_default(),
            self.user_id.clone().unwrap_or_default(),
        )
        .with_locale(self.locale.clone())
        .with_roles(self.roles.clone());
        context.ui = self.ui.clone();
        context
    }

    pub fn api_config(&self) -> ChatApiConfig {
        let config = ChatApiConfig::new(self.api_base.clone());
        match self.timeout_sec {
            Some(seconds) if seconds > 0 => config.with_timeout(Duration::from_secs(seconds)),
            _ => config,
        }
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn clean_roles(roles: impl IntoIterator<Item = String>) -> Vec<String> {
    roles
        .into_iter()
        .filter_map(|role| non_blank(Some(role)))
        .collect()
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
