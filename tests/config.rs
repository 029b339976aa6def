use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use nc_chatbot::config::{ConfigError, WidgetConfig, ROLES_ENV, TENANT_ID_ENV, UI_ENV};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let values: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect();
    move |key: &str| values.get(key).cloned()
}

#[test]
fn file_values_are_loaded_and_env_overrides_win() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("chat.json");
    fs::write(
        &path,
        r#"{
            "apiBase": "https://courier.example.com/api",
            "tenantId": "tenant-file",
            "userId": "user-file",
            "roles": ["dispatcher", " "],
            "ui": "CP",
            "timeoutSec": 30
        }"#,
    )
    .expect("write config");

    let config = WidgetConfig::load(
        Some(path.as_path()),
        env_of(&[(TENANT_ID_ENV, "tenant-env"), (ROLES_ENV, "admin, driver,,")]),
    )
    .expect("config should load");

    assert_eq!(
        config,
        WidgetConfig {
            api_base: "https://courier.example.com/api".to_owned(),
            tenant_id: Some("tenant-env".to_owned()),
            user_id: Some("user-file".to_owned()),
            roles: vec!["admin".to_owned(), "driver".to_owned()],
            ui: Some("CP".to_owned()),
            locale: "en".to_owned(),
            timeout_sec: Some(30),
        }
    );
    assert!(config.validate().is_ok());

    let api = config.api_config();
    assert_eq!(api.base_url, "https://courier.example.com/api");
    assert_eq!(api.timeout, Some(Duration::from_secs(30)));
}

#[test]
fn submission_context_mirrors_widget_properties() {
    let config = WidgetConfig::load(
        None,
        env_of(&[
            (TENANT_ID_ENV, "tenant-1"),
            ("NC_CHAT_USER_ID", "user-2"),
            (UI_ENV, "WEB"),
            ("NC_CHAT_LOCALE", "fr"),
        ]),
    )
    .expect("config should load");

    let context = config.submission_context();
    assert_eq!(context.tenant_id, "tenant-1");
    assert_eq!(context.user_id, "user-2");
    assert_eq!(context.ui.as_deref(), Some("WEB"));
    assert_eq!(context.locale, "fr");
    assert!(context.roles.is_empty());
}

#[test]
fn unknown_fields_are_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("chat.json");
    fs::write(&path, r#"{"tenantId":"t","apiKey":"secret"}"#).expect("write config");

    let error = WidgetConfig::load(Some(path.as_path()), |_| None).expect_err("unknown field should fail");
    assert!(matches!(error, ConfigError::Parse { .. }));
}

#[test]
fn missing_file_reports_path() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("absent.json");

    let error = WidgetConfig::load(Some(path.as_path()), |_| None).expect_err("missing file should fail");
    assert!(matches!(&error, ConfigError::Io { path: reported, .. } if reported == &path));
}

#[test]
fn validate_names_missing_identity_and_bad_timeout() {
    let config = WidgetConfig::load(None, env_of(&[(TENANT_ID_ENV, "tenant-1")]))
        .expect("config should load");
    assert!(matches!(config.validate(), Err(ConfigError::Missing("userId"))));

    let config = WidgetConfig {
        tenant_id: Some("t".to_owned()),
        user_id: Some("u".to_owned()),
        timeout_sec: Some(0),
        ..WidgetConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid { field: "timeoutSec", .. })
    ));
}
