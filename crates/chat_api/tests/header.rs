use chat_api::headers::{
    build_headers, default_user_agent, HEADER_ACCEPT, HEADER_CONTENT_TYPE, HEADER_USER_AGENT,
};
use chat_api::ChatApiConfig;

#[test]
fn headers_request_ndjson_and_send_json() {
    let headers = build_headers(&ChatApiConfig::default(), None);

    assert_eq!(headers.get(HEADER_ACCEPT).map(String::as_str), Some("application/x-ndjson"));
    assert_eq!(
        headers.get(HEADER_CONTENT_TYPE).map(String::as_str),
        Some("application/json")
    );
    assert_eq!(headers.get(HEADER_USER_AGENT), Some(&default_user_agent()));
}

#[test]
fn explicit_user_agent_wins_over_config() {
    let config = ChatApiConfig::default().with_user_agent("configured/1.0");

    let from_config = build_headers(&config, None);
    assert_eq!(
        from_config.get(HEADER_USER_AGENT).map(String::as_str),
        Some("configured/1.0")
    );

    let explicit = build_headers(&config, Some(" explicit/2.0 "));
    assert_eq!(
        explicit.get(HEADER_USER_AGENT).map(String::as_str),
        Some("explicit/2.0")
    );
}

#[test]
fn extra_headers_are_lowercased_and_trimmed() {
    let config = ChatApiConfig::default()
        .insert_header("X-Tenant-Hint", " acme ")
        .insert_header("  ", "ignored");

    let headers = build_headers(&config, None);
    assert_eq!(headers.get("x-tenant-hint").map(String::as_str), Some("acme"));
    assert!(!headers.contains_key(""));
}
