use std::collections::BTreeMap;

use crate::config::ChatApiConfig;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_USER_AGENT: &str = "user-agent";

pub const NDJSON_MEDIA_TYPE: &str = "application/x-ndjson";
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Build a deterministic header map for chat stream requests.
///
/// Extra headers are applied last with lower-cased keys, so they may override
/// the defaults.
pub fn build_headers(config: &ChatApiConfig, user_agent: Option<&str>) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    headers.insert(HEADER_ACCEPT.to_owned(), NDJSON_MEDIA_TYPE.to_owned());
    headers.insert(HEADER_CONTENT_TYPE.to_owned(), JSON_MEDIA_TYPE.to_owned());

    let ua = match (user_agent, config.user_agent.as_deref()) {
        (Some(explicit), _) if !explicit.trim().is_empty() => explicit.trim().to_owned(),
        (_, Some(configured)) if !configured.trim().is_empty() => configured.trim().to_owned(),
        _ => default_user_agent(),
    };
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    for (key, value) in &config.extra_headers {
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            continue;
        }
        headers.insert(key, value.trim().to_owned());
    }

    headers
}

pub fn default_user_agent() -> String {
    format!("nc-chatbot/{}", env!("CARGO_PKG_VERSION"))
}
