/// Default API base used when none is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:8080/api";

/// Path of the streaming chat endpoint relative to the API base.
pub const STREAM_PATH: &str = "/chat/stream";

/// Build the stream endpoint for a tenant/user pair.
///
/// The query always carries `tenantId` then `userId`, form-encoded. A trailing
/// slash on `base` is ignored.
pub fn build_stream_endpoint(base: &str, tenant_id: &str, user_id: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    let query = ::url::form_urlencoded::Serializer::new(String::new())
        .append_pair("tenantId", tenant_id)
        .append_pair("userId", user_id)
        .finish();

    format!("{base}{STREAM_PATH}?{query}")
}

/// Resolve the absolute stream URL, rejecting bases that are not absolute URLs.
pub fn resolve_stream_url(
    base: &str,
    tenant_id: &str,
    user_id: &str,
) -> Result<::url::Url, ::url::ParseError> {
    let base = if base.trim().is_empty() {
        DEFAULT_API_BASE
    } else {
        base
    };
    ::url::Url::parse(&build_stream_endpoint(base, tenant_id, user_id))
}
