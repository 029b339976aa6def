use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::events::{Citation, EventKind, MessagePayload, Role, StreamEvent};

/// Decode one NDJSON record into a normalized [`StreamEvent`].
///
/// Accepts both wire variants:
/// - `{ type, text?, data|metadata?: { citations?, guardrailAction? } }`
/// - `{ type, payload }`, where `payload` is a message object for `message`,
///   a citation array for `citations` and `{ action }` for `guardrail`.
pub fn decode_record(record: &str) -> Result<StreamEvent, DecodeError> {
    let value: Value = serde_json::from_str(record.trim())
        .map_err(|error| DecodeError::malformed(error.to_string()))?;
    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(DecodeError::malformed(format!(
                "expected a JSON object, got {}",
                value_type_name(&other)
            )))
        }
    };

    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
        .map(EventKind::parse)
        .ok_or_else(|| DecodeError::malformed("missing event type"))?;

    let metadata = object
        .get("data")
        .and_then(Value::as_object)
        .or_else(|| object.get("metadata").and_then(Value::as_object));
    let payload = object.get("payload").filter(|payload| !payload.is_null());

    let mut event = StreamEvent::new(kind);
    event.text = text_field(&object, payload);
    event.citations = citations_field(&event.kind, metadata, payload);
    event.guardrail_action = guardrail_field(&event.kind, metadata, payload);

    match event.kind {
        EventKind::Message => event.message = payload.and_then(message_payload),
        EventKind::Status => event.status = payload.cloned(),
        _ => {}
    }

    Ok(event)
}

fn text_field(object: &Map<String, Value>, payload: Option<&Value>) -> Option<String> {
    if let Some(text) = object.get("text").and_then(Value::as_str) {
        return Some(text.to_owned());
    }

    match payload? {
        Value::String(text) => Some(text.clone()),
        Value::Object(fields) => fields
            .get("text")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        _ => None,
    }
}

fn citations_field(
    kind: &EventKind,
    metadata: Option<&Map<String, Value>>,
    payload: Option<&Value>,
) -> Option<Vec<Citation>> {
    let raw = metadata
        .and_then(|metadata| metadata.get("citations"))
        .or_else(|| match (kind, payload) {
            (EventKind::Citations, Some(list @ Value::Array(_))) => Some(list),
            (_, Some(Value::Object(fields))) => fields.get("citations"),
            _ => None,
        })?
        .as_array()?;

    let citations: Vec<Citation> = raw.iter().filter_map(citation_entry).collect();
    if citations.is_empty() && !raw.is_empty() {
        return None;
    }
    Some(citations)
}

/// Decodes one citation, skipping entries that are not citation objects.
fn citation_entry(entry: &Value) -> Option<Citation> {
    let Value::Object(fields) = entry else {
        tracing::warn!(entry = value_type_name(entry), "skipping citation that is not an object");
        return None;
    };

    // `docId` aliases `sourceId`; serde rejects a record carrying both.
    let mut fields = fields.clone();
    if fields.contains_key("sourceId") {
        fields.remove("docId");
    }

    match serde_json::from_value::<Citation>(Value::Object(fields)) {
        Ok(citation) => Some(citation),
        Err(error) => {
            tracing::warn!(%error, "skipping malformed citation");
            None
        }
    }
}

fn guardrail_field(
    kind: &EventKind,
    metadata: Option<&Map<String, Value>>,
    payload: Option<&Value>,
) -> Option<String> {
    let from_metadata = metadata
        .and_then(|metadata| metadata.get("guardrailAction"))
        .and_then(Value::as_str);
    let from_payload = match (kind, payload) {
        (EventKind::Guardrail, Some(Value::String(action))) => Some(action.as_str()),
        (_, Some(Value::Object(fields))) => fields
            .get("action")
            .filter(|_| *kind == EventKind::Guardrail)
            .or_else(|| fields.get("guardrailAction"))
            .and_then(Value::as_str),
        _ => None,
    };

    from_metadata.or(from_payload).map(ToString::to_string)
}

fn message_payload(payload: &Value) -> Option<MessagePayload> {
    let fields = payload.as_object()?;
    let role = fields
        .get("role")
        .and_then(Value::as_str)
        .map(Role::parse)
        .unwrap_or(Role::Assistant);
    let content = fields
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let streaming = fields
        .get("streaming")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Some(MessagePayload {
        role,
        content,
        streaming,
    })
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
