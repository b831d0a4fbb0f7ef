//! The backend's uniform response envelope: `{ data, error, httpCode }`,
//! where `error` is `{ code, message }` and failures may also arrive as a
//! plain non-2xx HTTP status.

use serde_json::Value;

use crate::api::FetchError;

/// Applies the envelope decision tree to a raw response body.
///
/// Returns the bare `data` payload on success. The caller still has to
/// decode it into a concrete wire type.
pub(crate) fn unwrap(http_status: u16, body: &str) -> Result<Value, FetchError> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::Protocol(e.to_string()))?;

    let envelope = parsed
        .as_object()
        .ok_or_else(|| FetchError::Protocol("response is not an object".to_string()))?;

    let recognizable = envelope.contains_key("data")
        || envelope.contains_key("error")
        || envelope.contains_key("httpCode");
    if !recognizable {
        return Err(FetchError::Protocol(
            "response has no envelope fields".to_string(),
        ));
    }

    let embedded_code = envelope
        .get("httpCode")
        .and_then(Value::as_u64)
        .and_then(|n| u16::try_from(n).ok())
        .unwrap_or(0);
    let error = envelope.get("error").filter(|e| !e.is_null());

    if http_status >= 400 || embedded_code >= 400 || error.is_some() {
        let status = if http_status >= 400 {
            http_status
        } else {
            embedded_code.max(http_status)
        };
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(FetchError::Application { status, message });
    }

    Ok(envelope.get("data").cloned().unwrap_or(Value::Null))
}
