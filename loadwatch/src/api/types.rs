//! Wire types for the two polled feeds and the rate-limit toggle.

use serde::{Deserialize, Deserializer};

/// Circuit breaker state as reported by the backend. Anything the backend
/// sends that is not one of the three well-known states decodes to
/// `Unknown` rather than failing the whole snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
    #[default]
    Unknown,
}

impl From<String> for CircuitState {
    fn from(raw: String) -> CircuitState {
        match raw.as_str() {
            "CLOSED" => CircuitState::Closed,
            "OPEN" => CircuitState::Open,
            "HALF_OPEN" => CircuitState::HalfOpen,
            _ => CircuitState::Unknown,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
            CircuitState::Unknown => write!(f, "—"),
        }
    }
}

/// One point-in-time system health reading. Immutable once received; the
/// next poll supersedes it wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Raw instant text; may carry a trailing `[Region/City]` suffix that
    /// [`crate::api::time`] strips before parsing.
    pub timestamp: String,
    #[serde(default)]
    pub circuit_breaker_state: CircuitState,
    #[serde(default)]
    pub rate_limit_enabled: bool,
    #[serde(default)]
    pub active_connections: u32,
    #[serde(default)]
    pub idle_connections: u32,
    #[serde(default)]
    pub total_connections: u32,
    #[serde(default)]
    pub waiting_threads: u32,
    #[serde(default)]
    pub avg_response_time_ms: Option<f64>,
}

/// One observed request against the backend under test. Every field except
/// the status tolerates being absent; aggregation skips events that lack
/// what it needs instead of rejecting the whole list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEvent {
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "numeric_status")]
    pub status: Option<u16>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// Accepts only an actual JSON number for the status; anything else (null,
/// a quoted string, a float out of range) reads as "no numeric status".
fn numeric_status<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_u64)
        .and_then(|n| u16::try_from(n).ok()))
}

/// Payload of `POST /api/system/rate-limit/toggle`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitToggle {
    pub rate_limit_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_state_decodes_known_and_unknown() {
        assert_eq!(CircuitState::from("CLOSED".to_string()), CircuitState::Closed);
        assert_eq!(CircuitState::from("OPEN".to_string()), CircuitState::Open);
        assert_eq!(
            CircuitState::from("HALF_OPEN".to_string()),
            CircuitState::HalfOpen
        );
        assert_eq!(
            CircuitState::from("FORCED_OPEN".to_string()),
            CircuitState::Unknown
        );
    }

    #[test]
    fn snapshot_decodes_backend_shape() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{
                "timestamp": "2025-11-02T10:15:42.123+09:00[Asia/Seoul]",
                "circuitBreakerState": "HALF_OPEN",
                "rateLimitEnabled": true,
                "activeConnections": 18,
                "idleConnections": 2,
                "totalConnections": 20,
                "waitingThreads": 3,
                "hikariTimeoutCount": 4.0,
                "avgResponseTimeMs": 250
            }"#,
        )
        .unwrap();
        assert_eq!(snapshot.circuit_breaker_state, CircuitState::HalfOpen);
        assert!(snapshot.rate_limit_enabled);
        assert_eq!(snapshot.active_connections, 18);
        assert_eq!(snapshot.total_connections, 20);
        assert_eq!(snapshot.waiting_threads, 3);
        assert_eq!(snapshot.avg_response_time_ms, Some(250.0));
    }

    #[test]
    fn snapshot_tolerates_missing_optionals() {
        let snapshot: Snapshot =
            serde_json::from_str(r#"{"timestamp": "2025-11-02T10:15:42Z"}"#).unwrap();
        assert_eq!(snapshot.circuit_breaker_state, CircuitState::Unknown);
        assert_eq!(snapshot.avg_response_time_ms, None);
        assert_eq!(snapshot.total_connections, 0);
    }

    #[test]
    fn event_status_must_be_numeric() {
        let events: Vec<RequestEvent> = serde_json::from_str(
            r#"[
                {"ip": "1.2.3.4", "status": 200},
                {"ip": "1.2.3.4", "status": "teapot"},
                {"ip": "1.2.3.4"}
            ]"#,
        )
        .unwrap();
        assert_eq!(events[0].status, Some(200));
        assert_eq!(events[1].status, None);
        assert_eq!(events[2].status, None);
    }
}
