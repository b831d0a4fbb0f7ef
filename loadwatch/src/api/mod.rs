//! Backend API access.
//!
//! The backend wraps every response in a `{data, error, httpCode}` envelope;
//! this module issues the HTTP calls, unwraps the envelope, and decodes the
//! payload into the wire types. All failures collapse into [`FetchError`].

pub mod client;
mod envelope;
pub mod time;
pub mod types;

pub use client::ApiClient;
pub use types::{CircuitState, RateLimitToggle, RequestEvent, Snapshot};

use thiserror::Error;

/// Failure taxonomy for a single backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Body that does not parse, or parses into something that is not the
    /// expected envelope shape.
    #[error("cannot parse response: {0}")]
    Protocol(String),

    /// Backend-signaled failure, carrying the embedded message when present.
    #[error("{message}")]
    Application { status: u16, message: String },

    /// The request was superseded before its outcome was observed. Not a
    /// user-visible error; pollers drop these without surfacing anything.
    #[error("request cancelled")]
    Cancelled,

    /// Transport-level failure: unreachable host, timeout, reset.
    #[error("network error: {0}")]
    Network(String),
}
