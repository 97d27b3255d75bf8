//! Transport error type. Failures surface immediately; the caller decides
//! what to tell the user and never re-fires the same call.

use thiserror::Error;

/// Errors surfaced by the tool-server transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),

    /// Network-level failure talking to the server.
    #[error("request to {url} failed: {source}")]
    Network {
        /// Endpoint that was contacted.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The call did not complete within the request timeout.
    #[error("tool call timed out after {0}s")]
    Timeout(u64),

    /// The server answered with an HTTP error status.
    #[error("tool server returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code (>= 400).
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// The response body was not decodable JSON.
    #[error("invalid JSON in tool server response: {0}")]
    Decode(#[from] serde_json::Error),

    /// An event-stream body contained no decodable `data:` line.
    #[error("event stream contained no decodable data line")]
    EventStream,

    /// The server returned a JSON-RPC error object.
    #[error("tool server error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Server-provided message.
        message: String,
    },

    /// The envelope carried neither `result` nor `error`.
    #[error("tool server response missing result")]
    MissingResult,
}

impl TransportError {
    /// True when the failure was a request timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
