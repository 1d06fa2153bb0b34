use thiserror::Error;

/// Transport-layer error type for the `serialmfg-api` crate.
///
/// Covers HTTP transport failures and non-2xx API responses. The
/// `serialmfg` crate maps these into domain-level errors -- consumers of
/// the high-level client never match on these directly.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// API key rejected by the server (HTTP 401).
    #[error("Invalid API key")]
    InvalidApiKey,

    /// API key contains bytes that cannot form an HTTP header.
    #[error("API key is not a valid header value: {message}")]
    InvalidApiKeyValue { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Local file could not be read for upload.
    #[error("File read error: {0}")]
    Io(#[from] std::io::Error),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-2xx response from the Serial API, carrying the server's
    /// error text verbatim.
    #[error("Serial API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the server rejected a create as a duplicate.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { status: 409, .. })
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }
}
