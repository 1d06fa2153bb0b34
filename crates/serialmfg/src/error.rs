// ── User-facing error types ──
//
// Domain errors for the serialmfg crate. Callers never see raw HTTP
// failures -- the `From<serialmfg_api::Error>` impl translates the
// transport layer into the `Api` variant, and everything the library
// can classify gets its own variant.

use serialmfg_api::types::DataType;
use thiserror::Error;

/// One data item that failed during a flush.
///
/// Carried inside [`Error::Submission`] so a caller can see exactly
/// which dataset/value combinations need re-submission.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub dataset_name: String,
    pub data_type: DataType,
    pub message: String,
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} \"{}\": {}",
            self.data_type, self.dataset_name, self.message
        )
    }
}

/// Unified error type for the serialmfg crate.
#[derive(Debug, Error)]
pub enum Error {
    // ── Local precondition violations (no request was made) ─────────
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Catalog resolution ───────────────────────────────────────────
    #[error("Component not found: {name}")]
    ComponentNotFound { name: String },

    #[error("Component instance not found: {identifier}")]
    ComponentInstanceNotFound { identifier: String },

    /// Duplicate identifiers across the account are a data-integrity
    /// fault -- surfaced, never silently resolved.
    #[error("{count} component instances share identifier {identifier:?}")]
    AmbiguousIdentifier { identifier: String, count: usize },

    #[error("Dataset not found: {name} ({data_type})")]
    DatasetNotFound { name: String, data_type: DataType },

    #[error("Part number not found: {part_number}")]
    PartNumberNotFound { part_number: String },

    #[error("Multiple part numbers match {part_number:?}; pass a component id to disambiguate")]
    AmbiguousPartNumber { part_number: String },

    #[error("No operator matches the given filter")]
    OperatorNotFound,

    #[error("{count} operators match the given filter")]
    AmbiguousOperator { count: usize },

    #[error("Process entry not found: {id}")]
    ProcessEntryNotFound { id: String },

    /// Both legs of a get-or-create lost to a concurrent creator.
    #[error("Lost create race for {kind} {name:?}")]
    RaceLost { kind: &'static str, name: String },

    // ── Entry pipeline ───────────────────────────────────────────────
    /// The entry was already marked complete; re-submitting has no
    /// defined idempotence guarantee, so it is rejected outright.
    #[error("Process entry {id} is already complete")]
    AlreadyCompleted { id: String },

    /// One or more queued data items failed during submit. The failed
    /// items stay queued and are re-attempted by the next submit.
    #[error("Data submission failed for {} item(s)", failures.len())]
    Submission { failures: Vec<ItemFailure> },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if the server answered).
        status: Option<u16>,
    },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<serialmfg_api::Error> for Error {
    fn from(err: serialmfg_api::Error) -> Self {
        match err {
            serialmfg_api::Error::Api { status, message } => Self::Api {
                message,
                status: Some(status),
            },
            serialmfg_api::Error::InvalidApiKey => Self::Api {
                message: "Invalid API key".into(),
                status: Some(401),
            },
            other => Self::Api {
                message: other.to_string(),
                status: None,
            },
        }
    }
}
