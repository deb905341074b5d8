use std::time::Duration;

/// Errors raised while loading or validating the agent configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config: failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Config: invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field is present but its value cannot be used.
    #[error("Config: invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failure to turn a batch into a compressed write request.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to serialize write request: {0}")]
    Serialize(#[from] prost::EncodeError),

    #[error("failed to compress write request: {0}")]
    Compress(#[from] snap::Error),
}

/// Outcome of a failed remote write attempt.
///
/// Whether a failure is worth retrying is decided by the variant; only
/// [`DeliveryError::Recoverable`] carries a backoff hint.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The request could not be built (bad URL, encoding failure).
    #[error("failed to build write request: {0}")]
    Build(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Transport failure, 5xx, or an honoured 429.
    #[error("{message}")]
    Recoverable { message: String, retry_after: Duration },

    /// Any other non-2xx response.
    #[error("{0}")]
    Permanent(String),
}

impl DeliveryError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DeliveryError::Recoverable { .. })
    }

    /// Backoff suggested by the server, if the failure is recoverable.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            DeliveryError::Recoverable { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}
