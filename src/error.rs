use thiserror::Error;

/// Failure conditions that callers need to tell apart.
///
/// Everything else flows through `anyhow::Error` with context attached at
/// the call site.
#[derive(Debug, Error)]
pub enum OddsError {
    /// The requested sport has no mapping for the configured providers.
    #[error("unsupported sport: {0}")]
    UnsupportedSport(String),

    /// A decimal price at or below 1.0 cannot be converted to American odds.
    #[error("malformed decimal price: {0}")]
    BadPrice(f64),

    /// A provider call failed (network error, non-2xx, exhausted retries).
    #[error("{provider} failed: {message}")]
    Provider { provider: String, message: String },

    /// A provider payload could not be parsed into the raw schema.
    #[error("failed to parse provider payload: {0}")]
    Parse(String),
}
