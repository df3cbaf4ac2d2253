//! FX engine error types.

use thiserror::Error;

/// Status reported when the upstream did not provide one.
pub const GENERIC_UPSTREAM_STATUS: u16 = 500;

/// Errors that can occur in the FX engine.
#[derive(Debug, Error)]
pub enum FxError {
    /// Amount is missing, non-numeric, not finite or not positive.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Currency code is missing or empty.
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Rate could not be read as a positive finite number.
    ///
    /// Internal: the HTTP provider reports it as an upstream failure.
    #[error("Invalid rate: {0}")]
    InvalidRate(String),

    /// Live rate fetch failed.
    #[error("Rate provider unavailable: {message}")]
    UpstreamUnavailable {
        /// HTTP status returned by the provider, when one was received.
        status: Option<u16>,
        message: String,
    },

    /// Generative commentary could not be produced.
    ///
    /// Internal: the analyst answers it with templated commentary.
    #[error("Commentary unavailable: {0}")]
    CommentaryUnavailable(String),
}

impl FxError {
    /// Build an upstream failure.
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        FxError::UpstreamUnavailable {
            status,
            message: message.into(),
        }
    }

    /// Upstream status, or the generic failure status when unknown.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            FxError::UpstreamUnavailable { status, .. } => {
                Some(status.unwrap_or(GENERIC_UPSTREAM_STATUS))
            }
            _ => None,
        }
    }

    /// Get the machine-readable error code.
    ///
    /// Callers of the conversion API only see `INV-AMT`, `INV-CUR` and
    /// `SRV-<status>`. `INV-RATE` and `SRV-COMMENTARY` label internal
    /// failures in logs.
    pub fn error_code(&self) -> String {
        match self {
            FxError::InvalidAmount(_) => "INV-AMT".to_string(),
            FxError::InvalidCurrency(_) => "INV-CUR".to_string(),
            FxError::InvalidRate(_) => "INV-RATE".to_string(),
            FxError::UpstreamUnavailable { status, .. } => {
                format!("SRV-{}", status.unwrap_or(GENERIC_UPSTREAM_STATUS))
            }
            FxError::CommentaryUnavailable(_) => "SRV-COMMENTARY".to_string(),
        }
    }

    /// HTTP status a caller should see for this error.
    ///
    /// Upstream 5xx statuses are passed through; any other upstream status
    /// is reported as 502.
    pub fn http_status(&self) -> u16 {
        match self {
            FxError::InvalidAmount(_) | FxError::InvalidCurrency(_) => 400,
            FxError::InvalidRate(_) => 502,
            FxError::UpstreamUnavailable { .. } => match self.upstream_status() {
                Some(status) if (500..600).contains(&status) => status,
                _ => 502,
            },
            FxError::CommentaryUnavailable(_) => 500,
        }
    }

    /// Check if the caller is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, FxError::InvalidAmount(_) | FxError::InvalidCurrency(_))
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
