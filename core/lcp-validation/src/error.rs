//! Error taxonomy for license validation.
//!
//! All variants are `Clone` (causes are carried as strings) so terminal
//! states can own their error and observers can be re-notified from it.

use chrono::{DateTime, Utc};
use lcp_documents::ParseError;
use thiserror::Error;

/// Result type for validation operations.
pub type LcpResult<T> = Result<T, LcpError>;

/// Errors that can end a validation run.
#[derive(Debug, Clone, Error)]
pub enum LcpError {
    /// The license uses an encryption profile outside the supported set.
    #[error("license profile is not supported: {0}")]
    LicenseProfileNotSupported(String),

    /// Transport or timeout failure.
    #[error("network error: {0}")]
    Network(String),

    /// The license parsed and was status-checked, but is not currently
    /// usable.
    #[error(transparent)]
    Status(#[from] LicenseStatusError),

    /// The native crypto layer rejected the license, passphrase or CRL.
    #[error("license integrity check failed: {0}")]
    LicenseIntegrity(String),

    /// The publication container could not be opened.
    #[error("failed to open the publication container")]
    ContainerOpenFailed,

    /// A License or Status Document is malformed.
    #[error("malformed document: {0}")]
    Parsing(String),

    /// The user declined to provide a passphrase.
    #[error("cancelled by the user")]
    CancelledByUser,

    /// Programmer error, e.g. an illegal state transition.
    #[error("internal error: {0}")]
    Runtime(String),
}

impl From<ParseError> for LcpError {
    fn from(error: ParseError) -> Self {
        Self::Parsing(error.to_string())
    }
}

/// Why a parsed license is not currently usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LicenseStatusError {
    /// The rights window has not opened yet.
    #[error("license is not usable before {0}")]
    NotStarted(DateTime<Utc>),

    /// The rights window has closed.
    #[error("license expired on {0}")]
    Expired(DateTime<Utc>),

    /// The user returned the publication.
    #[error("license was returned on {0}")]
    Returned(DateTime<Utc>),

    /// The provider revoked the license. Carries the number of device
    /// registrations recorded against it.
    #[error("license was revoked on {0} ({1} device registrations)")]
    Revoked(DateTime<Utc>, u32),

    /// The provider cancelled the license.
    #[error("license was cancelled on {0}")]
    Cancelled(DateTime<Utc>),
}

/// A localizable rendering of an error: a message id and its structured
/// arguments. Resolution to user-facing text is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    /// Stable identifier of the message template.
    pub id: &'static str,
    /// Positional arguments (dates are RFC 3339).
    pub args: Vec<String>,
    /// Quantity driving plural forms, when relevant.
    pub quantity: Option<u64>,
}

impl UserMessage {
    fn new(id: &'static str) -> Self {
        Self {
            id,
            args: Vec::new(),
            quantity: None,
        }
    }

    fn with_args(id: &'static str, args: Vec<String>) -> Self {
        Self {
            id,
            args,
            quantity: None,
        }
    }
}

impl LcpError {
    /// Maps the error to its localizable message.
    #[must_use]
    pub fn user_message(&self) -> UserMessage {
        match self {
            Self::LicenseProfileNotSupported(profile) => UserMessage::with_args(
                "lcp_error_license_profile_not_supported",
                vec![profile.clone()],
            ),
            Self::Network(cause) => {
                UserMessage::with_args("lcp_error_network", vec![cause.clone()])
            }
            Self::Status(status) => status.user_message(),
            Self::LicenseIntegrity(cause) => {
                UserMessage::with_args("lcp_error_license_integrity", vec![cause.clone()])
            }
            Self::ContainerOpenFailed => UserMessage::new("lcp_error_container_open_failed"),
            Self::Parsing(cause) => {
                UserMessage::with_args("lcp_error_parsing", vec![cause.clone()])
            }
            Self::CancelledByUser => UserMessage::new("lcp_error_cancelled_by_user"),
            Self::Runtime(cause) => {
                UserMessage::with_args("lcp_error_runtime", vec![cause.clone()])
            }
        }
    }
}

impl LicenseStatusError {
    /// Maps the status error to its localizable message.
    #[must_use]
    pub fn user_message(&self) -> UserMessage {
        match self {
            Self::NotStarted(date) => UserMessage::with_args(
                "lcp_error_license_status_not_started",
                vec![date.to_rfc3339()],
            ),
            Self::Expired(date) => UserMessage::with_args(
                "lcp_error_license_status_expired",
                vec![date.to_rfc3339()],
            ),
            Self::Returned(date) => UserMessage::with_args(
                "lcp_error_license_status_returned",
                vec![date.to_rfc3339()],
            ),
            Self::Revoked(date, devices) => UserMessage {
                id: "lcp_error_license_status_revoked",
                args: vec![date.to_rfc3339(), devices.to_string()],
                quantity: Some(u64::from(*devices)),
            },
            Self::Cancelled(date) => UserMessage::with_args(
                "lcp_error_license_status_cancelled",
                vec![date.to_rfc3339()],
            ),
        }
    }
}
