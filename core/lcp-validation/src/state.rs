//! States and events of the validation workflow.
//!
//! States own the documents gathered so far; the transition table in
//! `machine` is the only place they change. `ValidateLicense` carries the
//! status document once one has been fetched, which is what lets a
//! status-driven license refresh skip the second status round-trip.

use crate::contracts::DrmContext;
use crate::document::ValidatedDocuments;
use crate::error::{LcpError, LicenseStatusError};
use lcp_documents::{LicenseDocument, Link, StatusDocument};

/// A state of the validation workflow.
#[derive(Debug, Clone)]
pub enum State {
    /// Initial state, no work done.
    Start,
    /// Raw license bytes awaiting parse. `status` is set when the bytes
    /// came from a status-driven refresh.
    ValidateLicense {
        data: Vec<u8>,
        status: Option<StatusDocument>,
    },
    /// License parsed; Status Document fetch in flight.
    FetchStatus { license: LicenseDocument },
    /// Raw status bytes awaiting parse. `license` is absent when the run
    /// was started from a Status Document.
    ValidateStatus {
        license: Option<LicenseDocument>,
        data: Vec<u8>,
    },
    /// The server holds a fresher license; fetch in flight.
    FetchLicense {
        license: Option<LicenseDocument>,
        status: StatusDocument,
    },
    /// Reconciling the rights window with the server-side status.
    CheckLicenseStatus {
        license: LicenseDocument,
        status: Option<StatusDocument>,
    },
    /// Asking the passphrase service (possibly the user).
    RetrievePassphrase {
        license: LicenseDocument,
        status: Option<StatusDocument>,
    },
    /// Native crypto building the DRM context.
    ValidateIntegrity {
        license: LicenseDocument,
        status: Option<StatusDocument>,
        passphrase: String,
    },
    /// Best-effort device registration against the status server.
    RegisterDevice {
        documents: ValidatedDocuments,
        link: Link,
    },
    /// Terminal success.
    Valid { documents: ValidatedDocuments },
    /// Terminal failure.
    Failure { error: LcpError },
    /// Terminal cancellation (user declined the passphrase).
    Cancelled,
}

impl State {
    /// Returns true for the three terminal states.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Valid { .. } | Self::Failure { .. } | Self::Cancelled)
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::ValidateLicense { .. } => "ValidateLicense",
            Self::FetchStatus { .. } => "FetchStatus",
            Self::ValidateStatus { .. } => "ValidateStatus",
            Self::FetchLicense { .. } => "FetchLicense",
            Self::CheckLicenseStatus { .. } => "CheckLicenseStatus",
            Self::RetrievePassphrase { .. } => "RetrievePassphrase",
            Self::ValidateIntegrity { .. } => "ValidateIntegrity",
            Self::RegisterDevice { .. } => "RegisterDevice",
            Self::Valid { .. } => "Valid",
            Self::Failure { .. } => "Failure",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// An event driving the workflow forward.
#[derive(Debug, Clone)]
pub enum Event {
    /// Raw license bytes are available.
    RetrievedLicenseData(Vec<u8>),
    /// The license parsed (and passed the parse-time profile check).
    ValidatedLicense(LicenseDocument),
    /// Raw status bytes are available.
    RetrievedStatusData(Vec<u8>),
    /// The status document parsed.
    ValidatedStatus(StatusDocument),
    /// Rights window and server status reconciled; `None` means usable.
    CheckedLicenseStatus(Option<LicenseStatusError>),
    /// The passphrase service produced a (hashed) passphrase.
    RetrievedPassphrase(String),
    /// The native crypto accepted the license.
    ValidatedIntegrity(DrmContext),
    /// Device registration finished; `None` when it failed (best-effort).
    RegisteredDevice(Option<Vec<u8>>),
    /// An effect failed.
    Failed(LcpError),
    /// The user declined the passphrase.
    Cancelled,
}

impl Event {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::RetrievedLicenseData(_) => "RetrievedLicenseData",
            Self::ValidatedLicense(_) => "ValidatedLicense",
            Self::RetrievedStatusData(_) => "RetrievedStatusData",
            Self::ValidatedStatus(_) => "ValidatedStatus",
            Self::CheckedLicenseStatus(_) => "CheckedLicenseStatus",
            Self::RetrievedPassphrase(_) => "RetrievedPassphrase",
            Self::ValidatedIntegrity(_) => "ValidatedIntegrity",
            Self::RegisteredDevice(_) => "RegisteredDevice",
            Self::Failed(_) => "Failed",
            Self::Cancelled => "Cancelled",
        }
    }
}
