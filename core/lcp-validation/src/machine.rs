//! The transition table: a pure, total mapping from `(state, event)` to the
//! next state.
//!
//! No I/O happens here; effects live in the engine and are keyed on the
//! state returned by this function. Terminal states absorb every event
//! unchanged. An illegal pair on a non-terminal state collapses to the
//! `Failure` terminal with a runtime error.

use crate::document::ValidatedDocuments;
use crate::error::LcpError;
use crate::state::{Event, State};
use lcp_documents::{status_rel, LicenseDocument, StatusDocument};
use tracing::error;

/// Advances the workflow by one step.
#[must_use]
pub fn transition(state: State, event: Event) -> State {
    if state.is_terminal() {
        return state;
    }

    match (state, event) {
        (State::Start, Event::RetrievedLicenseData(data)) => {
            State::ValidateLicense { data, status: None }
        }
        (State::Start, Event::RetrievedStatusData(data)) => State::ValidateStatus {
            license: None,
            data,
        },

        (State::ValidateLicense { status: None, .. }, Event::ValidatedLicense(license)) => {
            State::FetchStatus { license }
        }
        // Refresh pass: the status is already in hand, skip the second fetch.
        (
            State::ValidateLicense {
                status: Some(status),
                ..
            },
            Event::ValidatedLicense(license),
        ) => State::CheckLicenseStatus {
            license,
            status: Some(status),
        },

        (State::FetchStatus { license }, Event::RetrievedStatusData(data)) => {
            State::ValidateStatus {
                license: Some(license),
                data,
            }
        }
        // The status document is optional: a failed fetch falls through to
        // the rights-window check with the license alone.
        (State::FetchStatus { license }, Event::Failed(_)) => State::CheckLicenseStatus {
            license,
            status: None,
        },

        (State::ValidateStatus { license, .. }, Event::ValidatedStatus(status)) => {
            if should_fetch_license(license.as_ref(), &status) {
                State::FetchLicense { license, status }
            } else {
                // should_fetch_license is always true without a license
                match license {
                    Some(license) => State::CheckLicenseStatus {
                        license,
                        status: Some(status),
                    },
                    None => illegal("ValidateStatus", "ValidatedStatus"),
                }
            }
        }

        (State::FetchLicense { status, .. }, Event::RetrievedLicenseData(data)) => {
            State::ValidateLicense {
                data,
                status: Some(status),
            }
        }
        // A failed refresh is fatal only when no license was ever parsed;
        // otherwise the run proceeds with the one in hand.
        (
            State::FetchLicense {
                license: Some(license),
                status,
            },
            Event::Failed(_),
        ) => State::CheckLicenseStatus {
            license,
            status: Some(status),
        },
        (
            State::FetchLicense { license: None, .. },
            Event::Failed(error),
        ) => State::Failure { error },

        (State::CheckLicenseStatus { license, status }, Event::CheckedLicenseStatus(None)) => {
            State::RetrievePassphrase { license, status }
        }
        (
            State::CheckLicenseStatus { license, status },
            Event::CheckedLicenseStatus(Some(error)),
        ) => State::Valid {
            documents: ValidatedDocuments::rejected(license, error, status),
        },

        (State::RetrievePassphrase { license, status }, Event::RetrievedPassphrase(passphrase)) => {
            State::ValidateIntegrity {
                license,
                status,
                passphrase,
            }
        }
        (State::RetrievePassphrase { .. }, Event::Cancelled) => State::Cancelled,

        (
            State::ValidateIntegrity {
                license, status, ..
            },
            Event::ValidatedIntegrity(context),
        ) => {
            let register_link = status
                .as_ref()
                .and_then(|s| s.link(status_rel::REGISTER))
                .cloned();
            let documents = ValidatedDocuments::granted(license, context, status);
            match register_link {
                Some(link) => State::RegisterDevice { documents, link },
                None => State::Valid { documents },
            }
        }

        (State::RegisterDevice { documents, .. }, Event::RegisteredDevice(_)) => {
            State::Valid { documents }
        }

        (_, Event::Failed(error)) => State::Failure { error },

        (state, event) => illegal(state.name(), event.name()),
    }
}

/// The server holds a fresher license when the run has none yet, or when
/// the status document advertises a later license update.
fn should_fetch_license(license: Option<&LicenseDocument>, status: &StatusDocument) -> bool {
    match (license, status.license_updated()) {
        (None, _) => true,
        (Some(license), Some(updated)) => license.updated() < updated,
        (Some(_), None) => false,
    }
}

fn illegal(state: &'static str, event: &'static str) -> State {
    error!(state, event, "illegal state transition");
    State::Failure {
        error: LcpError::Runtime(format!("illegal transition: {event} in state {state}")),
    }
}
