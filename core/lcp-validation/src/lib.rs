//! License validation engine for Readium LCP clients.
//!
//! Before a protected publication can be decrypted, its License Document
//! must be validated, reconciled with the server-side Status Document,
//! unlocked with the user passphrase, and bound to a DRM context by the
//! native crypto layer. This crate coordinates those steps as a finite
//! state machine with a small observable surface.
//!
//! # Architecture
//!
//! - **Contracts**: networking, CRL retrieval, device registration,
//!   passphrase acquisition and the native library are injected behind
//!   traits; the engine performs no I/O of its own.
//! - **Transition table**: a pure, total function from `(state, event)` to
//!   the next state. All legal moves live in one exhaustive match.
//! - **Engine**: performs the side effect associated with each state
//!   (parse, fetch, prompt, crypto) and feeds the resulting event back into
//!   the table until a terminal state is reached.
//! - **Observers**: callbacks notified with the terminal outcome, attached
//!   one-shot or durable.
//!
//! # Validation flow
//!
//! 1. A raw License (or Status) Document enters through [`LicenseValidation::validate`].
//! 2. The license is parsed; its Status Document is fetched when reachable
//!    (failures here are tolerated, the status is optional).
//! 3. If the server advertises a fresher license, it is fetched and takes
//!    over the run.
//! 4. The rights window and server status are reconciled; a license that is
//!    expired, returned, revoked or cancelled completes the run with a
//!    status error instead of a DRM context.
//! 5. Otherwise the passphrase is acquired (possibly interactively), the
//!    native library checks integrity and builds the DRM context, and the
//!    device is registered with the status server best-effort.

mod contracts;
mod document;
mod engine;
mod error;
mod machine;
mod probe;
mod state;

pub use contracts::{
    hash_passphrase, AuthenticationReason, CrlService, DeviceService, DrmContext,
    LcpAuthenticating, LcpClient, NetworkService, PassphrasesService, Sender,
};
pub use document::{ValidatedDocuments, ValidationDocument};
pub use engine::{
    LicenseValidation, ObservationPolicy, Observer, OnLicenseValidated, ValidationConfig,
    FETCH_TIMEOUT, SUPPORTED_PROFILES,
};
pub use error::{LcpError, LcpResult, LicenseStatusError, UserMessage};
pub use machine::transition;
pub use state::{Event, State};
