//! Collaborator contracts consumed by the validation engine.
//!
//! The engine performs no I/O and no cryptography itself: networking, CRL
//! retrieval, device registration, passphrase acquisition and the native
//! LCP library are all injected behind these traits. Implementations are
//! treated as thread-safe black boxes; the engine never invokes two of them
//! concurrently.

use crate::error::LcpResult;
use async_trait::async_trait;
use lcp_documents::{LicenseDocument, Link};
use sha2::{Digest, Sha256};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

/// Opaque tag identifying the caller, forwarded untouched to the
/// passphrase service so a UI can route its prompt.
pub type Sender = Arc<dyn Any + Send + Sync>;

/// HTTP transport.
#[async_trait]
pub trait NetworkService: Send + Sync {
    /// Fetches `url` and returns the response body.
    ///
    /// `timeout` is the engine's bound for the request. Implementations
    /// should give up by then; the engine enforces the bound regardless.
    async fn fetch(&self, url: &str, timeout: Duration) -> LcpResult<Vec<u8>>;
}

/// Certificate Revocation List retrieval.
#[async_trait]
pub trait CrlService: Send + Sync {
    /// Returns the current CRL blob for the native crypto layer.
    async fn retrieve(&self) -> LcpResult<Vec<u8>>;
}

/// Device registration against the status server.
#[async_trait]
pub trait DeviceService: Send + Sync {
    /// Registers this device with the server behind `link` and returns the
    /// response body.
    async fn register_license(
        &self,
        license: &LicenseDocument,
        link: &Link,
    ) -> LcpResult<Vec<u8>>;
}

/// Why a passphrase is being requested from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationReason {
    /// No stored passphrase matched the license.
    PassphraseNotFound,
    /// A stored or entered passphrase was rejected by the crypto layer.
    InvalidPassphrase,
}

/// Interactive passphrase prompt, typically backed by a UI.
#[async_trait]
pub trait LcpAuthenticating: Send + Sync {
    /// Asks the user for the passphrase unlocking `license`. Returns `None`
    /// if the user declined or interaction is not possible.
    async fn retrieve_passphrase(
        &self,
        license: &LicenseDocument,
        reason: AuthenticationReason,
        allow_user_interaction: bool,
        sender: Option<Sender>,
    ) -> Option<String>;
}

/// Passphrase resolution: stored passphrases first, then the interactive
/// prompt when allowed.
#[async_trait]
pub trait PassphrasesService: Send + Sync {
    /// Returns the hashed passphrase unlocking `license`, or `None` when
    /// the user declined. See [`hash_passphrase`] for the expected digest.
    async fn request(
        &self,
        license: &LicenseDocument,
        authentication: Option<Arc<dyn LcpAuthenticating>>,
        allow_user_interaction: bool,
        sender: Option<Sender>,
    ) -> Option<String>;
}

/// Decryption material produced by the native LCP library. Opaque to the
/// engine; downstream decryption consumes it as-is.
#[derive(Debug, Clone)]
pub struct DrmContext {
    pub hashed_passphrase: String,
    pub encrypted_content_key: String,
    pub token: String,
    pub profile: String,
}

/// The native LCP library. Calls block, so the engine runs them on the
/// blocking thread pool.
pub trait LcpClient: Send + Sync {
    /// Builds a DRM context from the raw license JSON, a hashed passphrase
    /// and the current CRL.
    fn create_context(
        &self,
        license_json: &str,
        hashed_passphrase: &str,
        crl: &[u8],
    ) -> LcpResult<DrmContext>;

    /// Returns the first candidate passphrase accepted for the license,
    /// if any.
    fn find_one_valid_passphrase(&self, license_json: &str, candidates: &[String])
        -> Option<String>;
}

/// Canonical digest turning a user-entered passphrase into the key material
/// the native library expects: lowercase hex of SHA-256 over the UTF-8
/// passphrase.
#[must_use]
pub fn hash_passphrase(passphrase: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(passphrase.as_bytes());
    hex::encode(hasher.finalize())
}
