//! The validation engine: drives the state machine, performs the effect
//! associated with each state, and notifies observers on terminal entry.
//!
//! The engine assumes a single execution context. Within one run, events
//! are handled strictly in the order they are raised, and the state at the
//! entry of an effect is the state that selected it. Concurrent `validate`
//! calls on the same engine are not supported; callers must serialize.

use crate::contracts::{
    CrlService, DeviceService, LcpAuthenticating, LcpClient, NetworkService, PassphrasesService,
    Sender,
};
use crate::document::{ValidatedDocuments, ValidationDocument};
use crate::error::{LcpError, LcpResult, LicenseStatusError};
use crate::machine::transition;
use crate::probe;
use crate::state::{Event, State};
use chrono::Utc;
use lcp_documents::{
    license_rel, status_rel, EventType, LicenseDocument, Link, Status, StatusDocument,
    LICENSE_MEDIA_TYPE, STATUS_MEDIA_TYPE,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

/// Hard bound on status and license-refresh fetches. Both are recoverable,
/// so the bound sits well under user-facing operation timeouts.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Encryption profiles the native client can open.
pub const SUPPORTED_PROFILES: &[&str] = &[
    "http://readium.org/lcp/basic-profile",
    "http://readium.org/lcp/profile-1.0",
];

const BASIC_PROFILE: &str = "http://readium.org/lcp/basic-profile";

/// Callback invoked once per run with the license that will be used for the
/// rest of the run, after parse and profile checks and before passphrase
/// retrieval.
pub type OnLicenseValidated = Box<dyn Fn(&LicenseDocument) + Send + Sync>;

/// Terminal-outcome callback. Success passes the documents; failure passes
/// the error; cancellation passes neither.
pub type Observer = Box<dyn Fn(Option<&ValidatedDocuments>, Option<&LcpError>) + Send + Sync>;

/// Whether an observer survives its first notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationPolicy {
    /// Removed after one notification.
    Once,
    /// Persists across notifications.
    Always,
}

/// Collaborators and options for a validation engine.
pub struct ValidationConfig {
    pub client: Arc<dyn LcpClient>,
    pub network: Arc<dyn NetworkService>,
    pub crl: Arc<dyn CrlService>,
    pub device: Arc<dyn DeviceService>,
    pub passphrases: Arc<dyn PassphrasesService>,
    pub authentication: Option<Arc<dyn LcpAuthenticating>>,
    pub allow_user_interaction: bool,
    pub sender: Option<Sender>,
    pub on_license_validated: OnLicenseValidated,
}

impl ValidationConfig {
    /// Creates a configuration with the mandatory collaborators and no
    /// authentication, interaction or callback.
    pub fn new(
        client: Arc<dyn LcpClient>,
        network: Arc<dyn NetworkService>,
        crl: Arc<dyn CrlService>,
        device: Arc<dyn DeviceService>,
        passphrases: Arc<dyn PassphrasesService>,
    ) -> Self {
        Self {
            client,
            network,
            crl,
            device,
            passphrases,
            authentication: None,
            allow_user_interaction: false,
            sender: None,
            on_license_validated: Box::new(|_| {}),
        }
    }

    /// Sets the interactive authentication collaborator.
    pub fn with_authentication(mut self, authentication: Arc<dyn LcpAuthenticating>) -> Self {
        self.authentication = Some(authentication);
        self
    }

    /// Allows the passphrase service to prompt the user.
    pub fn with_user_interaction(mut self, allow: bool) -> Self {
        self.allow_user_interaction = allow;
        self
    }

    /// Sets the opaque caller tag forwarded to the passphrase service.
    pub fn with_sender(mut self, sender: Sender) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Sets the license-validated callback.
    pub fn on_license_validated(
        mut self,
        callback: impl Fn(&LicenseDocument) + Send + Sync + 'static,
    ) -> Self {
        self.on_license_validated = Box::new(callback);
        self
    }
}

struct Inner {
    state: State,
    observers: Vec<(Observer, ObservationPolicy)>,
}

/// A license validation engine, created per publication unlock attempt and
/// discarded after reaching a terminal state.
pub struct LicenseValidation {
    config: ValidationConfig,
    is_production: bool,
    inner: Mutex<Inner>,
}

impl LicenseValidation {
    /// Creates an engine, probing the native client once to detect whether
    /// this is a production build.
    pub async fn new(config: ValidationConfig) -> Self {
        let is_production = probe::is_production_build(config.client.clone()).await;
        debug!(is_production, "license validation engine created");
        Self {
            config,
            is_production,
            inner: Mutex::new(Inner {
                state: State::Start,
                observers: Vec::new(),
            }),
        }
    }

    /// Whether the native client is a production build. Development builds
    /// enforce the basic profile at license parse time.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.is_production
    }

    // ── Façade ───────────────────────────────────────────────────

    /// Validates a raw License or Status Document, notifying `observer`
    /// with the terminal outcome. The observer is attached with the `Once`
    /// policy.
    pub async fn validate(&self, document: ValidationDocument, observer: Observer) {
        self.observe(ObservationPolicy::Once, observer).await;
        let event = match document {
            ValidationDocument::License(data) => Event::RetrievedLicenseData(data),
            ValidationDocument::Status(data) => Event::RetrievedStatusData(data),
        };
        debug!(event = event.name(), "starting validation");
        self.drive(event).await;
    }

    /// Attaches an observer. If the engine is already terminal the observer
    /// is notified synchronously, and only retained under `Always`.
    pub async fn observe(&self, policy: ObservationPolicy, observer: Observer) {
        let mut inner = self.inner.lock().await;
        let Inner { state, observers } = &mut *inner;
        if let Some((documents, error)) = terminal_outcome(state) {
            observer(documents, error);
            if policy == ObservationPolicy::Always {
                observers.push((observer, policy));
            }
        } else {
            observers.push((observer, policy));
        }
    }

    // ── Drive loop ───────────────────────────────────────────────

    async fn drive(&self, event: Event) {
        let mut pending = Some(event);
        while let Some(event) = pending.take() {
            let state = {
                let mut inner = self.inner.lock().await;
                if inner.state.is_terminal() {
                    trace!(event = event.name(), "event ignored after terminal state");
                    return;
                }
                let current = std::mem::replace(&mut inner.state, State::Start);
                let next = transition(current, event);
                inner.state = next.clone();
                next
            };
            debug!(state = state.name(), "validation advanced");
            if state.is_terminal() {
                self.notify_terminal().await;
                return;
            }
            pending = self.effect(state).await;
        }
    }

    async fn notify_terminal(&self) {
        let mut inner = self.inner.lock().await;
        let Inner { state, observers } = &mut *inner;
        let Some((documents, error)) = terminal_outcome(state) else {
            return;
        };
        match &*state {
            State::Valid { documents } => {
                info!(license = %documents.license().id, "license validated");
            }
            State::Failure { error } => info!(%error, "license validation failed"),
            State::Cancelled => info!("license validation cancelled by the user"),
            _ => {}
        }
        for (observer, _) in observers.iter() {
            observer(documents, error);
        }
        observers.retain(|(_, policy)| *policy == ObservationPolicy::Always);
    }

    // ── Side effects, keyed on the state just entered ────────────

    async fn effect(&self, state: State) -> Option<Event> {
        match state {
            State::Start
            | State::Valid { .. }
            | State::Failure { .. }
            | State::Cancelled => None,
            State::ValidateLicense { data, .. } => Some(self.validate_license(&data)),
            State::FetchStatus { license } => Some(self.fetch_status(&license).await),
            State::ValidateStatus { data, .. } => Some(self.validate_status(&data)),
            State::FetchLicense { status, .. } => Some(self.fetch_license(&status).await),
            State::CheckLicenseStatus { license, status } => {
                Some(self.check_license_status(&license, status.as_ref()))
            }
            State::RetrievePassphrase { license, .. } => {
                Some(self.retrieve_passphrase(&license).await)
            }
            State::ValidateIntegrity {
                license,
                passphrase,
                ..
            } => Some(self.validate_integrity(&license, &passphrase).await),
            State::RegisterDevice { documents, link } => {
                Some(self.register_device(documents.license(), &link).await)
            }
        }
    }

    fn validate_license(&self, data: &[u8]) -> Event {
        let license = match LicenseDocument::parse(data) {
            Ok(license) => license,
            Err(error) => return Event::Failed(error.into()),
        };
        // Development builds only ship the basic-profile certificates, so
        // anything else is rejected up front. Production defers the check
        // to integrity validation.
        if !self.is_production && license.encryption.profile != BASIC_PROFILE {
            return Event::Failed(LcpError::LicenseProfileNotSupported(
                license.encryption.profile.clone(),
            ));
        }
        Event::ValidatedLicense(license)
    }

    async fn fetch_status(&self, license: &LicenseDocument) -> Event {
        let Some(url) = license.url(license_rel::STATUS, Some(STATUS_MEDIA_TYPE)) else {
            return Event::Failed(LcpError::Network("license has no status link".to_string()));
        };
        match self.fetch(&url).await {
            Ok(data) => Event::RetrievedStatusData(data),
            Err(error) => Event::Failed(error),
        }
    }

    fn validate_status(&self, data: &[u8]) -> Event {
        match StatusDocument::parse_data(data) {
            Ok(status) => Event::ValidatedStatus(status),
            Err(error) => Event::Failed(error.into()),
        }
    }

    async fn fetch_license(&self, status: &StatusDocument) -> Event {
        let Some(url) = status.url(status_rel::LICENSE, Some(LICENSE_MEDIA_TYPE)) else {
            return Event::Failed(LcpError::Network(
                "status document has no license link".to_string(),
            ));
        };
        match self.fetch(&url).await {
            Ok(data) => Event::RetrievedLicenseData(data),
            Err(error) => Event::Failed(error),
        }
    }

    fn check_license_status(
        &self,
        license: &LicenseDocument,
        status: Option<&StatusDocument>,
    ) -> Event {
        // Every post-parse path crosses this state exactly once, carrying
        // the license used for the rest of the run.
        (self.config.on_license_validated)(license);

        let now = Utc::now();
        let start = license.rights.start.unwrap_or(now);
        let end = license.rights.end.unwrap_or(now);
        let date_error = if start > now {
            Some(LicenseStatusError::NotStarted(start))
        } else if now > end {
            Some(LicenseStatusError::Expired(end))
        } else {
            None
        };

        // A terminated license never unlocks, rights window or not. The
        // other statuses defer to the window.
        let error = match status {
            Some(status) if status.status.is_terminated() => match status.status {
                Status::Returned => Some(LicenseStatusError::Returned(status.status_updated())),
                Status::Revoked => {
                    let registrations = status.events(EventType::Register).count() as u32;
                    Some(LicenseStatusError::Revoked(
                        status.status_updated(),
                        registrations,
                    ))
                }
                Status::Cancelled => Some(LicenseStatusError::Cancelled(status.status_updated())),
                Status::Ready | Status::Active | Status::Expired => date_error,
            },
            _ => date_error,
        };
        Event::CheckedLicenseStatus(error)
    }

    async fn retrieve_passphrase(&self, license: &LicenseDocument) -> Event {
        let passphrase = self
            .config
            .passphrases
            .request(
                license,
                self.config.authentication.clone(),
                self.config.allow_user_interaction,
                self.config.sender.clone(),
            )
            .await;
        match passphrase {
            Some(passphrase) if !passphrase.is_empty() => Event::RetrievedPassphrase(passphrase),
            _ => Event::Cancelled,
        }
    }

    async fn validate_integrity(&self, license: &LicenseDocument, passphrase: &str) -> Event {
        let profile = &license.encryption.profile;
        if !SUPPORTED_PROFILES.contains(&profile.as_str()) {
            return Event::Failed(LcpError::LicenseProfileNotSupported(profile.clone()));
        }
        let crl = match self.config.crl.retrieve().await {
            Ok(crl) => crl,
            Err(error) => return Event::Failed(error),
        };

        let client = self.config.client.clone();
        let raw_json = license.raw_json().to_string();
        let passphrase = passphrase.to_string();
        let context = tokio::task::spawn_blocking(move || {
            client.create_context(&raw_json, &passphrase, &crl)
        })
        .await;

        match context {
            Ok(Ok(context)) => Event::ValidatedIntegrity(context),
            Ok(Err(error)) => Event::Failed(error),
            Err(error) => Event::Failed(LcpError::Runtime(format!(
                "integrity check did not complete: {error}"
            ))),
        }
    }

    async fn register_device(&self, license: &LicenseDocument, link: &Link) -> Event {
        match self.config.device.register_license(license, link).await {
            Ok(data) => Event::RegisteredDevice(Some(data)),
            Err(error) => {
                // Device usage is recorded best-effort; the run still succeeds.
                warn!(%error, "device registration failed");
                Event::RegisteredDevice(None)
            }
        }
    }

    /// Fetches with the engine-enforced timeout, regardless of how the
    /// network collaborator honors the bound it was handed.
    async fn fetch(&self, url: &str) -> LcpResult<Vec<u8>> {
        match tokio::time::timeout(FETCH_TIMEOUT, self.config.network.fetch(url, FETCH_TIMEOUT))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(LcpError::Network(format!("fetching {url} timed out"))),
        }
    }
}

fn terminal_outcome(state: &State) -> Option<(Option<&ValidatedDocuments>, Option<&LcpError>)> {
    match state {
        State::Valid { documents } => Some((Some(documents), None)),
        State::Failure { error } => Some((None, Some(error))),
        State::Cancelled => Some((None, None)),
        _ => None,
    }
}
