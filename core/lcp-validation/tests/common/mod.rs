#![allow(dead_code)]

use async_trait::async_trait;
use lcp_documents::{
    LicenseDocument, Link, StatusDocument, LICENSE_MEDIA_TYPE, STATUS_MEDIA_TYPE,
};
use lcp_validation::{
    DrmContext, LcpAuthenticating, LcpClient, LcpError, LcpResult, LicenseValidation,
    NetworkService, Observer, PassphrasesService, Sender, ValidatedDocuments, ValidationConfig,
};
use lcp_validation::{CrlService, DeviceService};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASIC_PROFILE: &str = "http://readium.org/lcp/basic-profile";
pub const PROFILE_1_0: &str = "http://readium.org/lcp/profile-1.0";
pub const STATUS_URL: &str = "https://lsd.example.org/status/lic-1";
pub const FRESH_LICENSE_URL: &str = "https://lsd.example.org/licenses/lic-1";

// ── Document builders ────────────────────────────────────────────

pub struct LicenseBuilder {
    id: String,
    profile: String,
    issued: String,
    updated: Option<String>,
    start: Option<String>,
    end: Option<String>,
    status_link: bool,
}

impl LicenseBuilder {
    pub fn new() -> Self {
        Self {
            id: "lic-1".to_string(),
            profile: BASIC_PROFILE.to_string(),
            issued: "2020-01-01T00:00:00Z".to_string(),
            updated: None,
            start: None,
            end: None,
            status_link: true,
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn profile(mut self, profile: &str) -> Self {
        self.profile = profile.to_string();
        self
    }

    pub fn updated(mut self, date: &str) -> Self {
        self.updated = Some(date.to_string());
        self
    }

    pub fn rights(mut self, start: &str, end: &str) -> Self {
        self.start = Some(start.to_string());
        self.end = Some(end.to_string());
        self
    }

    pub fn rights_end(mut self, end: &str) -> Self {
        self.end = Some(end.to_string());
        self
    }

    pub fn without_status_link(mut self) -> Self {
        self.status_link = false;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut links = vec![
            json!({"rel": "hint", "href": "https://provider.example.org/hint", "type": "text/html"}),
            json!({"rel": "publication", "href": "https://provider.example.org/book.epub", "type": "application/epub+zip"}),
        ];
        if self.status_link {
            links.push(json!({"rel": "status", "href": STATUS_URL, "type": STATUS_MEDIA_TYPE}));
        }

        let mut doc = json!({
            "id": self.id,
            "issued": self.issued,
            "provider": "https://provider.example.org",
            "encryption": {
                "profile": self.profile,
                "content_key": {
                    "algorithm": "http://www.w3.org/2001/04/xmlenc#aes256-cbc",
                    "encrypted_value": "dGVzdA=="
                },
                "user_key": {
                    "algorithm": "http://www.w3.org/2001/04/xmlenc#sha256",
                    "text_hint": "The usual one",
                    "key_check": "a2V5"
                }
            },
            "links": links,
            "signature": {
                "algorithm": "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256",
                "certificate": "Y2VydA==",
                "value": "c2ln"
            }
        });
        if let Some(updated) = self.updated {
            doc["updated"] = json!(updated);
        }
        let mut rights = serde_json::Map::new();
        if let Some(start) = self.start {
            rights.insert("start".to_string(), json!(start));
        }
        if let Some(end) = self.end {
            rights.insert("end".to_string(), json!(end));
        }
        if !rights.is_empty() {
            doc["rights"] = Value::Object(rights);
        }
        serde_json::to_vec(&doc).unwrap()
    }

    pub fn parse(self) -> LicenseDocument {
        LicenseDocument::parse(&self.build()).unwrap()
    }
}

pub struct StatusBuilder {
    status: String,
    status_updated: String,
    license_updated: Option<String>,
    register_link: bool,
    register_events: usize,
}

impl StatusBuilder {
    pub fn new() -> Self {
        Self {
            status: "active".to_string(),
            status_updated: "2024-06-01T00:00:00Z".to_string(),
            license_updated: None,
            register_link: false,
            register_events: 0,
        }
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn status_updated(mut self, date: &str) -> Self {
        self.status_updated = date.to_string();
        self
    }

    pub fn license_updated(mut self, date: &str) -> Self {
        self.license_updated = Some(date.to_string());
        self
    }

    pub fn with_register_link(mut self) -> Self {
        self.register_link = true;
        self
    }

    pub fn register_events(mut self, count: usize) -> Self {
        self.register_events = count;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut links = vec![json!({
            "rel": "license",
            "href": FRESH_LICENSE_URL,
            "type": LICENSE_MEDIA_TYPE
        })];
        if self.register_link {
            links.push(json!({
                "rel": "register",
                "href": "https://lsd.example.org/register{?id,name}",
                "templated": true
            }));
        }
        let events: Vec<Value> = (0..self.register_events)
            .map(|i| {
                json!({
                    "type": "register",
                    "name": format!("Device {i}"),
                    "timestamp": "2024-03-01T00:00:00Z",
                    "id": format!("dev-{i}")
                })
            })
            .collect();

        let mut updated = json!({"status": self.status_updated});
        if let Some(license_updated) = self.license_updated {
            updated["license"] = json!(license_updated);
        }

        let doc = json!({
            "id": "st-1",
            "status": self.status,
            "message": "The license status",
            "updated": updated,
            "links": links,
            "events": events
        });
        serde_json::to_vec(&doc).unwrap()
    }

    pub fn parse(self) -> StatusDocument {
        StatusDocument::parse_data(&self.build()).unwrap()
    }
}

// ── Mock collaborators ───────────────────────────────────────────

#[derive(Clone)]
enum MockResponse {
    Data(Vec<u8>),
    Fail,
    Hang,
}

pub struct MockNetwork {
    responses: Mutex<HashMap<String, MockResponse>>,
    pub calls: AtomicUsize,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn respond(&self, url: &str, data: Vec<u8>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), MockResponse::Data(data));
    }

    pub fn fail(&self, url: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), MockResponse::Fail);
    }

    pub fn hang(&self, url: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), MockResponse::Hang);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkService for MockNetwork {
    async fn fetch(&self, url: &str, _timeout: Duration) -> LcpResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.responses.lock().unwrap().get(url).cloned();
        match response {
            Some(MockResponse::Data(data)) => Ok(data),
            Some(MockResponse::Hang) => std::future::pending().await,
            Some(MockResponse::Fail) | None => {
                Err(LcpError::Network(format!("no route to {url}")))
            }
        }
    }
}

pub struct MockCrl {
    fail: AtomicBool,
}

impl MockCrl {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CrlService for MockCrl {
    async fn retrieve(&self) -> LcpResult<Vec<u8>> {
        if self.fail.load(Ordering::SeqCst) {
            Err(LcpError::Network("crl unavailable".to_string()))
        } else {
            Ok(vec![0xCA; 8])
        }
    }
}

pub struct MockDevice {
    fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceService for MockDevice {
    async fn register_license(
        &self,
        _license: &LicenseDocument,
        _link: &Link,
    ) -> LcpResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            Err(LcpError::Network("registration endpoint unreachable".to_string()))
        } else {
            Ok(b"{}".to_vec())
        }
    }
}

pub struct MockPassphrases {
    response: Mutex<Option<String>>,
    pub calls: AtomicUsize,
}

impl MockPassphrases {
    pub fn new(response: Option<&str>) -> Self {
        Self {
            response: Mutex::new(response.map(String::from)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, response: Option<&str>) {
        *self.response.lock().unwrap() = response.map(String::from);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PassphrasesService for MockPassphrases {
    async fn request(
        &self,
        _license: &LicenseDocument,
        _authentication: Option<Arc<dyn LcpAuthenticating>>,
        _allow_user_interaction: bool,
        _sender: Option<Sender>,
    ) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.lock().unwrap().clone()
    }
}

pub struct MockClient {
    production: bool,
    fail_context: AtomicBool,
    pub context_calls: AtomicUsize,
}

impl MockClient {
    pub fn development() -> Self {
        Self {
            production: false,
            fail_context: AtomicBool::new(false),
            context_calls: AtomicUsize::new(0),
        }
    }

    pub fn production() -> Self {
        Self {
            production: true,
            ..Self::development()
        }
    }

    pub fn set_fail_context(&self, fail: bool) {
        self.fail_context.store(fail, Ordering::SeqCst);
    }
}

impl LcpClient for MockClient {
    fn create_context(
        &self,
        _license_json: &str,
        hashed_passphrase: &str,
        _crl: &[u8],
    ) -> LcpResult<DrmContext> {
        self.context_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_context.load(Ordering::SeqCst) {
            return Err(LcpError::LicenseIntegrity("user key check failed".to_string()));
        }
        Ok(DrmContext {
            hashed_passphrase: hashed_passphrase.to_string(),
            encrypted_content_key: "dGVzdA==".to_string(),
            token: "context-token".to_string(),
            profile: "1.0".to_string(),
        })
    }

    fn find_one_valid_passphrase(
        &self,
        _license_json: &str,
        candidates: &[String],
    ) -> Option<String> {
        if self.production {
            candidates.first().cloned()
        } else {
            None
        }
    }
}

// ── Harness ──────────────────────────────────────────────────────

pub struct Harness {
    pub network: Arc<MockNetwork>,
    pub crl: Arc<MockCrl>,
    pub device: Arc<MockDevice>,
    pub passphrases: Arc<MockPassphrases>,
    pub client: Arc<MockClient>,
    validated: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_client(MockClient::development())
    }

    pub fn production() -> Self {
        Self::with_client(MockClient::production())
    }

    fn with_client(client: MockClient) -> Self {
        Self {
            network: Arc::new(MockNetwork::new()),
            crl: Arc::new(MockCrl::new()),
            device: Arc::new(MockDevice::new()),
            passphrases: Arc::new(MockPassphrases::new(Some("hunter2"))),
            client: Arc::new(client),
            validated: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn config(&self) -> ValidationConfig {
        let validated = self.validated.clone();
        ValidationConfig::new(
            self.client.clone(),
            self.network.clone(),
            self.crl.clone(),
            self.device.clone(),
            self.passphrases.clone(),
        )
        .on_license_validated(move |license| {
            validated.lock().unwrap().push(license.id.clone());
        })
    }

    pub async fn engine(&self) -> LicenseValidation {
        LicenseValidation::new(self.config()).await
    }

    /// Ids the `on_license_validated` callback fired for, in order.
    pub fn validated_ids(&self) -> Vec<String> {
        self.validated.lock().unwrap().clone()
    }
}

// ── Observer capture ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Outcome {
    Valid(ValidatedDocuments),
    Failed(LcpError),
    Cancelled,
}

impl Outcome {
    pub fn documents(&self) -> &ValidatedDocuments {
        match self {
            Self::Valid(documents) => documents,
            other => panic!("expected Valid, got {other:?}"),
        }
    }

    pub fn error(&self) -> &LcpError {
        match self {
            Self::Failed(error) => error,
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub fn capture_observer() -> (Arc<Mutex<Vec<Outcome>>>, Observer) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    let observer: Observer = Box::new(move |documents, error| {
        let outcome = match (documents, error) {
            (Some(documents), None) => Outcome::Valid(documents.clone()),
            (None, Some(error)) => Outcome::Failed(error.clone()),
            (None, None) => Outcome::Cancelled,
            (Some(_), Some(_)) => panic!("observer called with both documents and error"),
        };
        sink.lock().unwrap().push(outcome);
    });
    (captured, observer)
}

pub fn outcomes(captured: &Arc<Mutex<Vec<Outcome>>>) -> Vec<Outcome> {
    captured.lock().unwrap().clone()
}
