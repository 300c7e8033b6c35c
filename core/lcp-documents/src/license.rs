//! License Document parsing.
//!
//! The License Document is the signed `.lcpl` JSON accompanying a protected
//! publication. The original bytes are kept verbatim because the signature
//! (and therefore the native integrity check) covers the raw JSON, not a
//! re-serialization.

use crate::error::{ParseError, ParseResult};
use crate::link::{Link, Links};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Link relations defined for the License Document.
pub mod rel {
    /// Where the user can recover their passphrase.
    pub const HINT: &str = "hint";
    /// The protected publication itself.
    pub const PUBLICATION: &str = "publication";
    /// The Status Document for this license.
    pub const STATUS: &str = "status";
    /// Canonical location of this license.
    pub const SELF: &str = "self";
}

/// The `encryption` object of a License Document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encryption {
    /// URI of the LCP profile this license was issued under.
    pub profile: String,
    pub content_key: ContentKey,
    pub user_key: UserKey,
}

/// The content key, encrypted with the user key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentKey {
    pub algorithm: String,
    pub encrypted_value: String,
}

impl ContentKey {
    /// Decodes the base64 encrypted value.
    pub fn decode_value(&self) -> ParseResult<Vec<u8>> {
        BASE64
            .decode(&self.encrypted_value)
            .map_err(|e| ParseError::InvalidBase64 {
                field: "encryption/content_key/encrypted_value",
                reason: e.to_string(),
            })
    }
}

/// The user key derivation parameters and verification material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserKey {
    pub algorithm: String,
    /// Hint shown to the user when prompting for the passphrase.
    pub text_hint: String,
    /// The license id encrypted with the user key, used to verify a
    /// candidate passphrase without touching the publication.
    pub key_check: String,
}

impl UserKey {
    /// Decodes the base64 key check.
    pub fn decode_key_check(&self) -> ParseResult<Vec<u8>> {
        BASE64
            .decode(&self.key_check)
            .map_err(|e| ParseError::InvalidBase64 {
                field: "encryption/user_key/key_check",
                reason: e.to_string(),
            })
    }
}

/// The rights granted by the license. All fields are optional; an absent
/// field means the right is unrestricted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rights {
    /// Date the license becomes usable.
    pub start: Option<DateTime<Utc>>,
    /// Date the license expires.
    pub end: Option<DateTime<Utc>>,
    /// Maximum number of printable pages.
    pub print: Option<i64>,
    /// Maximum number of copyable characters.
    pub copy: Option<i64>,
}

/// Information about the user the license was issued to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    /// Names of the fields above that are encrypted with the user key.
    #[serde(default)]
    pub encrypted: Vec<String>,
}

/// The provider signature over the license.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub algorithm: String,
    pub certificate: String,
    pub value: String,
}

#[derive(Deserialize)]
struct RawLicense {
    id: String,
    issued: DateTime<Utc>,
    updated: Option<DateTime<Utc>>,
    provider: String,
    encryption: Encryption,
    links: Vec<Link>,
    #[serde(default)]
    rights: Rights,
    user: Option<User>,
    signature: Signature,
}

/// A parsed License Document. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct LicenseDocument {
    raw: String,
    pub id: String,
    pub issued: DateTime<Utc>,
    updated: Option<DateTime<Utc>>,
    pub provider: String,
    pub encryption: Encryption,
    pub links: Links,
    pub rights: Rights,
    pub user: Option<User>,
    pub signature: Signature,
}

impl LicenseDocument {
    /// Parses a License Document from its raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, a required field is
    /// missing, or a mandatory link (`hint`, `publication`) is absent.
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        let raw = std::str::from_utf8(data)
            .map_err(|_| ParseError::InvalidUtf8)?
            .to_string();
        let doc: RawLicense = serde_json::from_str(&raw)?;

        let links = Links::new(doc.links);
        if links.find(rel::HINT).is_none() {
            return Err(ParseError::MissingLink(rel::HINT));
        }
        if links.find(rel::PUBLICATION).is_none() {
            return Err(ParseError::MissingLink(rel::PUBLICATION));
        }

        Ok(Self {
            raw,
            id: doc.id,
            issued: doc.issued,
            updated: doc.updated,
            provider: doc.provider,
            encryption: doc.encryption,
            links,
            rights: doc.rights,
            user: doc.user,
            signature: doc.signature,
        })
    }

    /// The original JSON bytes the license was parsed from.
    #[must_use]
    pub fn raw_json(&self) -> &str {
        &self.raw
    }

    /// Last update date, falling back to the issue date.
    #[must_use]
    pub fn updated(&self) -> DateTime<Utc> {
        self.updated.unwrap_or(self.issued)
    }

    /// Resolves a link for `rel`, preferring `preferred_type`.
    #[must_use]
    pub fn url(&self, rel: &str, preferred_type: Option<&str>) -> Option<String> {
        self.links.url(rel, preferred_type)
    }
}
