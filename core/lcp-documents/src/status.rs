//! Status Document parsing.
//!
//! The Status Document is hosted by the license server and describes the
//! current lifecycle of a license: whether it is still usable, when it was
//! last updated, and which device events (registrations, returns, ...) have
//! been recorded against it.

use crate::error::{ParseError, ParseResult};
use crate::link::{Link, Links};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Link relations defined for the Status Document.
pub mod rel {
    /// The up-to-date License Document.
    pub const LICENSE: &str = "license";
    /// Device registration endpoint.
    pub const REGISTER: &str = "register";
    /// Early-return endpoint.
    pub const RETURN: &str = "return";
    /// Loan-extension endpoint.
    pub const RENEW: &str = "renew";
}

/// Current lifecycle status of a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Issued but no device registered yet.
    Ready,
    /// At least one device is registered.
    Active,
    /// The rights window has lapsed.
    Expired,
    /// The user returned the publication early.
    Returned,
    /// The provider revoked the license.
    Revoked,
    /// The provider cancelled the license before first use.
    Cancelled,
}

impl Status {
    /// Returns true if the license may still unlock content.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Ready | Self::Active)
    }

    /// Returns true if the server terminated the license for good,
    /// independently of any rights window.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Returned | Self::Revoked | Self::Cancelled)
    }
}

/// Type of a recorded lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Register,
    Renew,
    Return,
    Revoke,
    Cancel,
}

/// A lifecycle event recorded by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Device name that triggered the event.
    pub name: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Device id that triggered the event.
    pub id: Option<String>,
}

/// The `updated` object: last-modification dates of both documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Updated {
    /// When the License Document was last updated.
    pub license: Option<DateTime<Utc>>,
    /// When the status itself last changed.
    pub status: DateTime<Utc>,
}

/// Rights the server may extend the license to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PotentialRights {
    pub end: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RawStatus {
    id: String,
    status: Status,
    message: String,
    updated: Updated,
    links: Vec<Link>,
    #[serde(default)]
    potential_rights: Option<PotentialRights>,
    #[serde(default)]
    events: Vec<StatusEvent>,
}

/// A parsed Status Document.
#[derive(Debug, Clone)]
pub struct StatusDocument {
    pub id: String,
    pub status: Status,
    /// Human-readable message describing the status.
    pub message: String,
    updated: Updated,
    pub links: Links,
    pub potential_rights: Option<PotentialRights>,
    events: Vec<StatusEvent>,
}

impl StatusDocument {
    /// Parses a Status Document from its raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the mandatory `license`
    /// link is absent.
    pub fn parse_data(data: &[u8]) -> ParseResult<Self> {
        let raw = std::str::from_utf8(data).map_err(|_| ParseError::InvalidUtf8)?;
        let doc: RawStatus = serde_json::from_str(raw)?;

        let links = Links::new(doc.links);
        if links.find(rel::LICENSE).is_none() {
            return Err(ParseError::MissingLink(rel::LICENSE));
        }

        Ok(Self {
            id: doc.id,
            status: doc.status,
            message: doc.message,
            updated: doc.updated,
            links,
            potential_rights: doc.potential_rights,
            events: doc.events,
        })
    }

    /// When the status itself last changed.
    #[must_use]
    pub fn status_updated(&self) -> DateTime<Utc> {
        self.updated.status
    }

    /// When the License Document was last updated, if the server says.
    #[must_use]
    pub fn license_updated(&self) -> Option<DateTime<Utc>> {
        self.updated.license
    }

    /// Iterates the recorded events of a given type.
    pub fn events(&self, event_type: EventType) -> impl Iterator<Item = &StatusEvent> {
        self.events
            .iter()
            .filter(move |event| event.event_type == event_type)
    }

    /// All recorded events.
    #[must_use]
    pub fn all_events(&self) -> &[StatusEvent] {
        &self.events
    }

    /// Returns the link for `rel`, if present.
    #[must_use]
    pub fn link(&self, rel: &str) -> Option<&Link> {
        self.links.find(rel)
    }

    /// Resolves a link for `rel`, preferring `preferred_type`.
    #[must_use]
    pub fn url(&self, rel: &str, preferred_type: Option<&str>) -> Option<String> {
        self.links.url(rel, preferred_type)
    }

    /// The furthest date the server is willing to extend the license to.
    #[must_use]
    pub fn potential_end(&self) -> Option<DateTime<Utc>> {
        self.potential_rights.as_ref().and_then(|r| r.end)
    }
}
