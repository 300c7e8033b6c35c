//! License Document and Status Document models for Readium LCP.
//!
//! This crate parses the two JSON documents of the LCP scheme:
//! - The **License Document** (`.lcpl`), shipped with the publication:
//!   rights, encryption profile, provider signature, and links to the
//!   publication, the passphrase hint and the Status Document.
//! - The **Status Document**, hosted by the license server: current
//!   lifecycle status, last-update dates, device events, and links for
//!   registration, return and renewal.
//!
//! Parsed documents are immutable. The License Document keeps its original
//! bytes because the provider signature covers the raw JSON.

mod error;
mod license;
mod link;
mod status;

pub use error::{ParseError, ParseResult};
pub use license::{
    rel as license_rel, ContentKey, Encryption, LicenseDocument, Rights, Signature, User, UserKey,
};
pub use link::{Link, Links};
pub use status::{
    rel as status_rel, EventType, PotentialRights, Status, StatusDocument, StatusEvent, Updated,
};

/// Media type of the License Document.
pub const LICENSE_MEDIA_TYPE: &str = "application/vnd.readium.lcp.license.v1.0+json";

/// Media type of the Status Document.
pub const STATUS_MEDIA_TYPE: &str = "application/vnd.readium.license.status.v1.0+json";
