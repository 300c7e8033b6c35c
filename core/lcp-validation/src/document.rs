//! Input envelope and terminal payload of a validation run.

use crate::contracts::DrmContext;
use crate::error::LicenseStatusError;
use lcp_documents::{LicenseDocument, StatusDocument};

/// A raw document handed to `validate`, tagged so the two entry points
/// cannot be confused.
#[derive(Debug, Clone)]
pub enum ValidationDocument {
    /// Raw License Document bytes.
    License(Vec<u8>),
    /// Raw Status Document bytes.
    Status(Vec<u8>),
}

/// The payload of a successful validation run.
///
/// The license is always present. Exactly one of the two context outcomes
/// is populated: either the DRM context (integrity succeeded) or the status
/// error explaining why the license is not currently usable.
#[derive(Debug, Clone)]
pub struct ValidatedDocuments {
    license: LicenseDocument,
    context: ContextOutcome,
    status: Option<StatusDocument>,
}

#[derive(Debug, Clone)]
enum ContextOutcome {
    Granted(DrmContext),
    Rejected(LicenseStatusError),
}

impl ValidatedDocuments {
    pub(crate) fn granted(
        license: LicenseDocument,
        context: DrmContext,
        status: Option<StatusDocument>,
    ) -> Self {
        Self {
            license,
            context: ContextOutcome::Granted(context),
            status,
        }
    }

    pub(crate) fn rejected(
        license: LicenseDocument,
        error: LicenseStatusError,
        status: Option<StatusDocument>,
    ) -> Self {
        Self {
            license,
            context: ContextOutcome::Rejected(error),
            status,
        }
    }

    /// The validated License Document.
    #[must_use]
    pub fn license(&self) -> &LicenseDocument {
        &self.license
    }

    /// The Status Document, when one was fetched during the run.
    #[must_use]
    pub fn status(&self) -> Option<&StatusDocument> {
        self.status.as_ref()
    }

    /// The DRM context, or the status error explaining why the license is
    /// not currently usable.
    pub fn context(&self) -> Result<&DrmContext, &LicenseStatusError> {
        match &self.context {
            ContextOutcome::Granted(context) => Ok(context),
            ContextOutcome::Rejected(error) => Err(error),
        }
    }
}
