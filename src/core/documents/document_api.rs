// =============================================================================
// DOCUMENT API PORT
// =============================================================================
//
// The upstream operations the tools need. The Google implementation lives in
// `infra::google_docs`; tests use an in-memory fake.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::document_models::DocumentSnapshot;
use crate::core::credentials::{CredentialError, CredentialHandle};

#[derive(Debug, Error)]
pub enum DocumentApiError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("could not decode upstream response: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Http(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedDocument {
    pub document_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    pub text: String,
    pub max_results: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub id: String,
    pub name: String,
    pub modified_time: Option<DateTime<Utc>>,
    pub web_view_link: Option<String>,
}

/// Half-open UTF-16 index range into a document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start_index: i64,
    pub end_index: i64,
}

/// Character styling to set. `None` leaves the attribute untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StylePatch {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub link_url: Option<String>,
}

impl StylePatch {
    /// Comma separated field mask naming only the attributes being set.
    pub fn field_mask(&self) -> String {
        let mut fields = Vec::new();
        if self.bold.is_some() {
            fields.push("bold");
        }
        if self.italic.is_some() {
            fields.push("italic");
        }
        if self.underline.is_some() {
            fields.push("underline");
        }
        if self.strikethrough.is_some() {
            fields.push("strikethrough");
        }
        if self.link_url.is_some() {
            fields.push("link");
        }
        fields.join(",")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertLocation {
    Index(i64),
    EndOfBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditRequest {
    InsertText {
        location: InsertLocation,
        text: String,
    },
    ReplaceAllText {
        find: String,
        replace: String,
        match_case: bool,
    },
    UpdateTextStyle {
        range: TextRange,
        style: StylePatch,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchUpdateOutcome {
    /// Sum of `occurrencesChanged` over all replace replies.
    pub occurrences_changed: u64,
}

#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn get_document(
        &self,
        auth: &CredentialHandle,
        document_id: &str,
    ) -> Result<DocumentSnapshot, DocumentApiError>;

    async fn create_document(
        &self,
        auth: &CredentialHandle,
        title: &str,
    ) -> Result<CreatedDocument, DocumentApiError>;

    async fn batch_update(
        &self,
        auth: &CredentialHandle,
        document_id: &str,
        requests: &[EditRequest],
    ) -> Result<BatchUpdateOutcome, DocumentApiError>;

    async fn search_files(
        &self,
        auth: &CredentialHandle,
        query: &FileQuery,
    ) -> Result<Vec<FileSummary>, DocumentApiError>;
}
