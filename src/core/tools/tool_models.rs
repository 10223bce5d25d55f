// Tool domain models: names, the error taxonomy and dispatch results.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use super::tool_schema::SchemaViolation;
use crate::core::credentials::CredentialError;
use crate::core::documents::{extract_document_id, DocumentApiError, RenderFormat, StylePatch};

// ============================================================================
// TOOL NAMES
// ============================================================================

/// The closed set of tools this server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolName {
    ReadDocument,
    GetDocumentInfo,
    CreateDocument,
    AppendText,
    ReplaceText,
    FormatText,
    SearchDocuments,
}

impl ToolName {
    pub const ALL: [ToolName; 7] = [
        ToolName::ReadDocument,
        ToolName::GetDocumentInfo,
        ToolName::CreateDocument,
        ToolName::AppendText,
        ToolName::ReplaceText,
        ToolName::FormatText,
        ToolName::SearchDocuments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ReadDocument => "read_document",
            ToolName::GetDocumentInfo => "get_document_info",
            ToolName::CreateDocument => "create_document",
            ToolName::AppendText => "append_text",
            ToolName::ReplaceText => "replace_text",
            ToolName::FormatText => "format_text",
            ToolName::SearchDocuments => "search_documents",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Stable error kinds reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    CredentialError,
    InvalidArgument,
    NotFound,
    PermissionDenied,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::CredentialError => "CredentialError",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::Internal => "Internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArgument(#[from] SchemaViolation),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::UnknownTool(_) | ToolError::NotFound(_) => ErrorKind::NotFound,
            ToolError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ToolError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ToolError::Credential(_) => ErrorKind::CredentialError,
            ToolError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<DocumentApiError> for ToolError {
    fn from(err: DocumentApiError) -> Self {
        match err {
            DocumentApiError::NotFound(message) => ToolError::NotFound(message),
            DocumentApiError::PermissionDenied(message) => ToolError::PermissionDenied(message),
            DocumentApiError::Credential(err) => ToolError::Credential(err),
            other => ToolError::Internal(other.to_string()),
        }
    }
}

// ============================================================================
// DISPATCH RESULT
// ============================================================================

/// Normalized outcome of one tool call.
///
/// Serializes as `{"success": true, "data": ..}` or
/// `{"success": false, "errorKind": .., "message": ..}`.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResult {
    Success { data: Value },
    Failure { error_kind: ErrorKind, message: String },
}

impl DispatchResult {
    pub fn failure(err: &ToolError) -> Self {
        DispatchResult::Failure {
            error_kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DispatchResult::Success { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            DispatchResult::Success { .. } => None,
            DispatchResult::Failure { error_kind, .. } => Some(*error_kind),
        }
    }

    /// Human-readable text: the rendered string itself, pretty JSON for
    /// structured data, or the failure message.
    pub fn display_text(&self) -> String {
        match self {
            DispatchResult::Success {
                data: Value::String(text),
            } => text.clone(),
            DispatchResult::Success { data } => {
                serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
            }
            DispatchResult::Failure {
                error_kind,
                message,
            } => format!("{}: {}", error_kind.as_str(), message),
        }
    }
}

impl Serialize for DispatchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DispatchResult::Success { data } => {
                let mut state = serializer.serialize_struct("DispatchResult", 2)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
                state.end()
            }
            DispatchResult::Failure {
                error_kind,
                message,
            } => {
                let mut state = serializer.serialize_struct("DispatchResult", 3)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("errorKind", error_kind)?;
                state.serialize_field("message", message)?;
                state.end()
            }
        }
    }
}

// ============================================================================
// TYPED ARGUMENTS
// ============================================================================
//
// Built from an argument bag that already passed the tool's schema, so the
// serde pass here only has to map fields.

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadDocumentArgs {
    pub document_id: String,
    #[serde(default)]
    pub format: RenderFormat,
    #[serde(default)]
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentRef {
    pub document_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateDocumentArgs {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppendTextArgs {
    pub document_id: String,
    pub text: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReplaceTextArgs {
    pub document_id: String,
    pub find: String,
    pub replace: String,
    #[serde(default = "default_true")]
    pub match_case: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormatTextArgs {
    pub document_id: String,
    pub find: String,
    #[serde(default)]
    pub bold: Option<bool>,
    #[serde(default)]
    pub italic: Option<bool>,
    #[serde(default)]
    pub underline: Option<bool>,
    #[serde(default)]
    pub strikethrough: Option<bool>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub all_occurrences: bool,
}

impl FormatTextArgs {
    pub fn style(&self) -> StylePatch {
        StylePatch {
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            strikethrough: self.strikethrough,
            link_url: self.link_url.clone(),
        }
    }
}

fn default_max_results() -> u32 {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchDocumentsArgs {
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

/// A fully typed tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    ReadDocument(ReadDocumentArgs),
    GetDocumentInfo(DocumentRef),
    CreateDocument(CreateDocumentArgs),
    AppendText(AppendTextArgs),
    ReplaceText(ReplaceTextArgs),
    FormatText(FormatTextArgs),
    SearchDocuments(SearchDocumentsArgs),
}

impl ToolCall {
    /// Maps a validated argument object onto the tool's typed arguments.
    ///
    /// Document URLs are reduced to their bare id here.
    pub fn parse(tool: ToolName, args: Map<String, Value>) -> Result<Self, ToolError> {
        let mut args = args;
        if let Some(Value::String(raw)) = args.get("document_id") {
            let id = extract_document_id(raw).ok_or_else(|| SchemaViolation::Invalid {
                field: "document_id".to_string(),
                problem: "must be a document id or a Google Docs URL".to_string(),
            })?;
            args.insert("document_id".to_string(), Value::String(id));
        }

        let value = Value::Object(args);
        let call = match tool {
            ToolName::ReadDocument => ToolCall::ReadDocument(from_args(tool, value)?),
            ToolName::GetDocumentInfo => ToolCall::GetDocumentInfo(from_args(tool, value)?),
            ToolName::CreateDocument => ToolCall::CreateDocument(from_args(tool, value)?),
            ToolName::AppendText => ToolCall::AppendText(from_args(tool, value)?),
            ToolName::ReplaceText => ToolCall::ReplaceText(from_args(tool, value)?),
            ToolName::FormatText => ToolCall::FormatText(from_args(tool, value)?),
            ToolName::SearchDocuments => ToolCall::SearchDocuments(from_args(tool, value)?),
        };
        Ok(call)
    }

    pub fn tool(&self) -> ToolName {
        match self {
            ToolCall::ReadDocument(_) => ToolName::ReadDocument,
            ToolCall::GetDocumentInfo(_) => ToolName::GetDocumentInfo,
            ToolCall::CreateDocument(_) => ToolName::CreateDocument,
            ToolCall::AppendText(_) => ToolName::AppendText,
            ToolCall::ReplaceText(_) => ToolName::ReplaceText,
            ToolCall::FormatText(_) => ToolName::FormatText,
            ToolCall::SearchDocuments(_) => ToolName::SearchDocuments,
        }
    }
}

fn from_args<T: serde::de::DeserializeOwned>(tool: ToolName, value: Value) -> Result<T, ToolError> {
    // The schema already accepted these args; a mismatch here is our bug.
    serde_json::from_value(value)
        .map_err(|e| ToolError::Internal(format!("{} arguments did not map: {}", tool, e)))
}
