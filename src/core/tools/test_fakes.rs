// In-memory fakes for the credential and document ports, shared by the
// dispatcher and transport tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::tool_dispatcher::ToolDispatcher;
use super::tool_registry::ToolRegistry;
use crate::core::credentials::{
    AccessTokenSource, CredentialError, CredentialHandle, CredentialResolver,
};
use crate::core::documents::{
    BatchUpdateOutcome, CreatedDocument, DocumentApi, DocumentApiError, DocumentSnapshot,
    EditRequest, FileQuery, FileSummary,
};

pub struct StaticToken;

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, CredentialError> {
        Ok("test-token".to_string())
    }
}

/// Resolver that either always succeeds or always fails, counting calls.
pub struct FakeResolver {
    pub fail: bool,
    pub resolves: AtomicUsize,
}

impl FakeResolver {
    pub fn ok() -> Self {
        Self {
            fail: false,
            resolves: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            resolves: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialResolver for FakeResolver {
    async fn resolve(&self) -> Result<CredentialHandle, CredentialError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CredentialError::Missing("no token file at token.json".to_string()));
        }
        Ok(Arc::new(StaticToken))
    }
}

/// Which upstream failure the fake should produce on every call.
#[derive(Debug, Clone, Copy)]
pub enum FakeFailure {
    PermissionDenied,
    Upstream,
}

#[derive(Default)]
pub struct FakeDocumentApi {
    pub documents: Mutex<HashMap<String, DocumentSnapshot>>,
    pub files: Vec<FileSummary>,
    pub occurrences: u64,
    pub failure: Option<FakeFailure>,
    pub batches: Mutex<Vec<(String, Vec<EditRequest>)>>,
    pub queries: Mutex<Vec<FileQuery>>,
    pub calls: AtomicUsize,
}

impl FakeDocumentApi {
    pub fn with_document(id: &str, snapshot: Value) -> Self {
        let api = Self::default();
        let snapshot: DocumentSnapshot =
            serde_json::from_value(snapshot).expect("fake snapshot must deserialize");
        api.documents
            .lock()
            .unwrap()
            .insert(id.to_string(), snapshot);
        api
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), DocumentApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(FakeFailure::PermissionDenied) => Err(DocumentApiError::PermissionDenied(
                "The caller does not have permission".to_string(),
            )),
            Some(FakeFailure::Upstream) => Err(DocumentApiError::Upstream {
                status: 503,
                message: "backend unavailable".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentApi for FakeDocumentApi {
    async fn get_document(
        &self,
        _auth: &CredentialHandle,
        document_id: &str,
    ) -> Result<DocumentSnapshot, DocumentApiError> {
        self.enter()?;
        self.documents
            .lock()
            .unwrap()
            .get(document_id)
            .cloned()
            .ok_or_else(|| {
                DocumentApiError::NotFound(format!("Requested entity was not found: {}", document_id))
            })
    }

    async fn create_document(
        &self,
        _auth: &CredentialHandle,
        title: &str,
    ) -> Result<CreatedDocument, DocumentApiError> {
        self.enter()?;
        let id = format!("new-doc-{}", self.documents.lock().unwrap().len() + 1);
        self.documents
            .lock()
            .unwrap()
            .insert(id.clone(), DocumentSnapshot::default());
        Ok(CreatedDocument {
            document_id: id,
            title: title.to_string(),
        })
    }

    async fn batch_update(
        &self,
        _auth: &CredentialHandle,
        document_id: &str,
        requests: &[EditRequest],
    ) -> Result<BatchUpdateOutcome, DocumentApiError> {
        self.enter()?;
        if !self.documents.lock().unwrap().contains_key(document_id) {
            return Err(DocumentApiError::NotFound(document_id.to_string()));
        }
        self.batches
            .lock()
            .unwrap()
            .push((document_id.to_string(), requests.to_vec()));
        Ok(BatchUpdateOutcome {
            occurrences_changed: self.occurrences,
        })
    }

    async fn search_files(
        &self,
        _auth: &CredentialHandle,
        query: &FileQuery,
    ) -> Result<Vec<FileSummary>, DocumentApiError> {
        self.enter()?;
        self.queries.lock().unwrap().push(query.clone());
        Ok(self
            .files
            .iter()
            .take(query.max_results as usize)
            .cloned()
            .collect())
    }
}

/// A dispatcher over the standard registry and the given fakes.
pub fn dispatcher(resolver: Arc<FakeResolver>, api: Arc<FakeDocumentApi>) -> ToolDispatcher {
    ToolDispatcher::new(
        ToolRegistry::standard().expect("standard registry has unique names"),
        resolver,
        api,
    )
}

/// A one-paragraph document.
pub fn simple_document(text: &str) -> Value {
    serde_json::json!({
        "documentId": "doc-1",
        "title": "Fixture",
        "revisionId": "rev-7",
        "body": {"content": [
            {"endIndex": 1, "sectionBreak": {}},
            {"startIndex": 1, "paragraph": {
                "elements": [{"startIndex": 1, "textRun": {"content": text, "textStyle": {}}}],
                "paragraphStyle": {"namedStyleType": "NORMAL_TEXT"}
            }}
        ]}
    })
}
