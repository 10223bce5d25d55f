// =============================================================================
// GOOGLE DOCS / DRIVE REST CLIENT
// =============================================================================
//
// Implements the `DocumentApi` port against the public REST endpoints.
//
// **Endpoints used:**
// - `GET  /v1/documents/{id}?includeTabsContent=true`  (Docs)
// - `POST /v1/documents`                                (Docs)
// - `POST /v1/documents/{id}:batchUpdate`               (Docs)
// - `GET  /drive/v3/files`                              (Drive search)
//
// Every request carries `Authorization: Bearer <token>` taken from the
// credential handle at call time, so a refresh between calls is picked up.
// A 401 invalidates the handle's token and the request is sent once more
// with a fresh one.
//
// **Error mapping:**
// 404 -> NotFound, 403 -> PermissionDenied, 401 (after the retry) ->
// credential error, anything else -> Upstream with Google's error message
// when there is one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::core::credentials::{CredentialError, CredentialHandle};
use crate::core::documents::{
    BatchUpdateOutcome, CreatedDocument, DocumentApi, DocumentApiError, DocumentSnapshot,
    EditRequest, FileQuery, FileSummary, InsertLocation,
};

pub const DEFAULT_DOCS_API_BASE: &str = "https://docs.googleapis.com";
pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com";

const GOOGLE_DOCS_MIME_TYPE: &str = "application/vnd.google-apps.document";

// =============================================================================
// RESPONSE STRUCTURES
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    document_id: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<BatchReply>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchReply {
    #[serde(default)]
    replace_all_text: Option<ReplaceAllTextReply>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceAllTextReply {
    #[serde(default)]
    occurrences_changed: u64,
}

#[derive(Debug, Default, Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    web_view_link: Option<String>,
}

/// `{"error": {"code": 404, "message": "...", "status": "NOT_FOUND"}}`
#[derive(Debug, Default, Deserialize)]
struct GoogleErrorEnvelope {
    #[serde(default)]
    error: GoogleErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: String,
}

// =============================================================================
// CLIENT
// =============================================================================

/// Google Docs and Drive client.
pub struct GoogleDocsClient {
    client: Client,
    docs_base: String,
    drive_base: String,
}

impl GoogleDocsClient {
    /// Points the client at different hosts (proxies, test servers).
    pub fn with_base_urls(client: Client, docs_base: &str, drive_base: &str) -> Self {
        Self {
            client,
            docs_base: docs_base.trim_end_matches('/').to_string(),
            drive_base: drive_base.trim_end_matches('/').to_string(),
        }
    }

    async fn send(
        &self,
        auth: &CredentialHandle,
        request: RequestBuilder,
        what: &str,
    ) -> Result<Response, DocumentApiError> {
        let retry = request.try_clone();
        let response = send_with_token(auth, request).await?;

        let response = match retry {
            Some(retry) if response.status() == StatusCode::UNAUTHORIZED => {
                tracing::info!(what, "Access token rejected; refreshing and retrying once");
                auth.invalidate().await;
                send_with_token(auth, retry).await?
            }
            _ => response,
        };

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = google_error_message(&body);
        tracing::warn!(status = %status, what, "Google API request failed");

        Err(classify_status(status, what, message))
    }
}

async fn send_with_token(
    auth: &CredentialHandle,
    request: RequestBuilder,
) -> Result<Response, DocumentApiError> {
    let token = auth.access_token().await?;
    request
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| DocumentApiError::Http(e.to_string()))
}

fn google_error_message(body: &str) -> String {
    serde_json::from_str::<GoogleErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

fn classify_status(status: StatusCode, what: &str, message: String) -> DocumentApiError {
    match status {
        StatusCode::NOT_FOUND => DocumentApiError::NotFound(format!("{}: {}", what, message)),
        StatusCode::FORBIDDEN => {
            DocumentApiError::PermissionDenied(format!("{}: {}", what, message))
        }
        StatusCode::UNAUTHORIZED => {
            DocumentApiError::Credential(CredentialError::AccessRejected(message))
        }
        _ => DocumentApiError::Upstream {
            status: status.as_u16(),
            message,
        },
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, DocumentApiError> {
    response
        .json::<T>()
        .await
        .map_err(|e| DocumentApiError::Decode(e.to_string()))
}

// =============================================================================
// REQUEST BUILDING
// =============================================================================

/// Converts an edit into one entry of a `batchUpdate` `requests` array.
pub fn edit_request_json(request: &EditRequest) -> Value {
    match request {
        EditRequest::InsertText { location, text } => {
            let location = match location {
                InsertLocation::Index(index) => json!({ "location": { "index": index } }),
                InsertLocation::EndOfBody => json!({ "endOfSegmentLocation": {} }),
            };
            let mut insert = location;
            insert["text"] = json!(text);
            json!({ "insertText": insert })
        }
        EditRequest::ReplaceAllText {
            find,
            replace,
            match_case,
        } => json!({
            "replaceAllText": {
                "containsText": { "text": find, "matchCase": match_case },
                "replaceText": replace,
            }
        }),
        EditRequest::UpdateTextStyle { range, style } => {
            let mut text_style = Map::new();
            if let Some(bold) = style.bold {
                text_style.insert("bold".to_string(), json!(bold));
            }
            if let Some(italic) = style.italic {
                text_style.insert("italic".to_string(), json!(italic));
            }
            if let Some(underline) = style.underline {
                text_style.insert("underline".to_string(), json!(underline));
            }
            if let Some(strikethrough) = style.strikethrough {
                text_style.insert("strikethrough".to_string(), json!(strikethrough));
            }
            if let Some(url) = &style.link_url {
                text_style.insert("link".to_string(), json!({ "url": url }));
            }

            json!({
                "updateTextStyle": {
                    "range": {
                        "startIndex": range.start_index,
                        "endIndex": range.end_index,
                    },
                    "textStyle": text_style,
                    "fields": style.field_mask(),
                }
            })
        }
    }
}

/// Drive `q` expression matching Docs by name or full text.
pub fn drive_search_query(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "mimeType='{}' and trashed=false and (name contains '{}' or fullText contains '{}')",
        GOOGLE_DOCS_MIME_TYPE, escaped, escaped
    )
}

#[async_trait]
impl DocumentApi for GoogleDocsClient {
    async fn get_document(
        &self,
        auth: &CredentialHandle,
        document_id: &str,
    ) -> Result<DocumentSnapshot, DocumentApiError> {
        let url = format!("{}/v1/documents/{}", self.docs_base, document_id);
        let request = self
            .client
            .get(&url)
            .query(&[("includeTabsContent", "true")]);

        let response = self.send(auth, request, "get document").await?;
        let snapshot: DocumentSnapshot = decode(response).await?;
        tracing::debug!(document_id, tabs = snapshot.tab_count(), "Fetched document");
        Ok(snapshot)
    }

    async fn create_document(
        &self,
        auth: &CredentialHandle,
        title: &str,
    ) -> Result<CreatedDocument, DocumentApiError> {
        let url = format!("{}/v1/documents", self.docs_base);
        let request = self.client.post(&url).json(&json!({ "title": title }));

        let response = self.send(auth, request, "create document").await?;
        let created: CreateResponse = decode(response).await?;
        Ok(CreatedDocument {
            title: if created.title.is_empty() {
                title.to_string()
            } else {
                created.title
            },
            document_id: created.document_id,
        })
    }

    async fn batch_update(
        &self,
        auth: &CredentialHandle,
        document_id: &str,
        requests: &[EditRequest],
    ) -> Result<BatchUpdateOutcome, DocumentApiError> {
        let url = format!("{}/v1/documents/{}:batchUpdate", self.docs_base, document_id);
        let body: Vec<Value> = requests.iter().map(edit_request_json).collect();
        let request = self.client.post(&url).json(&json!({ "requests": body }));

        let response = self.send(auth, request, "update document").await?;
        let reply: BatchUpdateResponse = decode(response).await?;

        let occurrences_changed = reply
            .replies
            .iter()
            .filter_map(|r| r.replace_all_text.as_ref())
            .map(|r| r.occurrences_changed)
            .sum();

        tracing::info!(document_id, requests = requests.len(), "Applied document edits");
        Ok(BatchUpdateOutcome {
            occurrences_changed,
        })
    }

    async fn search_files(
        &self,
        auth: &CredentialHandle,
        query: &FileQuery,
    ) -> Result<Vec<FileSummary>, DocumentApiError> {
        let url = format!("{}/drive/v3/files", self.drive_base);
        let q = drive_search_query(&query.text);
        let page_size = query.max_results.to_string();
        let request = self.client.get(&url).query(&[
            ("q", q.as_str()),
            ("pageSize", page_size.as_str()),
            ("fields", "files(id,name,modifiedTime,webViewLink)"),
        ]);

        let response = self.send(auth, request, "search files").await?;
        let listing: FileListResponse = decode(response).await?;

        Ok(listing
            .files
            .into_iter()
            .map(|file| FileSummary {
                id: file.id,
                name: file.name,
                modified_time: file.modified_time,
                web_view_link: file.web_view_link,
            })
            .collect())
    }
}
