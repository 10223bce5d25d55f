// =============================================================================
// TOOL DISPATCHER
// =============================================================================
//
// The single seam every transport binds to: `(tool name, JSON args)` in,
// `DispatchResult` out.
//
// **Flow:**
// 1. Look up the descriptor (unknown -> NotFound)
// 2. Validate args against its compiled schema (-> InvalidArgument, nothing else runs)
// 3. Resolve credentials once (-> CredentialError, handler never runs)
// 4. Run the handler and map its error into the taxonomy
//
// There is no retry here. One failed upstream call is one failed result.

use serde_json::Value;
use std::sync::Arc;

use super::document_tools;
use super::tool_models::{DispatchResult, ToolCall, ToolError};
use super::tool_registry::{RegisteredTool, ToolRegistry};
use crate::core::credentials::CredentialResolver;
use crate::core::documents::DocumentApi;

pub struct ToolDispatcher {
    registry: ToolRegistry,
    resolver: Arc<dyn CredentialResolver>,
    api: Arc<dyn DocumentApi>,
}

impl ToolDispatcher {
    pub fn new(
        registry: ToolRegistry,
        resolver: Arc<dyn CredentialResolver>,
        api: Arc<dyn DocumentApi>,
    ) -> Self {
        Self {
            registry,
            resolver,
            api,
        }
    }

    pub fn tools(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.registry.tools()
    }

    /// Runs one tool call. Never fails: every error becomes a `Failure`.
    pub async fn dispatch(&self, name: &str, args: Value) -> DispatchResult {
        match self.try_dispatch(name, args).await {
            Ok(data) => {
                tracing::info!(tool = name, "Tool call succeeded");
                DispatchResult::Success { data }
            }
            Err(err) => {
                let result = DispatchResult::failure(&err);
                tracing::warn!(
                    tool = name,
                    error_kind = err.kind().as_str(),
                    error = %err,
                    "Tool call failed"
                );
                result
            }
        }
    }

    async fn try_dispatch(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let args = tool.schema.validate(&args)?;
        let call = ToolCall::parse(tool.descriptor.name, args)?;
        tracing::debug!(tool = %call.tool(), "Arguments validated");

        let auth = self.resolver.resolve().await?;
        document_tools::execute(self.api.as_ref(), &auth, call).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_fakes::{
        dispatcher, simple_document, FakeDocumentApi, FakeFailure, FakeResolver,
    };
    use super::*;
    use crate::core::documents::{EditRequest, FileSummary, InsertLocation, TextRange};
    use crate::core::tools::ErrorKind;
    use serde_json::json;

    fn setup(api: FakeDocumentApi) -> (ToolDispatcher, Arc<FakeResolver>, Arc<FakeDocumentApi>) {
        let resolver = Arc::new(FakeResolver::ok());
        let api = Arc::new(api);
        (dispatcher(resolver.clone(), api.clone()), resolver, api)
    }

    fn failure_kind(result: &DispatchResult) -> ErrorKind {
        result.error_kind().expect("expected a failure")
    }

    fn failure_message(result: &DispatchResult) -> String {
        match result {
            DispatchResult::Failure { message, .. } => message.clone(),
            other => panic!("expected a failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let (dispatcher, resolver, _) = setup(FakeDocumentApi::default());

        let result = dispatcher.dispatch("no-such-tool", json!({})).await;

        assert_eq!(failure_kind(&result), ErrorKind::NotFound);
        assert_eq!(resolver.count(), 0);
    }

    #[tokio::test]
    async fn test_missing_required_field_names_it() {
        let (dispatcher, resolver, api) = setup(FakeDocumentApi::default());

        for (tool, field) in [
            ("read_document", "document_id"),
            ("create_document", "title"),
            ("append_text", "text"),
            ("replace_text", "replace"),
            ("search_documents", "query"),
        ] {
            let args = match tool {
                "append_text" => json!({"document_id": "abc"}),
                "replace_text" => json!({"document_id": "abc", "find": "x"}),
                _ => json!({}),
            };
            let result = dispatcher.dispatch(tool, args).await;
            assert_eq!(failure_kind(&result), ErrorKind::InvalidArgument, "{}", tool);
            assert!(failure_message(&result).contains(field), "{}", tool);
        }

        // Invalid arguments never reach credentials or the API.
        assert_eq!(resolver.count(), 0);
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_and_mistyped_fields_are_invalid() {
        let (dispatcher, _, _) = setup(FakeDocumentApi::default());

        let result = dispatcher
            .dispatch("read_document", json!({"document_id": "abc", "colour": "red"}))
            .await;
        assert!(failure_message(&result).contains("colour"));

        let result = dispatcher
            .dispatch("read_document", json!({"document_id": "abc", "max_length": "ten"}))
            .await;
        assert_eq!(failure_kind(&result), ErrorKind::InvalidArgument);

        let result = dispatcher.dispatch("read_document", json!("abc")).await;
        assert_eq!(failure_kind(&result), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_credential_failure_aborts_before_handler() {
        let resolver = Arc::new(FakeResolver::failing());
        let api = Arc::new(FakeDocumentApi::with_document("abc", simple_document("hi\n")));
        let dispatcher = dispatcher(resolver.clone(), api.clone());

        let result = dispatcher
            .dispatch("read_document", json!({"document_id": "abc"}))
            .await;

        assert_eq!(failure_kind(&result), ErrorKind::CredentialError);
        assert_eq!(resolver.count(), 1);
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_read_document_renders_and_truncates() {
        let (dispatcher, resolver, _) = setup(FakeDocumentApi::with_document(
            "abc",
            simple_document("Hello world\n"),
        ));

        let result = dispatcher
            .dispatch(
                "read_document",
                json!({"document_id": "https://docs.google.com/document/d/abc/edit"}),
            )
            .await;
        assert_eq!(result, DispatchResult::Success { data: json!("Hello world") });

        let result = dispatcher
            .dispatch(
                "read_document",
                json!({"document_id": "abc", "format": "text", "max_length": 5}),
            )
            .await;
        assert_eq!(
            result,
            DispatchResult::Success {
                data: json!("Hello\n\n[truncated: 6 characters omitted of 11 total]")
            }
        );

        assert_eq!(resolver.count(), 2);
    }

    #[tokio::test]
    async fn test_read_document_format_selects_the_renderer() {
        let doc = json!({
            "documentId": "abc",
            "title": "Styled",
            "body": {"content": [
                {"startIndex": 1, "paragraph": {
                    "elements": [{"startIndex": 1, "textRun": {
                        "content": "Loud\n", "textStyle": {"bold": true}
                    }}],
                    "paragraphStyle": {"namedStyleType": "HEADING_2"}
                }}
            ]}
        });
        let (dispatcher, _, _) = setup(FakeDocumentApi::with_document("abc", doc));

        let markdown = dispatcher
            .dispatch("read_document", json!({"document_id": "abc"}))
            .await;
        assert_eq!(markdown, DispatchResult::Success { data: json!("## **Loud**") });

        let text = dispatcher
            .dispatch("read_document", json!({"document_id": "abc", "format": "text"}))
            .await;
        assert_eq!(text, DispatchResult::Success { data: json!("Loud") });
    }

    #[tokio::test]
    async fn test_upstream_errors_are_classified() {
        let (dispatcher, _, _) = setup(FakeDocumentApi::default());
        let result = dispatcher
            .dispatch("read_document", json!({"document_id": "missing"}))
            .await;
        assert_eq!(failure_kind(&result), ErrorKind::NotFound);

        let (dispatcher, _, _) = setup(FakeDocumentApi {
            failure: Some(FakeFailure::PermissionDenied),
            ..Default::default()
        });
        let result = dispatcher
            .dispatch("get_document_info", json!({"document_id": "abc"}))
            .await;
        assert_eq!(failure_kind(&result), ErrorKind::PermissionDenied);

        let (dispatcher, _, _) = setup(FakeDocumentApi {
            failure: Some(FakeFailure::Upstream),
            ..Default::default()
        });
        let result = dispatcher
            .dispatch("search_documents", json!({"query": "plan"}))
            .await;
        assert_eq!(failure_kind(&result), ErrorKind::Internal);
        assert!(failure_message(&result).contains("backend unavailable"));
    }

    #[tokio::test]
    async fn test_get_document_info_summarizes_structure() {
        let (dispatcher, _, _) = setup(FakeDocumentApi::with_document(
            "abc",
            simple_document("Hello\n"),
        ));

        let result = dispatcher
            .dispatch("get_document_info", json!({"document_id": "abc"}))
            .await;

        assert_eq!(
            result,
            DispatchResult::Success {
                data: json!({
                    "document_id": "abc",
                    "title": "Fixture",
                    "revision_id": "rev-7",
                    "tab_count": 1,
                    "paragraph_count": 1,
                    "table_count": 0,
                    "character_count": 6,
                    "url": "https://docs.google.com/document/d/abc/edit",
                })
            }
        );
    }

    #[tokio::test]
    async fn test_create_document_inserts_initial_content() {
        let (dispatcher, _, api) = setup(FakeDocumentApi::default());

        let result = dispatcher
            .dispatch("create_document", json!({"title": " Notes ", "content": "First line"}))
            .await;

        assert_eq!(
            result,
            DispatchResult::Success {
                data: json!({
                    "document_id": "new-doc-1",
                    "title": "Notes",
                    "url": "https://docs.google.com/document/d/new-doc-1/edit",
                })
            }
        );
        let batches = api.batches.lock().unwrap();
        assert_eq!(
            batches[0].1,
            vec![EditRequest::InsertText {
                location: InsertLocation::Index(1),
                text: "First line".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_create_document_rejects_blank_title() {
        let (dispatcher, _, api) = setup(FakeDocumentApi::default());
        let result = dispatcher
            .dispatch("create_document", json!({"title": "   "}))
            .await;
        assert_eq!(failure_kind(&result), ErrorKind::InvalidArgument);
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_append_and_replace_text() {
        let (dispatcher, _, api) = setup(FakeDocumentApi {
            occurrences: 3,
            ..FakeDocumentApi::with_document("abc", simple_document("x\n"))
        });

        let appended = dispatcher
            .dispatch("append_text", json!({"document_id": "abc", "text": "héllo"}))
            .await;
        assert_eq!(
            appended,
            DispatchResult::Success {
                data: json!({"document_id": "abc", "inserted_characters": 5})
            }
        );

        let replaced = dispatcher
            .dispatch(
                "replace_text",
                json!({"document_id": "abc", "find": "x", "replace": "", "match_case": false}),
            )
            .await;
        assert_eq!(
            replaced,
            DispatchResult::Success {
                data: json!({"document_id": "abc", "occurrences_changed": 3})
            }
        );

        let batches = api.batches.lock().unwrap();
        assert_eq!(
            batches[0].1[0],
            EditRequest::InsertText {
                location: InsertLocation::EndOfBody,
                text: "héllo".to_string(),
            }
        );
        assert_eq!(
            batches[1].1[0],
            EditRequest::ReplaceAllText {
                find: "x".to_string(),
                replace: String::new(),
                match_case: false,
            }
        );
    }

    #[tokio::test]
    async fn test_format_text_styles_located_ranges() {
        let (dispatcher, _, api) = setup(FakeDocumentApi::with_document(
            "abc",
            simple_document("one two one\n"),
        ));

        let result = dispatcher
            .dispatch(
                "format_text",
                json!({"document_id": "abc", "find": "one", "bold": true, "all_occurrences": true}),
            )
            .await;
        assert_eq!(
            result,
            DispatchResult::Success {
                data: json!({"document_id": "abc", "ranges_formatted": 2})
            }
        );

        let batches = api.batches.lock().unwrap();
        let ranges: Vec<TextRange> = batches[0]
            .1
            .iter()
            .map(|request| match request {
                EditRequest::UpdateTextStyle { range, style } => {
                    assert_eq!(style.field_mask(), "bold");
                    *range
                }
                other => panic!("unexpected request {:?}", other),
            })
            .collect();
        assert_eq!(
            ranges,
            vec![
                TextRange {
                    start_index: 1,
                    end_index: 4
                },
                TextRange {
                    start_index: 9,
                    end_index: 12
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_format_text_needs_a_style_and_existing_text() {
        let (dispatcher, _, api) = setup(FakeDocumentApi::with_document(
            "abc",
            simple_document("one\n"),
        ));

        let result = dispatcher
            .dispatch("format_text", json!({"document_id": "abc", "find": "one"}))
            .await;
        assert_eq!(failure_kind(&result), ErrorKind::InvalidArgument);

        let result = dispatcher
            .dispatch(
                "format_text",
                json!({"document_id": "abc", "find": "absent", "italic": true}),
            )
            .await;
        assert_eq!(failure_kind(&result), ErrorKind::NotFound);
        assert!(api.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_documents_shapes_results() {
        let file = |id: &str| FileSummary {
            id: id.to_string(),
            name: format!("Doc {}", id),
            modified_time: None,
            web_view_link: None,
        };
        let (dispatcher, _, api) = setup(FakeDocumentApi {
            files: vec![file("a"), file("b"), file("c")],
            ..Default::default()
        });

        let result = dispatcher
            .dispatch("search_documents", json!({"query": " roadmap ", "max_results": 2}))
            .await;

        assert_eq!(
            result,
            DispatchResult::Success {
                data: json!({
                    "query": "roadmap",
                    "results": [
                        {"document_id": "a", "name": "Doc a", "modified_time": null,
                         "url": "https://docs.google.com/document/d/a/edit"},
                        {"document_id": "b", "name": "Doc b", "modified_time": null,
                         "url": "https://docs.google.com/document/d/b/edit"},
                    ]
                })
            }
        );
        assert_eq!(api.queries.lock().unwrap()[0].max_results, 2);

        let result = dispatcher
            .dispatch("search_documents", json!({"query": "x", "max_results": 101}))
            .await;
        assert_eq!(failure_kind(&result), ErrorKind::InvalidArgument);
    }
}
