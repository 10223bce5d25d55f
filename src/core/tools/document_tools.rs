// =============================================================================
// DOCUMENT TOOL HANDLERS
// =============================================================================
//
// One async handler per `ToolCall` variant. Handlers receive an already
// resolved credential handle; they never resolve credentials themselves.
// Each returns the `data` payload of a successful dispatch.

use serde_json::{json, Value};

use super::tool_models::{
    AppendTextArgs, CreateDocumentArgs, DocumentRef, FormatTextArgs, ReadDocumentArgs,
    ReplaceTextArgs, SearchDocumentsArgs, ToolCall, ToolError,
};
use crate::core::credentials::CredentialHandle;
use crate::core::documents::{
    document_url, find_text_ranges, render_markdown, render_text, truncate_rendered, DocumentApi,
    EditRequest, FileQuery, InsertLocation, RenderFormat,
};

/// First index of a new document's body (index 0 is the section break).
const BODY_START_INDEX: i64 = 1;

pub async fn execute(
    api: &dyn DocumentApi,
    auth: &CredentialHandle,
    call: ToolCall,
) -> Result<Value, ToolError> {
    match call {
        ToolCall::ReadDocument(args) => read_document(api, auth, args).await,
        ToolCall::GetDocumentInfo(args) => get_document_info(api, auth, args).await,
        ToolCall::CreateDocument(args) => create_document(api, auth, args).await,
        ToolCall::AppendText(args) => append_text(api, auth, args).await,
        ToolCall::ReplaceText(args) => replace_text(api, auth, args).await,
        ToolCall::FormatText(args) => format_text(api, auth, args).await,
        ToolCall::SearchDocuments(args) => search_documents(api, auth, args).await,
    }
}

async fn read_document(
    api: &dyn DocumentApi,
    auth: &CredentialHandle,
    args: ReadDocumentArgs,
) -> Result<Value, ToolError> {
    let doc = api.get_document(auth, &args.document_id).await?;
    let rendered = match args.format {
        RenderFormat::Text => render_text(&doc),
        RenderFormat::Markdown => render_markdown(&doc),
    };

    Ok(Value::String(truncate_rendered(rendered, args.max_length)))
}

async fn get_document_info(
    api: &dyn DocumentApi,
    auth: &CredentialHandle,
    args: DocumentRef,
) -> Result<Value, ToolError> {
    let doc = api.get_document(auth, &args.document_id).await?;
    let stats = doc.stats();

    // Older responses without tabs still have exactly one (implicit) tab.
    let tab_count = doc.tab_count().max(1);

    Ok(json!({
        "document_id": args.document_id,
        "title": doc.title,
        "revision_id": doc.revision_id,
        "tab_count": tab_count,
        "paragraph_count": stats.paragraphs,
        "table_count": stats.tables,
        "character_count": stats.characters,
        "url": document_url(&args.document_id),
    }))
}

async fn create_document(
    api: &dyn DocumentApi,
    auth: &CredentialHandle,
    args: CreateDocumentArgs,
) -> Result<Value, ToolError> {
    let created = api.create_document(auth, args.title.trim()).await?;
    tracing::info!(document_id = %created.document_id, "Created document");

    if let Some(content) = args.content.filter(|c| !c.is_empty()) {
        let insert = EditRequest::InsertText {
            location: InsertLocation::Index(BODY_START_INDEX),
            text: content,
        };
        api.batch_update(auth, &created.document_id, &[insert]).await?;
    }

    Ok(json!({
        "document_id": created.document_id,
        "title": created.title,
        "url": document_url(&created.document_id),
    }))
}

async fn append_text(
    api: &dyn DocumentApi,
    auth: &CredentialHandle,
    args: AppendTextArgs,
) -> Result<Value, ToolError> {
    let inserted_characters = args.text.chars().count();
    let insert = EditRequest::InsertText {
        location: InsertLocation::EndOfBody,
        text: args.text,
    };
    api.batch_update(auth, &args.document_id, &[insert]).await?;

    Ok(json!({
        "document_id": args.document_id,
        "inserted_characters": inserted_characters,
    }))
}

async fn replace_text(
    api: &dyn DocumentApi,
    auth: &CredentialHandle,
    args: ReplaceTextArgs,
) -> Result<Value, ToolError> {
    let replace = EditRequest::ReplaceAllText {
        find: args.find,
        replace: args.replace,
        match_case: args.match_case,
    };
    let outcome = api.batch_update(auth, &args.document_id, &[replace]).await?;

    Ok(json!({
        "document_id": args.document_id,
        "occurrences_changed": outcome.occurrences_changed,
    }))
}

async fn format_text(
    api: &dyn DocumentApi,
    auth: &CredentialHandle,
    args: FormatTextArgs,
) -> Result<Value, ToolError> {
    let style = args.style();
    let doc = api.get_document(auth, &args.document_id).await?;

    let ranges = doc
        .primary_body()
        .map(|body| find_text_ranges(body, &args.find, args.all_occurrences))
        .unwrap_or_default();

    if ranges.is_empty() {
        return Err(ToolError::NotFound(format!(
            "text \"{}\" not found in document {}",
            args.find, args.document_id
        )));
    }

    let requests: Vec<EditRequest> = ranges
        .iter()
        .map(|range| EditRequest::UpdateTextStyle {
            range: *range,
            style: style.clone(),
        })
        .collect();
    api.batch_update(auth, &args.document_id, &requests).await?;

    Ok(json!({
        "document_id": args.document_id,
        "ranges_formatted": ranges.len(),
    }))
}

async fn search_documents(
    api: &dyn DocumentApi,
    auth: &CredentialHandle,
    args: SearchDocumentsArgs,
) -> Result<Value, ToolError> {
    let query = FileQuery {
        text: args.query.trim().to_string(),
        max_results: args.max_results,
    };
    let files = api.search_files(auth, &query).await?;

    let results: Vec<Value> = files
        .into_iter()
        .map(|file| {
            let url = file
                .web_view_link
                .clone()
                .unwrap_or_else(|| document_url(&file.id));
            json!({
                "document_id": file.id,
                "name": file.name,
                "modified_time": file.modified_time.map(|t| t.to_rfc3339()),
                "url": url,
            })
        })
        .collect();

    Ok(json!({
        "query": query.text,
        "results": results,
    }))
}
