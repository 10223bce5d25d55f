// The tool catalogue: one descriptor per `ToolName`.

use super::tool_models::ToolName;
use super::tool_schema::{ArgSchema, FieldKind, FieldSpec};

/// Immutable description of a registered tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolDescriptor {
    pub name: ToolName,
    pub description: &'static str,
    pub schema: &'static ArgSchema,
}

const DOCUMENT_ID: FieldSpec = FieldSpec {
    name: "document_id",
    kind: FieldKind::DocumentId,
    required: true,
    description: "Google Docs document ID or full document URL",
};

static READ_DOCUMENT: ArgSchema = ArgSchema {
    fields: &[
        DOCUMENT_ID,
        FieldSpec {
            name: "format",
            kind: FieldKind::Choice(&["text", "markdown"]),
            required: false,
            description: "Output format (default: markdown)",
        },
        FieldSpec {
            name: "max_length",
            kind: FieldKind::Integer { min: 1, max: None },
            required: false,
            description: "Truncate the rendered output to this many characters",
        },
    ],
    at_least_one_of: &[],
};

static GET_DOCUMENT_INFO: ArgSchema = ArgSchema {
    fields: &[DOCUMENT_ID],
    at_least_one_of: &[],
};

static CREATE_DOCUMENT: ArgSchema = ArgSchema {
    fields: &[
        FieldSpec {
            name: "title",
            kind: FieldKind::Text { non_empty: true },
            required: true,
            description: "Title of the new document",
        },
        FieldSpec {
            name: "content",
            kind: FieldKind::Text { non_empty: false },
            required: false,
            description: "Initial plain text content",
        },
    ],
    at_least_one_of: &[],
};

static APPEND_TEXT: ArgSchema = ArgSchema {
    fields: &[
        DOCUMENT_ID,
        FieldSpec {
            name: "text",
            kind: FieldKind::Text { non_empty: true },
            required: true,
            description: "Text to append at the end of the document",
        },
    ],
    at_least_one_of: &[],
};

static REPLACE_TEXT: ArgSchema = ArgSchema {
    fields: &[
        DOCUMENT_ID,
        FieldSpec {
            name: "find",
            kind: FieldKind::Text { non_empty: true },
            required: true,
            description: "Text to search for",
        },
        FieldSpec {
            name: "replace",
            kind: FieldKind::Text { non_empty: false },
            required: true,
            description: "Replacement text (may be empty)",
        },
        FieldSpec {
            name: "match_case",
            kind: FieldKind::Boolean,
            required: false,
            description: "Case-sensitive matching (default: true)",
        },
    ],
    at_least_one_of: &[],
};

static FORMAT_TEXT: ArgSchema = ArgSchema {
    fields: &[
        DOCUMENT_ID,
        FieldSpec {
            name: "find",
            kind: FieldKind::Text { non_empty: true },
            required: true,
            description: "Exact text to format",
        },
        FieldSpec {
            name: "bold",
            kind: FieldKind::Boolean,
            required: false,
            description: "Set or clear bold",
        },
        FieldSpec {
            name: "italic",
            kind: FieldKind::Boolean,
            required: false,
            description: "Set or clear italic",
        },
        FieldSpec {
            name: "underline",
            kind: FieldKind::Boolean,
            required: false,
            description: "Set or clear underline",
        },
        FieldSpec {
            name: "strikethrough",
            kind: FieldKind::Boolean,
            required: false,
            description: "Set or clear strikethrough",
        },
        FieldSpec {
            name: "link_url",
            kind: FieldKind::Url,
            required: false,
            description: "Turn the text into a link to this URL",
        },
        FieldSpec {
            name: "all_occurrences",
            kind: FieldKind::Boolean,
            required: false,
            description: "Format every occurrence instead of only the first (default: false)",
        },
    ],
    at_least_one_of: &["bold", "italic", "underline", "strikethrough", "link_url"],
};

static SEARCH_DOCUMENTS: ArgSchema = ArgSchema {
    fields: &[
        FieldSpec {
            name: "query",
            kind: FieldKind::Text { non_empty: true },
            required: true,
            description: "Text to look for in document names and content",
        },
        FieldSpec {
            name: "max_results",
            kind: FieldKind::Integer {
                min: 1,
                max: Some(100),
            },
            required: false,
            description: "Maximum number of results (1-100, default: 10)",
        },
    ],
    at_least_one_of: &[],
};

pub fn descriptor(name: ToolName) -> ToolDescriptor {
    let (description, schema) = match name {
        ToolName::ReadDocument => (
            "Read a Google Doc and return its content as Markdown or plain text. \
             Multi-tab documents are rendered tab by tab.",
            &READ_DOCUMENT,
        ),
        ToolName::GetDocumentInfo => (
            "Get a Google Doc's title, revision and structure counts without its content.",
            &GET_DOCUMENT_INFO,
        ),
        ToolName::CreateDocument => (
            "Create a new Google Doc, optionally with initial text.",
            &CREATE_DOCUMENT,
        ),
        ToolName::AppendText => (
            "Append plain text to the end of a Google Doc.",
            &APPEND_TEXT,
        ),
        ToolName::ReplaceText => (
            "Replace every occurrence of a string in a Google Doc.",
            &REPLACE_TEXT,
        ),
        ToolName::FormatText => (
            "Apply bold, italic, underline, strikethrough or a link to text in a Google Doc.",
            &FORMAT_TEXT,
        ),
        ToolName::SearchDocuments => (
            "Search Google Drive for Docs whose name or content matches a query.",
            &SEARCH_DOCUMENTS,
        ),
    };

    ToolDescriptor {
        name,
        description,
        schema,
    }
}
