pub mod document_api;
pub mod document_models;
pub mod document_renderer;
pub mod text_locator;

pub use document_api::{
    BatchUpdateOutcome, CreatedDocument, DocumentApi, DocumentApiError, EditRequest, FileQuery,
    FileSummary, InsertLocation, StylePatch, TextRange,
};
pub use document_models::{document_url, extract_document_id, DocumentSnapshot};
pub use document_renderer::{render_markdown, render_text, truncate_rendered, RenderFormat};
pub use text_locator::find_text_ranges;
