// =============================================================================
// GOOGLE DOCS MODULE
// =============================================================================
//
// REST client for the Docs and Drive APIs. This lives in the infra layer
// because it does the HTTP; the core only sees the `DocumentApi` port and the
// snapshot model.

pub mod google_docs_client;

pub use google_docs_client::{GoogleDocsClient, DEFAULT_DOCS_API_BASE, DEFAULT_DRIVE_API_BASE};
