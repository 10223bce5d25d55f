// The infra module contains implementations of core traits.
// Each external service gets its own submodule.

#[path = "google_auth/mod.rs"]
pub mod google_auth;

#[path = "google_docs/mod.rs"]
pub mod google_docs;
