// The core module contains all business logic.
// Each feature gets its own submodule; none of them performs HTTP directly.

#[path = "credentials/mod.rs"]
pub mod credentials;

#[path = "documents/mod.rs"]
pub mod documents;

#[path = "tools/mod.rs"]
pub mod tools;
