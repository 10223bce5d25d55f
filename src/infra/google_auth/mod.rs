// Google OAuth plumbing: the refreshable session behind `CredentialHandle`
// and the factory the credential resolver uses to open it.

pub mod oauth_session;

pub use oauth_session::{GoogleSessionFactory, DEFAULT_TOKENINFO_URL};
