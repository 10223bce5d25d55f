pub mod credential_models;
pub mod credential_resolver;

pub use credential_models::{
    AppRegistration, CredentialBundle, CredentialError, CredentialSource, StoredToken,
};
pub use credential_resolver::{
    AccessTokenSource, CachingCredentialResolver, CredentialHandle, CredentialResolver,
    CredentialSettings, ManagedSecrets, SessionFactory,
};
