//! Authentication: the session context and stored credentials.
//!
//! - `Session`: cookie-based session persisted in the cache directory and
//!   handed explicitly to the API client
//! - `CredentialStore`: password storage in the OS keychain via keyring

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};
