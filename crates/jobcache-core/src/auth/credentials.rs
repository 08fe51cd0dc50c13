use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "jobcache";

/// Passwords remembered in the OS keychain, keyed by email.
pub struct CredentialStore;

impl CredentialStore {
    pub fn store(email: &str, password: &str) -> Result<()> {
        Self::entry(email)?
            .set_password(password)
            .context("Failed to store password in keychain")
    }

    pub fn get_password(email: &str) -> Result<String> {
        Self::entry(email)?
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    pub fn delete(email: &str) -> Result<()> {
        Self::entry(email)?
            .delete_credential()
            .context("Failed to delete credential from keychain")
    }

    pub fn has_credentials(email: &str) -> bool {
        Self::entry(email)
            .map(|entry| entry.get_password().is_ok())
            .unwrap_or(false)
    }

    fn entry(email: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")
    }
}
