use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::UserCredential;

#[derive(Debug, Clone)]
pub struct StoreError(pub String);

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for StoreError {}

/// Read side of the saved-credential store, keyed by user and endpoint name.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_user_credential(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<UserCredential>, StoreError>;
}

/// In-process store, used when no DSN is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<(String, String), UserCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(
        &self,
        user_id: impl Into<String>,
        name: impl Into<String>,
        credential: UserCredential,
    ) {
        self.entries
            .write()
            .await
            .insert((user_id.into(), name.into()), credential);
    }

    pub async fn remove(&self, user_id: &str, name: &str) -> Option<UserCredential> {
        self.entries
            .write()
            .await
            .remove(&(user_id.to_string(), name.to_string()))
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_user_credential(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<UserCredential>, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .get(&(user_id.to_string(), name.to_string()))
            .cloned())
    }
}
