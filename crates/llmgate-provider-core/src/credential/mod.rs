mod expiry;
mod store;

pub use expiry::{check_user_key_expiry, check_user_key_expiry_at};
pub use store::{CredentialStore, MemoryCredentialStore, StoreError};

use serde::{Deserialize, Serialize};

/// A caller's saved credential for one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredential {
    #[serde(
        default,
        rename = "apiKey",
        alias = "api_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<String>,
    #[serde(
        default,
        rename = "baseURL",
        alias = "base_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub base_url: Option<String>,
}

impl UserCredential {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|value| !value.is_empty())
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref().filter(|value| !value.is_empty())
    }
}

/// Credential material resolved for one request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub api_key: String,
    pub base_url: String,
    pub user_provides_key: bool,
    pub user_provides_url: bool,
}

impl ResolvedCredential {
    pub fn is_user_scoped(&self) -> bool {
        self.user_provides_key || self.user_provides_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_value_accepts_both_spellings() {
        let camel: UserCredential =
            serde_json::from_str(r#"{"apiKey":"sk-1","baseURL":"https://x/v1"}"#).unwrap();
        let snake: UserCredential =
            serde_json::from_str(r#"{"api_key":"sk-1","base_url":"https://x/v1"}"#).unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel.api_key(), Some("sk-1"));
    }

    #[test]
    fn empty_fields_read_as_absent() {
        let cred = UserCredential {
            api_key: Some(String::new()),
            base_url: None,
        };
        assert_eq!(cred.api_key(), None);
        assert_eq!(cred.base_url(), None);
    }
}
