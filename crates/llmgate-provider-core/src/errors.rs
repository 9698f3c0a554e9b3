use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialField {
    ApiKey,
    BaseUrl,
}

/// Credential-policy failures the boundary layer renders as a "connect your key" prompt.
///
/// `Display` produces the JSON payload, e.g. `{"type":"no_user_key"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserKeyError {
    NoUserKey,
    NoBaseUrl,
    ExpiredUserKey {
        #[serde(rename = "expiredAt")]
        expired_at: String,
        endpoint: String,
    },
}

impl UserKeyError {
    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for UserKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(payload) => f.write_str(&payload),
            Err(_) => f.write_str("{\"type\":\"unknown\"}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No initializer and no custom endpoint for the identifier.
    Unsupported(String),
    ConfigNotFound(String),
    /// Operator-side misconfiguration. `placeholder` is set when the value was still
    /// an unresolved `${VAR}` after substitution.
    CredentialUnresolved {
        endpoint: String,
        field: CredentialField,
        placeholder: bool,
    },
    UserKey(UserKeyError),
    Store(String),
}

impl ProviderError {
    pub fn user_key_payload(&self) -> Option<serde_json::Value> {
        match self {
            ProviderError::UserKey(err) => Some(err.payload()),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Unsupported(provider) => write!(f, "Provider {provider} not supported"),
            ProviderError::ConfigNotFound(endpoint) => {
                write!(f, "Config not found for the {endpoint} custom endpoint.")
            }
            ProviderError::CredentialUnresolved {
                endpoint,
                field,
                placeholder: true,
            } => match field {
                CredentialField::ApiKey => write!(f, "Missing API Key for {endpoint}."),
                CredentialField::BaseUrl => write!(f, "Missing Base URL for {endpoint}."),
            },
            ProviderError::CredentialUnresolved {
                endpoint,
                field,
                placeholder: false,
            } => match field {
                CredentialField::ApiKey => write!(f, "{endpoint} API key not provided."),
                CredentialField::BaseUrl => write!(f, "{endpoint} Base URL not provided."),
            },
            ProviderError::UserKey(err) => write!(f, "{err}"),
            ProviderError::Store(msg) => write!(f, "credential store error: {msg}"),
        }
    }
}

impl Error for ProviderError {}

impl From<UserKeyError> for ProviderError {
    fn from(value: UserKeyError) -> Self {
        ProviderError::UserKey(value)
    }
}
