//! Credential policy shared by every initializer.

use llmgate_provider_core::{
    CredentialField, CredentialStore, ProviderError, ProviderResult, RequestContext,
    ResolvedCredential, UserCredential, UserKeyError, check_user_key_expiry,
    is_unresolved_placeholder, is_user_provided, resolve_placeholder,
};
use tracing::{debug, error};

/// Operator-declared credential values for one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct CredentialSource<'a> {
    /// Endpoint name used in messages and as the store lookup name.
    pub endpoint: &'a str,
    pub api_key: Option<&'a str>,
    pub base_url: Option<&'a str>,
    /// First-party providers fall back to their public URL, so an empty one is fine.
    pub require_base_url: bool,
}

pub async fn resolve_credentials(
    store: &dyn CredentialStore,
    request: &RequestContext,
    source: CredentialSource<'_>,
) -> ProviderResult<ResolvedCredential> {
    let endpoint = source.endpoint;
    let api_key = resolve_placeholder(source.api_key.unwrap_or_default());
    let base_url = resolve_placeholder(source.base_url.unwrap_or_default());

    if is_unresolved_placeholder(&api_key) {
        return Err(unresolved(endpoint, CredentialField::ApiKey, true));
    }
    if is_unresolved_placeholder(&base_url) {
        return Err(unresolved(endpoint, CredentialField::BaseUrl, true));
    }

    let user_provides_key = is_user_provided(&api_key);
    let user_provides_url = is_user_provided(&base_url);

    let mut user_values: Option<UserCredential> = None;
    if let Some(expires_at) = request.key_expires_at
        && (user_provides_key || user_provides_url)
    {
        check_user_key_expiry(expires_at, endpoint)?;
        user_values = store
            .get_user_credential(&request.user_id, endpoint)
            .await
            .map_err(|err| {
                error!(
                    event = "credential_store_read_failed",
                    endpoint = %endpoint,
                    error = %err
                );
                ProviderError::Store(err.to_string())
            })?;
        debug!(
            event = "user_credential_lookup",
            endpoint = %endpoint,
            found = user_values.is_some()
        );
    }

    let api_key = if user_provides_key {
        user_values
            .as_ref()
            .and_then(UserCredential::api_key)
            .map(str::to_string)
            .ok_or(UserKeyError::NoUserKey)?
    } else {
        api_key
    };
    let base_url = if user_provides_url {
        user_values
            .as_ref()
            .and_then(UserCredential::base_url)
            .map(str::to_string)
            .ok_or(UserKeyError::NoBaseUrl)?
    } else {
        base_url
    };

    if api_key.is_empty() {
        return Err(unresolved(endpoint, CredentialField::ApiKey, false));
    }
    if base_url.is_empty() && source.require_base_url {
        return Err(unresolved(endpoint, CredentialField::BaseUrl, false));
    }

    Ok(ResolvedCredential {
        api_key,
        base_url,
        user_provides_key,
        user_provides_url,
    })
}

fn unresolved(endpoint: &str, field: CredentialField, placeholder: bool) -> ProviderError {
    let err = ProviderError::CredentialUnresolved {
        endpoint: endpoint.to_string(),
        field,
        placeholder,
    };
    error!(event = "credential_unresolved", endpoint = %endpoint, error = %err);
    err
}
