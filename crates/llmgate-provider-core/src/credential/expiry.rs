use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

use crate::{ProviderError, UserKeyError};

/// Rejects a user credential claim whose expiry is now or in the past.
pub fn check_user_key_expiry(
    expires_at: OffsetDateTime,
    endpoint: &str,
) -> Result<(), ProviderError> {
    check_user_key_expiry_at(expires_at, OffsetDateTime::now_utc(), endpoint)
}

pub fn check_user_key_expiry_at(
    expires_at: OffsetDateTime,
    now: OffsetDateTime,
    endpoint: &str,
) -> Result<(), ProviderError> {
    if expires_at > now {
        return Ok(());
    }
    let expired_at = expires_at
        .format(&Rfc3339)
        .unwrap_or_else(|_| expires_at.unix_timestamp().to_string());
    warn!(
        event = "user_key_expired",
        endpoint = %endpoint,
        expired_at = %expired_at
    );
    Err(ProviderError::UserKey(UserKeyError::ExpiredUserKey {
        expired_at,
        endpoint: endpoint.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    #[test]
    fn one_second_in_the_past_fails() {
        let now = OffsetDateTime::now_utc();
        let err = check_user_key_expiry_at(now - Duration::seconds(1), now, "OpenRouter")
            .unwrap_err();
        match err {
            ProviderError::UserKey(UserKeyError::ExpiredUserKey { endpoint, .. }) => {
                assert_eq!(endpoint, "OpenRouter");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn one_second_in_the_future_passes() {
        let now = OffsetDateTime::now_utc();
        check_user_key_expiry_at(now + Duration::seconds(1), now, "OpenRouter").unwrap();
        check_user_key_expiry(now + Duration::minutes(5), "OpenRouter").unwrap();
    }

    #[test]
    fn exactly_now_counts_as_expired() {
        let now = OffsetDateTime::now_utc();
        assert!(check_user_key_expiry_at(now, now, "OpenRouter").is_err());
    }
}
