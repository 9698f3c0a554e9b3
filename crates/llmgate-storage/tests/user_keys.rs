use llmgate_provider_core::{CredentialStore, UserCredential};
use llmgate_storage::SeaOrmCredentialStore;
use time::{Duration, OffsetDateTime};

async fn store() -> SeaOrmCredentialStore {
    let store = SeaOrmCredentialStore::connect("sqlite::memory:")
        .await
        .unwrap();
    store.sync().await.unwrap();
    store
}

#[tokio::test]
async fn user_keys_round_trip() {
    let store = store().await;
    let credential = UserCredential {
        api_key: Some("sk-user".to_string()),
        base_url: Some("https://user.example/v1".to_string()),
    };
    let expires_at = OffsetDateTime::now_utc() + Duration::days(1);
    store
        .upsert_user_key("u1", "OpenRouter", &credential, Some(expires_at))
        .await
        .unwrap();

    let fetched = store.get_user_credential("u1", "OpenRouter").await.unwrap();
    assert_eq!(fetched, Some(credential));
    assert!(store.get_user_credential("u2", "OpenRouter").await.unwrap().is_none());

    let row = store.get_user_key("u1", "OpenRouter").await.unwrap().unwrap();
    assert_eq!(row.expires_at.map(|at| at.unix_timestamp()), Some(expires_at.unix_timestamp()));
}

#[tokio::test]
async fn upsert_replaces_the_stored_value() {
    let store = store().await;
    let first = UserCredential {
        api_key: Some("sk-old".to_string()),
        base_url: None,
    };
    let second = UserCredential {
        api_key: Some("sk-new".to_string()),
        base_url: None,
    };
    store.upsert_user_key("u1", "Mistral", &first, None).await.unwrap();
    store.upsert_user_key("u1", "Mistral", &second, None).await.unwrap();

    let fetched = store.get_user_credential("u1", "Mistral").await.unwrap();
    assert_eq!(fetched.and_then(|c| c.api_key), Some("sk-new".to_string()));

    assert!(store.delete_user_key("u1", "Mistral").await.unwrap());
    assert!(!store.delete_user_key("u1", "Mistral").await.unwrap());
}
