use async_trait::async_trait;
use llmgate_provider_core::{CredentialStore, StoreError, UserCredential};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, Database, DatabaseBackend,
    DatabaseConnection, EntityTrait, QueryFilter, Schema,
};
use time::OffsetDateTime;
use tracing::debug;

use crate::entities;
use crate::entities::user_keys::{ActiveModel as UserKeyActive, Column, Model as UserKeyModel};
use crate::storage::StorageResult;

#[derive(Debug, Clone, PartialEq)]
pub struct UserKeyRow {
    pub user_id: String,
    pub name: String,
    pub credential: UserCredential,
    pub expires_at: Option<OffsetDateTime>,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserKeyModel> for UserKeyRow {
    type Error = serde_json::Error;

    fn try_from(model: UserKeyModel) -> Result<Self, Self::Error> {
        Ok(Self {
            credential: serde_json::from_value(model.value)?,
            user_id: model.user_id,
            name: model.name,
            expires_at: model.expires_at,
            updated_at: model.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SeaOrmCredentialStore {
    db: DatabaseConnection,
}

impl SeaOrmCredentialStore {
    pub async fn connect(dsn: &str) -> StorageResult<Self> {
        let db = Database::connect(dsn).await?;
        if db.get_database_backend() == DatabaseBackend::Sqlite {
            db.execute_unprepared("PRAGMA foreign_keys = ON").await?;
        }
        Ok(Self { db })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Entity-first schema sync.
    pub async fn sync(&self) -> StorageResult<()> {
        Schema::new(self.db.get_database_backend())
            .builder()
            .register(entities::UserKeys)
            .sync(&self.db)
            .await?;
        Ok(())
    }

    async fn find(&self, user_id: &str, name: &str) -> StorageResult<Option<UserKeyModel>> {
        Ok(entities::UserKeys::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Name.eq(name))
            .one(&self.db)
            .await?)
    }

    pub async fn upsert_user_key(
        &self,
        user_id: &str,
        name: &str,
        credential: &UserCredential,
        expires_at: Option<OffsetDateTime>,
    ) -> StorageResult<()> {
        let now = OffsetDateTime::now_utc();
        let value = serde_json::to_value(credential)?;

        match self.find(user_id, name).await? {
            Some(model) => {
                let mut active: UserKeyActive = model.into();
                active.value = ActiveValue::Set(value);
                active.expires_at = ActiveValue::Set(expires_at);
                active.updated_at = ActiveValue::Set(now);
                active.update(&self.db).await?;
            }
            None => {
                let active = UserKeyActive {
                    id: ActiveValue::NotSet,
                    user_id: ActiveValue::Set(user_id.to_string()),
                    name: ActiveValue::Set(name.to_string()),
                    value: ActiveValue::Set(value),
                    expires_at: ActiveValue::Set(expires_at),
                    created_at: ActiveValue::Set(now),
                    updated_at: ActiveValue::Set(now),
                };
                entities::UserKeys::insert(active).exec(&self.db).await?;
            }
        }
        debug!(event = "user_key_upserted", name = %name);
        Ok(())
    }

    pub async fn get_user_key(
        &self,
        user_id: &str,
        name: &str,
    ) -> StorageResult<Option<UserKeyRow>> {
        let Some(model) = self.find(user_id, name).await? else {
            return Ok(None);
        };
        Ok(Some(UserKeyRow::try_from(model)?))
    }

    /// Returns whether a row was removed.
    pub async fn delete_user_key(&self, user_id: &str, name: &str) -> StorageResult<bool> {
        let result = entities::UserKeys::delete_many()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Name.eq(name))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl CredentialStore for SeaOrmCredentialStore {
    async fn get_user_credential(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<UserCredential>, StoreError> {
        self.get_user_key(user_id, name)
            .await
            .map(|row| row.map(|row| row.credential))
            .map_err(|err| StoreError(err.to_string()))
    }
}
