use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// A user's saved credential for one endpoint. `value` holds `{apiKey, baseURL}`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_keys")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique_key = "user_key_endpoint")]
    pub user_id: String,
    #[sea_orm(unique_key = "user_key_endpoint")]
    pub name: String,
    pub value: Json,
    pub expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}
