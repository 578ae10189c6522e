use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "owner")]
pub struct Model {
    /// `team` or `judge`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub kind: String,

    /// Client-chosen owner id, stable across saves.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    /// Weak reference into `image_record`.
    pub image_id: Option<Uuid>,

    /// Every other field the client sent, kept verbatim.
    #[sea_orm(column_type = "Json")]
    pub extra: serde_json::Value,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
