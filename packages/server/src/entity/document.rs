use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// One of the flat collections, e.g. `questions`.
    pub collection: String,

    /// Zero-based order within the collection.
    pub position: i32,

    /// A JSON object; primitives are stored wrapped as `{"value": v}`.
    #[sea_orm(column_type = "Json")]
    pub body: serde_json::Value,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
