//! Flat collections replaced wholesale on every save.

use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde_json::{Map, Value};
use tracing::{info, instrument};

use crate::entity::document;
use crate::error::AppError;

/// Collections the document store accepts.
pub const COLLECTIONS: [&str; 4] = [
    "questions",
    "used_judges",
    "used_questions",
    "used_final_questions",
];

const WRAPPED_KEY: &str = "value";

/// How one element of a collection is persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredDocument {
    /// A JSON object, stored as-is.
    Record(Map<String, Value>),
    /// Any other JSON value, stored as `{"value": v}`.
    Wrapped(Value),
}

impl StoredDocument {
    pub fn encode(value: Value) -> Self {
        match value {
            Value::Object(map) if !is_wrapper(&map) => StoredDocument::Record(map),
            other => StoredDocument::Wrapped(other),
        }
    }

    /// Read a persisted body back. A body whose only key is `value` is a
    /// wrapped primitive.
    pub fn from_body(body: Value) -> Self {
        match body {
            Value::Object(mut map) if is_wrapper(&map) => {
                StoredDocument::Wrapped(map.remove(WRAPPED_KEY).unwrap_or(Value::Null))
            }
            Value::Object(map) => StoredDocument::Record(map),
            other => StoredDocument::Wrapped(other),
        }
    }

    pub fn to_body(&self) -> Value {
        match self {
            StoredDocument::Record(map) => Value::Object(map.clone()),
            StoredDocument::Wrapped(value) => {
                let mut map = Map::new();
                map.insert(WRAPPED_KEY.into(), value.clone());
                Value::Object(map)
            }
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            StoredDocument::Record(map) => Value::Object(map),
            StoredDocument::Wrapped(value) => value,
        }
    }
}

fn is_wrapper(map: &Map<String, Value>) -> bool {
    map.len() == 1 && map.contains_key(WRAPPED_KEY)
}

pub fn is_collection(name: &str) -> bool {
    COLLECTIONS.contains(&name)
}

/// Replace the whole collection with `values`, in order.
///
/// A non-array payload is stored as a single-element collection.
#[instrument(skip(db, values))]
pub async fn replace_all(
    db: &DatabaseConnection,
    collection: &str,
    values: Value,
) -> Result<usize, AppError> {
    let items = match values {
        Value::Array(items) => items,
        other => vec![other],
    };

    let txn = db.begin().await?;
    document::Entity::delete_many()
        .filter(document::Column::Collection.eq(collection))
        .exec(&txn)
        .await?;

    let now = Utc::now();
    let count = items.len();
    if count > 0 {
        let rows = items.into_iter().enumerate().map(|(position, value)| document::ActiveModel {
            collection: Set(collection.to_string()),
            position: Set(position as i32),
            body: Set(StoredDocument::encode(value).to_body()),
            updated_at: Set(now),
            ..Default::default()
        });
        document::Entity::insert_many(rows)
            .exec_without_returning(&txn)
            .await?;
    }
    txn.commit().await?;

    info!(collection, count, "collection replaced");
    Ok(count)
}

/// The collection's values in saved order, wrapped primitives unwrapped.
pub async fn list<C: ConnectionTrait>(db: &C, collection: &str) -> Result<Vec<Value>, AppError> {
    let rows = document::Entity::find()
        .filter(document::Column::Collection.eq(collection))
        .order_by_asc(document::Column::Position)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| StoredDocument::from_body(row.body).into_value())
        .collect())
}
