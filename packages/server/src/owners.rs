//! Teams and judges: owners that may reference one catalog image each.

use std::fmt;

use chrono::Utc;
use common::storage::BlobStore;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::catalog;
use crate::entity::owner;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Team,
    Judge,
}

impl OwnerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OwnerKind::Team => "team",
            OwnerKind::Judge => "judge",
        }
    }

    /// JSON key holding the owner id in client documents.
    pub fn id_field(self) -> &'static str {
        match self {
            OwnerKind::Team => "team_id",
            OwnerKind::Judge => "id",
        }
    }

    /// JSON key that held a filesystem image path before images moved to the catalog.
    pub fn legacy_path_field(self) -> &'static str {
        match self {
            OwnerKind::Team => "imagePath",
            OwnerKind::Judge => "image",
        }
    }

    pub fn default_image_path(self) -> &'static str {
        match self {
            OwnerKind::Team => "images/default-team.png",
            OwnerKind::Judge => "images/default-judge.png",
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path clients use to fetch a catalog image.
pub fn image_path(image_id: Uuid) -> String {
    format!("/image/{image_id}")
}

/// What a save does to the owner's image reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageChange {
    /// `image_id` absent: leave the stored reference alone.
    Keep,
    /// `image_id: null`.
    Clear,
    Set(Uuid),
}

/// One owner document as sent by a client.
#[derive(Debug, Clone)]
pub struct OwnerInput {
    pub id: String,
    pub name: String,
    pub image: ImageChange,
    pub extra: Map<String, Value>,
}

impl OwnerInput {
    /// Split a client document into the indexed fields and everything else.
    /// Returns `None` when the id or name is missing.
    pub fn from_json(kind: OwnerKind, value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };
        let id = fields.remove(kind.id_field()).and_then(scalar_string)?;
        let name = fields.remove("name").and_then(scalar_string)?;

        let image = match fields.remove("image_id") {
            None => ImageChange::Keep,
            Some(Value::Null) => ImageChange::Clear,
            Some(Value::String(s)) => match Uuid::parse_str(&s) {
                Ok(image_id) => ImageChange::Set(image_id),
                Err(_) => {
                    warn!(%kind, owner_id = %id, image_id = %s, "ignoring malformed image_id");
                    ImageChange::Keep
                }
            },
            Some(other) => {
                warn!(%kind, owner_id = %id, image_id = %other, "ignoring non-string image_id");
                ImageChange::Keep
            }
        };

        fields.remove("created_at");
        fields.remove("updated_at");
        // Derived paths are recomputed on every listing.
        if fields
            .get("imagePath")
            .and_then(Value::as_str)
            .is_some_and(is_derived_path)
        {
            fields.remove("imagePath");
        }

        Some(Self {
            id,
            name,
            image,
            extra: fields,
        })
    }
}

fn scalar_string(value: Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.trim().is_empty()).then_some(s)
}

fn is_derived_path(path: &str) -> bool {
    path.starts_with("/image/") || path.starts_with("/api/image/")
}

/// Render an owner row the way clients expect it: the extra fields, the id
/// under its kind-specific key, and an `imagePath` that always resolves.
pub fn to_view(kind: OwnerKind, model: &owner::Model) -> Value {
    let mut fields = match &model.extra {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    fields.insert(kind.id_field().into(), Value::String(model.id.clone()));
    fields.insert("name".into(), Value::String(model.name.clone()));

    let path = match model.image_id {
        Some(image_id) => {
            fields.insert("image_id".into(), Value::String(image_id.to_string()));
            image_path(image_id)
        }
        None => fields
            .get(kind.legacy_path_field())
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| kind.default_image_path().to_string()),
    };
    fields.insert("imagePath".into(), Value::String(path));
    Value::Object(fields)
}

pub async fn find<C: ConnectionTrait>(
    db: &C,
    kind: OwnerKind,
    owner_id: &str,
) -> Result<Option<owner::Model>, AppError> {
    Ok(owner::Entity::find_by_id((kind.as_str().to_string(), owner_id.to_string()))
        .one(db)
        .await?)
}

/// All owners of a kind, in creation order.
pub async fn list<C: ConnectionTrait>(db: &C, kind: OwnerKind) -> Result<Vec<Value>, AppError> {
    let owners = owner::Entity::find()
        .filter(owner::Column::Kind.eq(kind.as_str()))
        .order_by_asc(owner::Column::CreatedAt)
        .order_by_asc(owner::Column::Id)
        .all(db)
        .await?;
    Ok(owners.iter().map(|model| to_view(kind, model)).collect())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct SaveSummary {
    pub saved: usize,
    pub skipped: usize,
    /// Images deleted because their owner now points elsewhere.
    pub images_replaced: usize,
}

/// Insert or update each owner by id. Owners not in `documents` are left
/// alone. An image reference that changes releases the previous image.
#[instrument(skip(db, blobs, documents), fields(count = documents.len()))]
pub async fn save_upsert(
    db: &DatabaseConnection,
    blobs: &dyn BlobStore,
    kind: OwnerKind,
    documents: Vec<Value>,
) -> Result<SaveSummary, AppError> {
    let mut summary = SaveSummary::default();
    let mut superseded = Vec::new();

    let txn = db.begin().await?;
    for document in documents {
        let Some(input) = OwnerInput::from_json(kind, document) else {
            warn!(%kind, "skipping owner without id or name");
            summary.skipped += 1;
            continue;
        };
        if let Some(previous) = upsert_one(&txn, kind, input).await? {
            superseded.push(previous);
        }
        summary.saved += 1;
    }
    txn.commit().await?;

    for image_id in superseded {
        if !holders(db, image_id).await?.is_empty() {
            warn!(%kind, %image_id, "superseded image still referenced, keeping it");
            continue;
        }
        if catalog::delete_by_image_id(db, blobs, image_id).await? {
            summary.images_replaced += 1;
        }
    }

    info!(%kind, saved = summary.saved, skipped = summary.skipped, "owners saved");
    Ok(summary)
}

/// Upsert one owner. Returns the image id it no longer references, if any.
async fn upsert_one<C: ConnectionTrait>(
    conn: &C,
    kind: OwnerKind,
    input: OwnerInput,
) -> Result<Option<Uuid>, AppError> {
    let previous = find(conn, kind, &input.id)
        .await?
        .and_then(|existing| existing.image_id);

    let next = match input.image {
        ImageChange::Keep => previous,
        ImageChange::Clear => None,
        ImageChange::Set(image_id) if Some(image_id) == previous => previous,
        ImageChange::Set(image_id) => {
            if claimable(conn, kind, &input.id, image_id).await? {
                Some(image_id)
            } else {
                previous
            }
        }
    };

    let now = Utc::now();
    let model = owner::ActiveModel {
        kind: Set(kind.as_str().to_string()),
        id: Set(input.id),
        name: Set(input.name),
        image_id: Set(next),
        extra: Set(Value::Object(input.extra)),
        created_at: Set(now),
        updated_at: Set(now),
    };
    owner::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([owner::Column::Kind, owner::Column::Id])
                .update_columns([
                    owner::Column::Name,
                    owner::Column::ImageId,
                    owner::Column::Extra,
                    owner::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Ok(previous.filter(|old| Some(*old) != next))
}

/// An owner may point at an image only if it was uploaded for that owner id
/// and no other owner already holds it.
async fn claimable<C: ConnectionTrait>(
    conn: &C,
    kind: OwnerKind,
    owner_id: &str,
    image_id: Uuid,
) -> Result<bool, AppError> {
    let Some(record) = catalog::lookup(conn, image_id).await? else {
        warn!(%kind, owner_id, %image_id, "image not in catalog, keeping previous reference");
        return Ok(false);
    };
    if record.owner_id != owner_id {
        warn!(
            %kind,
            owner_id,
            %image_id,
            uploaded_for = %record.owner_id,
            "image was uploaded for another owner, keeping previous reference"
        );
        return Ok(false);
    }
    if let Some(holder) = holders(conn, image_id)
        .await?
        .into_iter()
        .find(|holder| holder.kind != kind.as_str() || holder.id != owner_id)
    {
        warn!(
            %kind,
            owner_id,
            %image_id,
            held_by = %format!("{}:{}", holder.kind, holder.id),
            "image already referenced, keeping previous reference"
        );
        return Ok(false);
    }
    Ok(true)
}

/// Owners currently referencing `image_id`.
async fn holders<C: ConnectionTrait>(conn: &C, image_id: Uuid) -> Result<Vec<owner::Model>, AppError> {
    Ok(owner::Entity::find()
        .filter(owner::Column::ImageId.eq(image_id))
        .all(conn)
        .await?)
}

/// Delete an owner and, with it, its image.
///
/// The owner row and catalog row go in one transaction; the blob is released
/// after commit.
#[instrument(skip(db, blobs))]
pub async fn delete(
    db: &DatabaseConnection,
    blobs: &dyn BlobStore,
    kind: OwnerKind,
    owner_id: &str,
) -> Result<(), AppError> {
    let txn = db.begin().await?;
    let existing = find(&txn, kind, owner_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{kind} {owner_id} not found")))?;

    owner::Entity::delete_by_id((existing.kind.clone(), existing.id.clone()))
        .exec(&txn)
        .await?;
    let removed = match existing.image_id {
        Some(image_id) if holders(&txn, image_id).await?.is_empty() => {
            catalog::remove_record(&txn, image_id).await?
        }
        Some(image_id) => {
            warn!(%kind, owner_id, %image_id, "image still referenced by another owner, keeping it");
            None
        }
        None => None,
    };
    txn.commit().await?;

    if let Some(record) = removed {
        catalog::discard_blob(blobs, &record).await;
    }
    info!(%kind, owner_id, had_image = existing.image_id.is_some(), "owner deleted");
    Ok(())
}
