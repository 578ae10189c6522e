//! One-shot import of the legacy JSON files and their image sidecars.
//!
//! Each legacy image goes through the same pipeline as a live upload. A
//! record whose image cannot be imported is still saved, just without an
//! image reference.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::ImagingConfig;
use common::imaging::{IngestError, ingest_data_url};
use common::storage::BlobStore;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::{self, ImageOwner};
use crate::config::MigrationConfig;
use crate::documents::{self, COLLECTIONS};
use crate::error::AppError;
use crate::owners::{self, OwnerInput, OwnerKind};

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{} must contain a JSON list", .0.display())]
    NotAList(PathBuf),
    #[error("store failure: {0}")]
    Store(AppError),
}

/// Why one legacy image could not be imported.
#[derive(Debug, thiserror::Error)]
enum ImageImportError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Ingest(#[from] IngestError),
    /// Store or worker failure. Aborts the run instead of counting as a
    /// per-record failure.
    #[error("{0}")]
    Fatal(AppError),
}

impl From<AppError> for ImageImportError {
    fn from(err: AppError) -> Self {
        ImageImportError::Fatal(err)
    }
}

impl From<AppError> for MigrationError {
    fn from(err: AppError) -> Self {
        MigrationError::Store(err)
    }
}

/// What one run imported.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub teams: usize,
    pub judges: usize,
    pub images_migrated: usize,
    pub image_failures: usize,
    /// Values written per flat collection.
    pub documents: BTreeMap<String, usize>,
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "teams:           {}", self.teams)?;
        writeln!(f, "judges:          {}", self.judges)?;
        writeln!(f, "images migrated: {}", self.images_migrated)?;
        write!(f, "image failures:  {}", self.image_failures)?;
        for (collection, count) in &self.documents {
            write!(f, "\n{collection}: {count}")?;
        }
        Ok(())
    }
}

struct Importer<'a> {
    db: &'a DatabaseConnection,
    blobs: &'a dyn BlobStore,
    imaging: &'a ImagingConfig,
    asset_root: &'a Path,
}

/// Import `teams.json`, `judges.json` and the flat collection files found in
/// `config.legacy_dir`. Missing files are skipped.
///
/// Re-running replaces each owner's image instead of leaking the old one.
#[instrument(skip_all, fields(legacy_dir = %config.legacy_dir.display()))]
pub async fn run_migration(
    db: &DatabaseConnection,
    blobs: &dyn BlobStore,
    imaging: &ImagingConfig,
    config: &MigrationConfig,
) -> Result<MigrationReport, MigrationError> {
    let importer = Importer {
        db,
        blobs,
        imaging,
        asset_root: &config.asset_root,
    };
    let mut report = MigrationReport::default();

    for kind in [OwnerKind::Team, OwnerKind::Judge] {
        let path = config.legacy_dir.join(format!("{kind}s.json"));
        let Some(records) = read_json(&path).await? else {
            continue;
        };
        let Value::Array(records) = records else {
            return Err(MigrationError::NotAList(path));
        };
        let saved = importer.import_owners(kind, records, &mut report).await?;
        match kind {
            OwnerKind::Team => report.teams = saved,
            OwnerKind::Judge => report.judges = saved,
        }
        info!(%kind, saved, "owners migrated");
    }

    for collection in COLLECTIONS {
        let path = config.legacy_dir.join(format!("{collection}.json"));
        let Some(values) = read_json(&path).await? else {
            continue;
        };
        let count = documents::replace_all(db, collection, values).await?;
        report.documents.insert(collection.to_string(), count);
    }

    info!(
        teams = report.teams,
        judges = report.judges,
        images = report.images_migrated,
        failures = report.image_failures,
        "migration complete"
    );
    Ok(report)
}

impl Importer<'_> {
    async fn import_owners(
        &self,
        kind: OwnerKind,
        records: Vec<Value>,
        report: &mut MigrationReport,
    ) -> Result<usize, MigrationError> {
        let path_field = kind.legacy_path_field();
        let mut prepared = Vec::with_capacity(records.len());
        let mut imported = Vec::new();

        for record in records {
            let Some(input) = OwnerInput::from_json(kind, record.clone()) else {
                warn!(%kind, "skipping legacy record without id or name");
                continue;
            };
            let Value::Object(mut fields) = record else {
                continue;
            };

            let legacy_path = fields
                .get(path_field)
                .and_then(Value::as_str)
                .filter(|path| is_legacy_image_path(kind, path))
                .map(str::to_string);

            if let Some(legacy_path) = legacy_path {
                let owner = ImageOwner {
                    id: input.id.clone(),
                    name: input.name.clone(),
                };
                match self.import_image(&legacy_path, &owner).await {
                    Ok(image_id) => {
                        fields.remove(path_field);
                        fields.insert("image_id".into(), Value::String(image_id.to_string()));
                        imported.push(image_id);
                        report.images_migrated += 1;
                    }
                    Err(ImageImportError::Fatal(err)) => {
                        error!(%kind, owner_id = %owner.id, path = %legacy_path, error = %err, "store failed during image import");
                        self.discard(imported).await;
                        return Err(MigrationError::Store(err));
                    }
                    Err(err) => {
                        warn!(%kind, owner_id = %owner.id, path = %legacy_path, error = %err, "image not migrated");
                        fields.insert("image_id".into(), Value::Null);
                        report.image_failures += 1;
                    }
                }
            }
            prepared.push(Value::Object(fields));
        }

        match owners::save_upsert(self.db, self.blobs, kind, prepared).await {
            Ok(summary) => Ok(summary.saved),
            Err(err) => {
                // The owners never landed, so their fresh images are unreferenced.
                self.discard(imported).await;
                Err(err.into())
            }
        }
    }

    async fn discard(&self, imported: Vec<Uuid>) {
        for image_id in imported {
            if let Err(cleanup) = catalog::delete_by_image_id(self.db, self.blobs, image_id).await {
                error!(%image_id, error = %cleanup, "failed to remove image after import aborted");
            }
        }
    }

    /// Read a legacy file and feed it through the upload pipeline.
    async fn import_image(
        &self,
        legacy_path: &str,
        owner: &ImageOwner,
    ) -> Result<Uuid, ImageImportError> {
        let path = resolve_legacy_path(self.asset_root, legacy_path);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(source) => return Err(ImageImportError::Read { path, source }),
        };

        let data_url = format!(
            "data:{};base64,{}",
            mime_for_path(&path, self.imaging),
            STANDARD.encode(&bytes)
        );
        let config = self.imaging.clone();
        let outcome = tokio::task::spawn_blocking(move || ingest_data_url(&config, &data_url))
            .await
            .map_err(AppError::from)??;

        let record = catalog::store_image(self.db, self.blobs, &outcome, owner).await?;
        Ok(record.id)
    }
}

async fn read_json(path: &Path) -> Result<Option<Value>, MigrationError> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(MigrationError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|source| MigrationError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Teams stored paths as `images/...` or `../../...`; judges only as `images/...`.
pub fn is_legacy_image_path(kind: OwnerKind, path: &str) -> bool {
    match kind {
        OwnerKind::Team => path.starts_with("images/") || path.starts_with("../../"),
        OwnerKind::Judge => path.starts_with("images/"),
    }
}

/// Join onto `root` and fold `.`/`..` without touching the filesystem.
pub fn resolve_legacy_path(root: &Path, legacy: &str) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in root.join(legacy).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(resolved.components().next_back(), Some(Component::Normal(_))) {
                    resolved.pop();
                } else if !resolved.has_root() {
                    resolved.push("..");
                }
            }
            other => resolved.push(other),
        }
    }
    resolved
}

/// MIME from the file extension, `image/jpeg` when unknown or not accepted.
pub fn mime_for_path(path: &Path, imaging: &ImagingConfig) -> &'static str {
    mime_guess::from_path(path)
        .first_raw()
        .filter(|mime| mime.starts_with("image/") && imaging.is_allowed(mime))
        .unwrap_or("image/jpeg")
}
