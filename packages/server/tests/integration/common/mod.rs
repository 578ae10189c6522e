use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::storage::filesystem::FilesystemBlobStore;
use common::storage::{BlobAttributes, BlobHandle, BlobStore, StorageError};
use reqwest::Client;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use serde_json::Value;
use tempfile::TempDir;

use podium_server::config::{AppConfig, DatabaseConfig};
use podium_server::entity::{document, image_record, owner};
use podium_server::state::AppState;

/// 1x1 fully transparent PNG, padded with a comment chunk past the 100-byte floor.
pub const TRANSPARENT_PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAAJXRFWHRDb21tZW50AHRyYW5zcGFyZW50IDF4MSBwaXhlbCBmaXh0dXJl36GNUgAAAAtJREFUeJxjYAACAAAFAAF6Xqs/AAAAAElFTkSuQmCC";

pub mod routes {
    pub const UPLOAD: &str = "/api/upload-image";
    pub const TEAMS: &str = "/api/data/teams";
    pub const TEAMS_DELETE: &str = "/api/data/teams/delete";
    pub const JUDGES: &str = "/api/data/judges";
    pub const HEALTH: &str = "/api/health";
    pub const CLEAR_ALL: &str = "/api/clear-all";
    pub const OPENAPI: &str = "/api-docs/openapi.json";

    pub fn image(id: &str) -> String {
        format!("/image/{id}")
    }

    pub fn team(id: &str) -> String {
        format!("/api/data/teams/{id}")
    }

    pub fn judge(id: &str) -> String {
        format!("/api/data/judges/{id}")
    }

    pub fn collection(name: &str) -> String {
        format!("/api/data/{name}")
    }
}

/// A running test server backed by a throwaway SQLite file and blob directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub blob_dir: PathBuf,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

/// A blob store whose every write fails.
pub struct OfflineBlobStore;

fn offline() -> StorageError {
    StorageError::Io(std::io::Error::other("blob store offline"))
}

#[async_trait]
impl BlobStore for OfflineBlobStore {
    async fn put(&self, _: &[u8], _: BlobAttributes) -> Result<BlobHandle, StorageError> {
        Err(offline())
    }
    async fn get(&self, _: &BlobHandle) -> Result<Vec<u8>, StorageError> {
        Err(offline())
    }
    async fn attributes(&self, _: &BlobHandle) -> Result<BlobAttributes, StorageError> {
        Err(offline())
    }
    async fn exists(&self, _: &BlobHandle) -> Result<bool, StorageError> {
        Err(offline())
    }
    async fn delete(&self, _: &BlobHandle) -> Result<(), StorageError> {
        Err(offline())
    }
    async fn size(&self, _: &BlobHandle) -> Result<u64, StorageError> {
        Err(offline())
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(None).await
    }

    pub async fn spawn_with_store(store: Arc<dyn BlobStore>) -> Self {
        Self::spawn_with(Some(store)).await
    }

    async fn spawn_with(store: Option<Arc<dyn BlobStore>>) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let blob_dir = dir.path().join("blobs");

        let mut config = AppConfig::default();
        config.server.port = 0;
        config.database = DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", dir.path().join("podium.db").display()),
            max_connections: 1,
            min_connections: 1,
        };
        config.storage.blob_dir = blob_dir.clone();

        let db = podium_server::database::init_db(&config.database)
            .await
            .expect("Failed to initialize test database");

        let blob_store = match store {
            Some(store) => store,
            None => Arc::new(
                FilesystemBlobStore::new(blob_dir.clone(), config.storage.max_blob_size)
                    .await
                    .expect("Failed to open blob store"),
            ),
        };

        let state = AppState {
            db: db.clone(),
            blob_store,
            config,
        };
        let app = podium_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            blob_dir,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    /// GET returning the raw response, for binary bodies and headers.
    pub async fn get_raw(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request")
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Upload a data URL for an owner and return the response.
    pub async fn upload(&self, data_url: &str, owner_id: &str, owner_name: &str) -> TestResponse {
        let body = serde_json::json!({
            "imageData": data_url,
            "ownerId": owner_id,
            "ownerName": owner_name,
        });
        self.post(routes::UPLOAD, &body).await
    }

    /// Upload a generated opaque image and return its `image_id`.
    pub async fn upload_photo(&self, owner_id: &str, owner_name: &str) -> String {
        let res = self.upload(&photo_data_url(64, 48), owner_id, owner_name).await;
        assert_eq!(res.status, 200, "Upload failed: {}", res.text);
        res.body["image_id"]
            .as_str()
            .expect("Upload response should contain image_id")
            .to_string()
    }

    pub async fn owner_row_count(&self) -> u64 {
        owner::Entity::find()
            .count(&self.db)
            .await
            .expect("Failed to count owner rows")
    }

    pub async fn document_row_count(&self) -> u64 {
        document::Entity::find()
            .count(&self.db)
            .await
            .expect("Failed to count document rows")
    }

    pub async fn image_row_count(&self) -> u64 {
        image_record::Entity::find()
            .count(&self.db)
            .await
            .expect("Failed to count image rows")
    }

    /// Number of blob files on disk, ignoring sidecars and the staging area.
    pub fn blob_file_count(&self) -> usize {
        count_blob_files(&self.blob_dir)
    }
}

fn count_blob_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                if path.file_name().is_some_and(|name| name == ".tmp") {
                    0
                } else {
                    count_blob_files(&path)
                }
            } else if path.extension().is_some_and(|ext| ext == "json") {
                0
            } else {
                1
            }
        })
        .sum()
}

/// An opaque gradient encoded as JPEG inside a data URL.
pub fn photo_data_url(width: u32, height: u32) -> String {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 120])
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .expect("Failed to encode test JPEG");
    format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes))
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }
}
