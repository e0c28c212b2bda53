use crate::ai::{client::OpenAiClient, ReceiptScanner, RecipeChef};
use crate::config::AppConfig;
use crate::db::{self, PantryRegistry};
use crate::storage::{Storage, StorageClient};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub credentials: SqlitePool,
    pub pantries: Arc<PantryRegistry>,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub scanner: Arc<dyn ReceiptScanner>,
    pub chef: Arc<dyn RecipeChef>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let credentials = db::open_credentials(&config.credentials_db).await?;
        let pantries = Arc::new(PantryRegistry::new(&config.data_dir));

        // S3 or MinIO, depending on MINIO_ENDPOINT
        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;

        let ai = Arc::new(OpenAiClient::new(&config.openai)?);

        Ok(Self::from_parts(
            credentials,
            pantries,
            config,
            storage,
            ai.clone(),
            ai,
        ))
    }

    pub fn from_parts(
        credentials: SqlitePool,
        pantries: Arc<PantryRegistry>,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        scanner: Arc<dyn ReceiptScanner>,
        chef: Arc<dyn RecipeChef>,
    ) -> Self {
        Self {
            credentials,
            pantries,
            config,
            storage,
            scanner,
            chef,
        }
    }
}
