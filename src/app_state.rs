use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::{
    config::Config,
    infrastructure::entity_store::EntityStore,
    infrastructure::media::{LocalMediaStore, MediaStore},
    infrastructure::sqlite_database::SqliteDatabase,
    social_interface::SocialInterface,
};

#[derive(Clone)]
pub struct AppState {
    pub social: SocialInterface,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // A file-backed database needs its directory before sqlite can create it
        if let Some(path) = config.database.url.strip_prefix("sqlite:") {
            if !path.contains(":memory:") {
                if let Some(parent) = Path::new(path.trim_start_matches("//")).parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let database =
            SqliteDatabase::connect(&config.database.url, config.database.max_connections).await?;
        info!("Connected to {}", config.database.url);

        let store = EntityStore::new(Arc::new(database));
        let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::new(
            config.media.dir.clone(),
            &config.media.base_url,
        ));
        let social = SocialInterface::new(&config, store, media);

        Ok(Self { social, config })
    }
}
