use crate::{
    app::AppService,
    catalog::{self, BackendCsv, CatalogManager},
    config::Config,
    video::{ReqwestTransport, VideoFetcher},
};
use anyhow::{Context, Result};
use homedir::my_home;
use std::{sync::Arc, time::Duration};

/// Application factory for creating and configuring application components
pub struct AppFactory;

impl AppFactory {
    /// Open the catalog under the data directory and wire the live YouTube fetcher.
    pub fn create_app_service(paths: &AppPaths, config: Config) -> Result<AppService> {
        let catalog: Arc<dyn CatalogManager> = Arc::new(
            BackendCsv::load(&paths.catalog_path).context("Failed to open catalog")?,
        );

        if config.seed_albums {
            catalog::seed_albums(catalog.as_ref())?;
        }

        let videos = Self::create_video_fetcher(&config)?;

        Ok(AppService::new(catalog, videos, config))
    }

    pub fn create_video_fetcher(config: &Config) -> Result<VideoFetcher> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.video.fetch_timeout_secs))?;
        Ok(VideoFetcher::new(Arc::new(transport), config.video.clone()))
    }

    /// Get application paths with validation
    pub fn get_paths() -> Result<AppPaths> {
        let base_path = Self::get_base_path()?;
        let catalog_path = format!("{base_path}/catalog");

        // Ensure base directory exists
        std::fs::create_dir_all(&base_path)
            .context("Failed to create application base directory")?;

        Ok(AppPaths {
            base_path,
            catalog_path,
        })
    }

    /// Get the base path for the application
    fn get_base_path() -> Result<String> {
        if let Ok(base_path) = std::env::var("MUSICAT_BASE_PATH") {
            return Ok(base_path);
        }

        let home = my_home()
            .context("Could not determine home directory")?
            .context("Home directory path is empty")?;

        Ok(format!("{}/.local/share/musicat", home.to_string_lossy()))
    }
}

/// Application paths structure
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_path: String,
    pub catalog_path: String,
}
