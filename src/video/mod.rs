pub mod oembed;
pub mod transport;
pub mod video_id;
pub mod view_count;

pub use transport::{HttpTransport, ReqwestTransport};
pub use video_id::{extract_video_id, VideoId};

use crate::config::VideoConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum VideoError {
    #[error("invalid YouTube url: {0:?}")]
    InvalidUrl(String),

    #[error("failed to fetch video metadata: {0}")]
    MetadataFetchFailed(String),

    #[error("view count not found")]
    ViewCountNotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub thumbnail_url: String,
    pub view_count: u64,
}

/// Fetches title, thumbnail and view count for YouTube links.
///
/// Holds no state between calls besides the injected transport.
#[derive(Clone)]
pub struct VideoFetcher {
    transport: Arc<dyn HttpTransport>,
    config: VideoConfig,
}

impl VideoFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, config: VideoConfig) -> Self {
        Self { transport, config }
    }

    pub fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, VideoError> {
        let id = extract_video_id(url)?;
        self.fetch_metadata_for_id(&id)
    }

    pub fn fetch_metadata_for_id(&self, id: &VideoId) -> Result<VideoMetadata, VideoError> {
        let oembed = oembed::fetch_oembed(self.transport.as_ref(), id)?;

        let view_count = match self.scrape_view_count(id) {
            Ok(count) => count,
            Err(err) if self.config.require_view_count => return Err(err),
            Err(_) => {
                log::warn!("{id}: view count unavailable, defaulting to 0");
                0
            }
        };

        log::info!("video={id} title={:?} view_count={view_count}", oembed.title);

        Ok(VideoMetadata {
            title: oembed.title,
            thumbnail_url: oembed.thumbnail_url,
            view_count,
        })
    }

    pub fn scrape_view_count(&self, id: &VideoId) -> Result<u64, VideoError> {
        view_count::scrape_view_count(self.transport.as_ref(), id, &self.config.user_agent)
    }
}
