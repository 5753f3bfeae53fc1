mod catalog;

use std::sync::Arc;

use crate::app::AppService;
use crate::catalog::BackendCsv;
use crate::config::{Config, VideoConfig};
use crate::video::{extract_video_id, transport::StubTransport, view_count, VideoFetcher};

pub const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
pub const OEMBED_URL: &str =
    "https://www.youtube.com/oembed?url=https://www.youtube.com/watch?v=dQw4w9WgXcQ&format=json";

pub const OEMBED_BODY: &str = r#"{"title":"T","author_name":"Rick Astley","thumbnail_url":"U","type":"video"}"#;
pub const WATCH_PAGE: &str = r#"<html><head><title>T - YouTube</title></head><body>
<script>var ytInitialPlayerResponse = {"videoDetails":{"videoId":"dQw4w9WgXcQ","viewCount":"12345","author":"Rick Astley"}};</script>
</body></html>"#;

pub fn watch_url() -> String {
    view_count::watch_page_url(&extract_video_id(VIDEO_URL).unwrap())
}

/// oEmbed and watch page both answering normally.
pub fn youtube_stub() -> StubTransport {
    StubTransport::new()
        .page(OEMBED_URL, 200, OEMBED_BODY)
        .page(&watch_url(), 200, WATCH_PAGE)
}

pub fn test_config() -> Config {
    Config {
        password_cost: 4,
        seed_albums: false,
        ..Default::default()
    }
}

pub fn video_fetcher(transport: Arc<StubTransport>, config: VideoConfig) -> VideoFetcher {
    VideoFetcher::new(transport, config)
}

/// Creates an isolated AppService using a unique temp directory.
pub fn create_app_with(
    transport: StubTransport,
    config: Config,
) -> (Arc<AppService>, Arc<StubTransport>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let catalog = Arc::new(
        BackendCsv::load(tmp.path().join("catalog").to_str().unwrap())
            .expect("failed to create catalog"),
    );

    let transport = Arc::new(transport);
    let videos = video_fetcher(transport.clone(), config.video.clone());

    (
        Arc::new(AppService::new(catalog, videos, config)),
        transport,
        tmp,
    )
}

pub fn create_app(transport: StubTransport) -> (Arc<AppService>, Arc<StubTransport>, tempfile::TempDir) {
    create_app_with(transport, test_config())
}
