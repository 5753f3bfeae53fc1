use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, ops::Deref};

use super::VideoError;

/// Recognized YouTube URL shapes, tried in order.
static VIDEO_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([a-zA-Z0-9_-]{11})",
        r"youtube\.com/watch\?.*v=([a-zA-Z0-9_-]{11})",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Failed to compile video id regex"))
    .collect()
});

/// 11-character YouTube video identifier.
///
/// Only ever built from a successful pattern capture.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoId(String);

impl Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for VideoId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

/// Extract the video id from a watch, embed or short link.
///
/// The url is matched as received: no trimming or decoding.
pub fn extract_video_id(url: &str) -> Result<VideoId, VideoError> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url).and_then(|caps| caps.get(1)))
        .map(|m| VideoId(m.as_str().to_owned()))
        .ok_or_else(|| VideoError::InvalidUrl(url.to_string()))
}
