use reqwest::header::ACCEPT;
use serde::Deserialize;

use super::{transport::HttpTransport, VideoError, VideoId};

#[derive(Debug, Clone, Deserialize)]
pub struct OembedResponse {
    pub title: String,
    pub thumbnail_url: String,
}

pub fn oembed_url(id: &VideoId) -> String {
    format!("https://www.youtube.com/oembed?url=https://www.youtube.com/watch?v={id}&format=json")
}

/// Title and thumbnail from the oEmbed endpoint.
///
/// Any transport failure, non-2xx status or undecodable body is a
/// `MetadataFetchFailed`: a song cannot be created without these fields.
pub fn fetch_oembed(
    transport: &dyn HttpTransport,
    id: &VideoId,
) -> Result<OembedResponse, VideoError> {
    let url = oembed_url(id);

    let resp = transport
        .get(&url, &[(ACCEPT, "application/json")])
        .map_err(|err| VideoError::MetadataFetchFailed(err.to_string()))?;

    if !resp.status.is_success() {
        return Err(VideoError::MetadataFetchFailed(format!(
            "oembed returned {}",
            resp.status
        )));
    }

    serde_json::from_str::<OembedResponse>(&resp.body)
        .map_err(|err| VideoError::MetadataFetchFailed(format!("malformed oembed response: {err}")))
}
