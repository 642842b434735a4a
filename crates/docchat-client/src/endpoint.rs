//! Mapping from the configured server URL to the chat origin.

use docchat_core::Origin;
use reqwest::Url;

use crate::error::ClientError;

/// Build the chat [`Origin`] from the backend base URL
/// (e.g. `https://docs.example.com`).
pub fn origin_from_base_url(base_url: &str) -> Result<Origin, ClientError> {
    let url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

    let host = url
        .host_str()
        .ok_or_else(|| ClientError::InvalidUrl(format!("{} has no host", base_url)))?;
    let host = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    Ok(Origin::new(url.scheme() == "https", host))
}
