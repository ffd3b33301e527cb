//! Image sources.
//!
//! The pipeline only needs "URL in, bytes out". [`ImageSource`] is that seam;
//! [`HttpImageSource`] is the production implementation, and tests plug in
//! an in-memory map instead.

use crate::config::FetchConfig;
use crate::imaging::RawImage;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Invalid image URL: {0:?}")]
    InvalidUrl(String),
}

/// Anything that can turn an image URL into bytes.
pub trait ImageSource {
    fn fetch(&self, url: &str) -> Result<RawImage, FetchError>;
}

/// Downloads images over HTTP(S) with a blocking client.
pub struct HttpImageSource {
    client: reqwest::blocking::Client,
}

impl HttpImageSource {
    pub fn new(config: &FetchConfig, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> Result<RawImage, FetchError> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        debug!(url, "fetching image");
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes()?.to_vec();
        debug!(url, size = bytes.len(), ?content_type, "fetched image");

        Ok(RawImage { bytes, content_type })
    }
}
