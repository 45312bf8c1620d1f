//! Album artwork fetch for button display

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use tracing::{debug, error};

use crate::drivers::media::MediaError;
use crate::state::MediaStore;

/// Encoded artwork payload; empty when there is nothing to show
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtworkImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png64: Option<String>,
}

/// Downloads the current track's artwork over plain HTTP GET
#[derive(Clone, Default)]
pub struct ArtworkFetcher {
    client: reqwest::Client,
}

impl ArtworkFetcher {
    /// Fetch artwork for the current track
    ///
    /// Never fails: a missing artwork reference or a failed download yields
    /// an empty image.
    pub async fn fetch(&self, store: &MediaStore) -> ArtworkImage {
        let artwork_ref = store.read(|state| {
            state
                .track
                .as_ref()
                .and_then(|track| track.artwork_ref.clone())
        });

        let url = match artwork_ref {
            Some(url) if !url.is_empty() => url,
            _ => return ArtworkImage::default(),
        };

        match self.download(&url).await {
            Ok(bytes) => {
                debug!("Fetched {} bytes of artwork from {}", bytes.len(), url);
                ArtworkImage {
                    png64: Some(STANDARD.encode(bytes)),
                }
            }
            Err(e) => {
                error!("Error fetching album artwork: {}", e);
                ArtworkImage::default()
            }
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let response = self.client.get(url).send().await?;
        Ok(response.bytes().await?.to_vec())
    }
}
