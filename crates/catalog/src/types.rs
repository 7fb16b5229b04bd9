//! Jikan API v4 response types and their validation.
//!
//! Every field of the raw payload is optional. [`AnimeSummary::from_payload`]
//! is the single place deciding whether a response is usable.

use serde::Deserialize;
use thiserror::Error;

/// `GET /anime/{id}` response wrapper
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimeResponse {
    #[serde(default)]
    pub data: Option<AnimePayload>,
}

/// The subset of the anime payload we read
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimePayload {
    #[serde(default)]
    pub mal_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub title_english: Option<String>,
    #[serde(default)]
    pub images: Option<AnimeImages>,
}

/// Anime images
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimeImages {
    #[serde(default)]
    pub jpg: Option<ImageSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageSet {
    pub image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub large_image_url: Option<String>,
}

/// Reasons a payload cannot be turned into an [`AnimeSummary`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("response has no data object")]
    MissingData,

    #[error("anime {0} has no title")]
    MissingTitle(i64),

    #[error("requested anime {expected} but response describes {found}")]
    IdMismatch { expected: i64, found: i64 },
}

/// Validated display metadata for one anime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimeSummary {
    pub anime_id: i64,
    pub title: String,
    /// Poster URL, empty when the payload carries none
    pub image: String,
}

impl AnimeSummary {
    /// Validate the response for `anime_id`
    ///
    /// The title falls back to the English title; the image prefers the
    /// large jpg, then the regular and small ones.
    pub fn from_payload(anime_id: i64, response: AnimeResponse) -> Result<Self, PayloadError> {
        let data = response.data.ok_or(PayloadError::MissingData)?;

        if let Some(found) = data.mal_id {
            if found != anime_id {
                return Err(PayloadError::IdMismatch {
                    expected: anime_id,
                    found,
                });
            }
        }

        let title = data
            .title
            .filter(|t| !t.trim().is_empty())
            .or(data.title_english.filter(|t| !t.trim().is_empty()))
            .ok_or(PayloadError::MissingTitle(anime_id))?;

        let image = data
            .images
            .and_then(|images| images.jpg)
            .and_then(|jpg| {
                jpg.large_image_url
                    .or(jpg.image_url)
                    .or(jpg.small_image_url)
            })
            .unwrap_or_default();

        Ok(Self {
            anime_id,
            title,
            image,
        })
    }
}
