/// IMDb ratings via OMDb
///
/// Ratings are decoration on a card, so every failure mode (no key, no IMDb
/// id, upstream error, "N/A") collapses to "no rating".
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::OmdbTitle,
};
use reqwest::Client as HttpClient;

const RATING_CACHE_TTL: u64 = 604800; // 1 week

#[derive(Clone)]
pub struct RatingsClient {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    cache: Cache,
}

impl RatingsClient {
    pub fn new(cache: Cache, api_key: Option<String>, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            cache,
        }
    }

    /// IMDb rating for a title, or `None`
    pub async fn imdb_rating(&self, imdb_id: Option<&str>) -> Option<String> {
        let imdb_id = imdb_id.filter(|id| !id.is_empty())?;
        self.api_key.as_ref()?;

        match self.lookup(imdb_id).await {
            Ok(rating) => rating,
            Err(e) => {
                tracing::debug!(imdb_id = %imdb_id, error = %e, "OMDb lookup failed");
                None
            }
        }
    }

    async fn lookup(&self, imdb_id: &str) -> AppResult<Option<String>> {
        cached!(
            self.cache,
            CacheKey::ImdbRating(imdb_id.to_string()),
            RATING_CACHE_TTL,
            async move { self.call_api(imdb_id).await }
        )
    }

    async fn call_api(&self, imdb_id: &str) -> AppResult<Option<String>> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let url = format!("{}/", self.api_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("i", imdb_id), ("apikey", api_key)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "OMDb returned status {}",
                response.status()
            )));
        }

        let title: OmdbTitle = response.json().await?;
        Ok(normalize_rating(title.imdb_rating))
    }
}

fn normalize_rating(rating: Option<String>) -> Option<String> {
    rating.filter(|r| !r.is_empty() && r != "N/A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rating() {
        assert_eq!(normalize_rating(Some("8.8".to_string())), Some("8.8".to_string()));
        assert_eq!(normalize_rating(Some("N/A".to_string())), None);
        assert_eq!(normalize_rating(Some(String::new())), None);
        assert_eq!(normalize_rating(None), None);
    }

    #[tokio::test]
    async fn test_no_key_means_no_rating() {
        let client = RatingsClient::new(Cache::disabled(), None, "http://test.local".to_string());
        assert_eq!(client.imdb_rating(Some("tt1375666")).await, None);
    }

    #[tokio::test]
    async fn test_no_imdb_id_means_no_rating() {
        let client = RatingsClient::new(
            Cache::disabled(),
            Some("key".to_string()),
            "http://test.local".to_string(),
        );
        assert_eq!(client.imdb_rating(None).await, None);
        assert_eq!(client.imdb_rating(Some("")).await, None);
    }
}
