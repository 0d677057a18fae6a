/// Catalog data provider abstraction
///
/// Each upstream catalog (TMDB, Streaming Availability, Watchmode) implements
/// [`CatalogProvider`] and returns already-normalised [`MediaItem`]s, so the
/// aggregator can merge them without knowing where they came from.
use crate::{
    error::{AppError, AppResult},
    models::{MediaItem, MediaType},
};
use std::future::Future;

pub mod streaming_availability;
pub mod tmdb;
pub mod watchmode;

pub use streaming_availability::StreamingAvailabilityProvider;
pub use tmdb::TmdbProvider;
pub use watchmode::WatchmodeProvider;

#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Titles currently streaming
    async fn fetch_streaming(&self, media_type: MediaType) -> AppResult<Vec<MediaItem>>;

    /// Titles with an upcoming release
    async fn fetch_upcoming(&self, media_type: MediaType) -> AppResult<Vec<MediaItem>>;

    /// Free-text title search
    async fn search(&self, query: &str, media_type: MediaType) -> AppResult<Vec<MediaItem>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Runs one future per key on its own task and gathers the successes
///
/// Failed keys are logged and skipped; the call fails only when every key
/// failed.
pub(crate) async fn gather<K, F, Fut>(
    provider: &'static str,
    keys: Vec<K>,
    make: F,
) -> AppResult<Vec<MediaItem>>
where
    K: std::fmt::Display + Send + 'static,
    F: Fn(K) -> Fut,
    Fut: Future<Output = AppResult<Vec<MediaItem>>> + Send + 'static,
{
    let mut tasks = Vec::new();
    for key in keys {
        let label = key.to_string();
        tasks.push((label, tokio::spawn(make(key))));
    }

    let mut results = Vec::new();
    let mut error_count = 0;
    let mut last_error = None;

    for (label, task) in tasks {
        match task.await {
            Ok(Ok(items)) => results.extend(items),
            Ok(Err(e)) => {
                tracing::error!(provider, key = %label, error = %e, "Fetch failed");
                error_count += 1;
                last_error = Some(e);
            }
            Err(e) => {
                tracing::error!(provider, key = %label, error = %e, "Task join error");
                error_count += 1;
                last_error = Some(AppError::Internal(e.to_string()));
            }
        }
    }

    if error_count > 0 {
        tracing::warn!(
            provider,
            success_count = results.len(),
            error_count,
            "Partial fetch failure"
        );
    }

    match last_error {
        Some(e) if results.is_empty() => Err(e),
        _ => Ok(results),
    }
}

/// Fails with the upstream status and body when a response is not 2xx
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::ExternalApi(format!(
        "{} API returned status {}: {}",
        provider, status, body
    )))
}
