/// TMDB provider
///
/// API Flow:
/// 1. List pages: `movie/popular`, `tv/popular` (streaming) or `movie/upcoming`,
///    `tv/on_the_air` (upcoming)
/// 2. Per title: `/{type}/{id}/watch/providers` → services in the configured region
/// 3. Per title: `/{type}/{id}/external_ids` → IMDb id → OMDb rating
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        catalog, format_date, year_of, MediaItem, MediaType, TmdbExternalIds, TmdbListItem,
        TmdbPage, TmdbRegionProviders, TmdbWatchProviders, NO_DESCRIPTION, STREAMING_NOW, TBA,
    },
    services::{
        providers::{check_status, CatalogProvider},
        ratings::RatingsClient,
    },
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;

const EXTERNAL_IDS_CACHE_TTL: u64 = 604800; // 1 week
const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Listing {
    Streaming,
    Upcoming,
}

/// Outcome of enriching one list entry
struct ItemOutcome {
    item: Option<MediaItem>,
    unknown_providers: Vec<u64>,
}

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    region: String,
    pages: u32,
    ratings: RatingsClient,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(
        cache: Cache,
        ratings: RatingsClient,
        api_key: String,
        api_url: String,
        region: String,
        pages: u32,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            region,
            pages,
            ratings,
            cache,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}/{}", self.api_url, path);
        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let response = check_status("TMDB", response).await?;
        Ok(response.json().await?)
    }

    /// Mapped services for one title plus the provider ids we don't know
    async fn watch_providers(
        &self,
        media_type: MediaType,
        id: u64,
    ) -> AppResult<(Vec<String>, Vec<u64>)> {
        let providers: TmdbWatchProviders = self
            .get_json(&format!("{}/{}/watch/providers", media_type, id), &[])
            .await?;
        Ok(map_providers(providers.results.get(&self.region)))
    }

    async fn external_ids(&self, media_type: MediaType, id: u64) -> AppResult<TmdbExternalIds> {
        cached!(
            self.cache,
            CacheKey::ExternalIds(format!("{}:{}", media_type, id)),
            EXTERNAL_IDS_CACHE_TTL,
            async move {
                self.get_json::<TmdbExternalIds>(&format!("{}/{}/external_ids", media_type, id), &[])
                    .await
            }
        )
    }

    async fn imdb_id(&self, media_type: MediaType, id: u64) -> AppResult<Option<String>> {
        let ids = self.external_ids(media_type, id).await?;
        Ok(ids.imdb_id.filter(|i| !i.is_empty()))
    }

    async fn attach_ratings(&self, item: &mut MediaItem, media_type: MediaType, id: u64) {
        match self.imdb_id(media_type, id).await {
            Ok(imdb_id) => {
                item.imdb_rating = self.ratings.imdb_rating(imdb_id.as_deref()).await;
                item.imdb_id = imdb_id;
            }
            Err(e) => {
                tracing::debug!(tmdb_id = id, error = %e, "External id lookup failed");
            }
        }
    }

    async fn build_item(
        &self,
        listing: Listing,
        media_type: MediaType,
        entry: TmdbListItem,
    ) -> AppResult<ItemOutcome> {
        let (services, unknown_providers) = match self.watch_providers(media_type, entry.id).await
        {
            Ok(found) => found,
            Err(e) if listing == Listing::Upcoming => {
                tracing::debug!(tmdb_id = entry.id, error = %e, "Watch providers unavailable");
                (Vec::new(), Vec::new())
            }
            Err(e) => return Err(e),
        };

        let Some(mut item) = to_media_item(&entry, media_type, listing, services) else {
            return Ok(ItemOutcome {
                item: None,
                unknown_providers,
            });
        };

        self.attach_ratings(&mut item, media_type, entry.id).await;

        if listing == Listing::Upcoming {
            tracing::debug!(
                title = %item.title,
                service = ?item.service,
                date = ?item.available_date,
                "Upcoming title"
            );
        }

        Ok(ItemOutcome {
            item: Some(item),
            unknown_providers,
        })
    }

    async fn fetch_listing(
        &self,
        listing: Listing,
        media_type: MediaType,
    ) -> AppResult<Vec<MediaItem>> {
        let endpoint = match (listing, media_type) {
            (Listing::Streaming, _) => format!("{}/popular", media_type),
            (Listing::Upcoming, MediaType::Movie) => "movie/upcoming".to_string(),
            (Listing::Upcoming, MediaType::Tv) => "tv/on_the_air".to_string(),
        };

        tracing::info!(endpoint = %endpoint, pages = self.pages, provider = "tmdb", "Fetching listing");

        let mut items = Vec::new();
        let mut unknown = BTreeSet::new();
        let mut failed_pages = 0;

        for page in 1..=self.pages {
            let page_str = page.to_string();
            let mut params = vec![("language", "en-US"), ("page", page_str.as_str())];
            if listing == Listing::Upcoming {
                params.push(("region", self.region.as_str()));
            }

            let results = match self.get_json::<TmdbPage>(&endpoint, &params).await {
                Ok(data) => data.results,
                Err(e) => {
                    tracing::error!(page, error = %e, provider = "tmdb", "Page fetch failed");
                    failed_pages += 1;
                    continue;
                }
            };

            let mut tasks = Vec::new();
            for entry in results {
                let provider = self.clone();
                tasks.push(tokio::spawn(async move {
                    provider.build_item(listing, media_type, entry).await
                }));
            }

            for task in tasks {
                match task.await {
                    Ok(Ok(outcome)) => {
                        unknown.extend(outcome.unknown_providers);
                        items.extend(outcome.item);
                    }
                    Ok(Err(e)) => {
                        tracing::error!(error = %e, provider = "tmdb", "Error processing item");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Task join error");
                    }
                }
            }
        }

        if failed_pages == self.pages && self.pages > 0 {
            return Err(AppError::ExternalApi(
                "TMDB returned no pages".to_string(),
            ));
        }

        if !unknown.is_empty() {
            let ids: Vec<String> = unknown.iter().map(u64::to_string).collect();
            tracing::info!(ids = %ids.join(", "), provider = "tmdb", "Unknown provider ids");
        }

        tracing::info!(count = items.len(), endpoint = %endpoint, provider = "tmdb", "Listing fetched");
        Ok(items)
    }
}

/// Maps a region's flatrate, free, and ad-supported offers to service names
///
/// Services are deduplicated in first-seen order. Unmapped provider ids are
/// returned separately so they can be added to the table.
pub(crate) fn map_providers(region: Option<&TmdbRegionProviders>) -> (Vec<String>, Vec<u64>) {
    let Some(region) = region else {
        return (Vec::new(), Vec::new());
    };

    let mut services: Vec<String> = Vec::new();
    let mut unknown = Vec::new();

    for provider in region
        .flatrate
        .iter()
        .chain(region.free.iter())
        .chain(region.ads.iter())
    {
        match catalog::tmdb_provider_name(provider.provider_id) {
            Some(name) => {
                if !services.iter().any(|s| s == name) {
                    services.push(name.to_string());
                }
            }
            None => {
                tracing::debug!(
                    provider_id = provider.provider_id,
                    provider_name = %provider.provider_name,
                    "Unknown TMDB provider id"
                );
                unknown.push(provider.provider_id);
            }
        }
    }

    (services, unknown)
}

/// Builds a media item from a list entry and its mapped services
///
/// Streaming listings drop titles with no known service. Upcoming listings
/// keep them as `TBA` for later resolution.
fn to_media_item(
    entry: &TmdbListItem,
    media_type: MediaType,
    listing: Listing,
    services: Vec<String>,
) -> Option<MediaItem> {
    let date = entry.date();
    let mut item = base_item(entry, media_type);

    match listing {
        Listing::Streaming => {
            let first = services.first()?.clone();
            item.providers = services;
            item.service = Some(first);
            item.available_date = Some(STREAMING_NOW.to_string());
        }
        Listing::Upcoming => {
            if services.is_empty() {
                item.providers = vec![TBA.to_string()];
                item.service = Some(TBA.to_string());
            } else {
                item.service = services.first().cloned();
                item.providers = services;
            }
            item.available_date = Some(format_date(date.as_deref().unwrap_or_default()));
        }
    }

    Some(item)
}

fn base_item(entry: &TmdbListItem, media_type: MediaType) -> MediaItem {
    let date = entry.date();
    MediaItem {
        id: format!("tmdb-{}", entry.id),
        title: entry.display_title(),
        overview: entry
            .overview
            .clone()
            .filter(|o| !o.is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        poster_path: entry
            .poster_path
            .as_ref()
            .map(|p| format!("{}{}", IMAGE_BASE_URL, p)),
        year: date.as_deref().and_then(year_of),
        release_date: date.unwrap_or_default(),
        vote_average: entry.vote_average.unwrap_or(0.0),
        genre_ids: entry
            .genre_ids
            .iter()
            .filter_map(|id| catalog::tmdb_genre_slug(*id))
            .map(String::from)
            .collect(),
        media_type,
        providers: Vec::new(),
        service: None,
        available_date: None,
        imdb_rating: None,
        imdb_id: None,
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn fetch_streaming(&self, media_type: MediaType) -> AppResult<Vec<MediaItem>> {
        self.fetch_listing(Listing::Streaming, media_type).await
    }

    async fn fetch_upcoming(&self, media_type: MediaType) -> AppResult<Vec<MediaItem>> {
        self.fetch_listing(Listing::Upcoming, media_type).await
    }

    async fn search(&self, query: &str, media_type: MediaType) -> AppResult<Vec<MediaItem>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let page: TmdbPage = self
            .get_json("search/multi", &[("query", query), ("page", "1")])
            .await?;

        let items: Vec<MediaItem> = page
            .results
            .iter()
            .filter(|entry| entry.media_type.as_deref() == Some(media_type.tmdb_path()))
            .map(|entry| base_item(entry, media_type))
            .collect();

        tracing::info!(query = %query, results = items.len(), provider = "tmdb", "Search completed");
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
