/// Streaming Availability API provider (via RapidAPI)
///
/// Listings are fetched per service code with `/shows/search/filters`, so a
/// single listing costs one request per supported service.
use crate::{
    error::AppResult,
    models::{
        catalog, format_naive_date, ApiShow, ApiShowPage, MediaItem, MediaType, NO_DESCRIPTION,
        STREAMING_NOW,
    },
    services::providers::{check_status, gather, CatalogProvider},
};
use chrono::{NaiveDate, Utc};
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Deserialize};

const STREAMING_LIMIT: usize = 50;
const UPCOMING_LIMIT: usize = 30;
const CATALOG_TYPES: &[&str] = &["subscription", "free", "rent", "buy", "addon"];

#[derive(Debug, Deserialize)]
struct ApiSearchResponse(Vec<ApiShow>);

#[derive(Clone)]
pub struct StreamingAvailabilityProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    country: String,
}

impl StreamingAvailabilityProvider {
    pub fn new(api_key: String, api_url: String, country: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            country,
        }
    }

    fn host(&self) -> &str {
        self.api_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
    }

    async fn make_request<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);
        let response = self
            .http_client
            .get(&url)
            .header("x-rapidapi-host", self.host())
            .header("x-rapidapi-key", &self.api_key)
            .query(params)
            .send()
            .await?;

        let response = check_status("Streaming Availability", response).await?;
        Ok(response.json().await?)
    }

    async fn filtered_shows(
        &self,
        service: &str,
        media_type: MediaType,
        order_by: &str,
    ) -> AppResult<Vec<ApiShow>> {
        let page: ApiShowPage = self
            .make_request(
                "/shows/search/filters",
                &[
                    ("country", self.country.as_str()),
                    ("services", service),
                    ("show_type", media_type.show_type()),
                    ("order_by", order_by),
                ],
            )
            .await?;
        Ok(page.shows)
    }

    async fn streaming_for_service(
        &self,
        service: &str,
        media_type: MediaType,
    ) -> AppResult<Vec<MediaItem>> {
        let shows = self
            .filtered_shows(service, media_type, "popularity_1week")
            .await?;

        let items: Vec<MediaItem> = shows
            .into_iter()
            .take(STREAMING_LIMIT)
            .map(|show| show_to_item(show, service, STREAMING_NOW.to_string()))
            .collect();

        tracing::info!(service = %service, count = items.len(), provider = "streaming_availability", "Streaming titles fetched");
        Ok(items)
    }

    async fn upcoming_for_service(
        &self,
        service: &str,
        media_type: MediaType,
    ) -> AppResult<Vec<MediaItem>> {
        let shows = self.filtered_shows(service, media_type, "upcoming").await?;
        let items = upcoming_items(shows, service, Utc::now().date_naive());

        tracing::info!(service = %service, count = items.len(), provider = "streaming_availability", "Upcoming titles fetched");
        Ok(items)
    }

    /// Catalog types (`subscription`, `free`, ...) that return any show for a service
    pub async fn probe_catalogs(&self, service: &str) -> Vec<String> {
        let mut working = Vec::new();

        for catalog_type in CATALOG_TYPES {
            let catalog = format!("{}.{}", service, catalog_type);
            let result: AppResult<ApiShowPage> = self
                .make_request(
                    "/shows/search/filters",
                    &[
                        ("country", self.country.as_str()),
                        ("catalogs", catalog.as_str()),
                        ("order_by", "popularity_1month"),
                    ],
                )
                .await;

            match result {
                Ok(page) if !page.shows.is_empty() => {
                    tracing::info!(catalog = %catalog, shows = page.shows.len(), "Catalog returned data");
                    working.push(catalog_type.to_string());
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(catalog = %catalog, error = %e, "Catalog probe failed"),
            }
        }

        working
    }
}

/// Shows released after `today`, capped, with a formatted release label
fn upcoming_items(shows: Vec<ApiShow>, service: &str, today: NaiveDate) -> Vec<MediaItem> {
    shows
        .into_iter()
        .filter_map(|show| {
            let release = show
                .year()
                .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))?;
            (release > today).then_some((show, release))
        })
        .take(UPCOMING_LIMIT)
        .map(|(show, release)| show_to_item(show, service, format_naive_date(release)))
        .collect()
}

/// Search hits carry no service; cards show the formatted release date
fn search_result_to_item(show: ApiShow) -> MediaItem {
    let mut item = show_to_item(show, "", String::new());
    item.providers.clear();
    item.service = None;
    item.available_date = None;
    item
}

fn show_to_item(show: ApiShow, service: &str, available_date: String) -> MediaItem {
    let service_name = catalog::streaming_availability_name(service)
        .unwrap_or(service)
        .to_string();
    let year = show.year().map(|y| y.to_string());
    let media_type = show.media_type();

    MediaItem {
        id: format!("sa-{}", show.id),
        title: show.title,
        overview: show
            .overview
            .filter(|o| !o.is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        poster_path: show
            .image_set
            .and_then(|set| set.vertical_poster)
            .and_then(|poster| poster.w480),
        release_date: year.clone().unwrap_or_default(),
        vote_average: show.rating.map(|r| r / 10.0).unwrap_or(0.0),
        genre_ids: show
            .genres
            .iter()
            .filter_map(|g| catalog::genre_slug_from_name(&g.id))
            .map(String::from)
            .collect(),
        media_type,
        providers: vec![service_name.clone()],
        service: Some(service_name),
        available_date: Some(available_date),
        imdb_rating: None,
        imdb_id: show.imdb_id,
        year,
    }
}

#[async_trait::async_trait]
impl CatalogProvider for StreamingAvailabilityProvider {
    async fn fetch_streaming(&self, media_type: MediaType) -> AppResult<Vec<MediaItem>> {
        let services = catalog::STREAMING_AVAILABILITY_SERVICES
            .iter()
            .map(|(code, _)| *code)
            .collect();
        let provider = self.clone();
        gather(self.name(), services, move |service| {
            let provider = provider.clone();
            async move { provider.streaming_for_service(service, media_type).await }
        })
        .await
    }

    async fn fetch_upcoming(&self, media_type: MediaType) -> AppResult<Vec<MediaItem>> {
        let services = catalog::STREAMING_AVAILABILITY_SERVICES
            .iter()
            .map(|(code, _)| *code)
            .collect();
        let provider = self.clone();
        gather(self.name(), services, move |service| {
            let provider = provider.clone();
            async move { provider.upcoming_for_service(service, media_type).await }
        })
        .await
    }

    async fn search(&self, query: &str, media_type: MediaType) -> AppResult<Vec<MediaItem>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let shows: ApiSearchResponse = self
            .make_request(
                "/shows/search/title",
                &[
                    ("title", query),
                    ("country", self.country.as_str()),
                    ("show_type", media_type.show_type()),
                ],
            )
            .await?;

        let items: Vec<MediaItem> = shows
            .0
            .into_iter()
            .filter(|show| show.media_type() == media_type)
            .map(search_result_to_item)
            .collect();

        tracing::info!(
            query = %query,
            results = items.len(),
            provider = "streaming_availability",
            "Title search completed"
        );

        Ok(items)
    }

    fn name(&self) -> &'static str {
        "streaming_availability"
    }
}
