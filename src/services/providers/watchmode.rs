/// Watchmode API provider
///
/// Listings come from `/v1/list-titles/`, queried once per supported source.
/// Search runs in two steps:
/// 1. `/v1/autocomplete-search/` returns Watchmode ids
/// 2. `/v1/title/{id}/details/` returns the title and its streaming sources
use crate::{
    error::AppResult,
    models::{
        catalog, format_date, MediaItem, MediaType, WatchmodeListTitle, WatchmodeSearchResponse,
        WatchmodeTitleDetails, WatchmodeTitleList, NO_DESCRIPTION, STREAMING_NOW,
    },
    services::providers::{check_status, gather, CatalogProvider},
};
use chrono::{NaiveDate, Utc};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

const LIST_LIMIT: &str = "100";
const SEARCH_DETAILS_LIMIT: usize = 10;
const FALLBACK_SERVICE: &str = "Streaming";

#[derive(Clone)]
pub struct WatchmodeProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl WatchmodeProvider {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}/v1/{}", self.api_url, path);
        let response = self
            .http_client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let response = check_status("Watchmode", response).await?;
        Ok(response.json().await?)
    }

    async fn list_titles(
        &self,
        service: &'static str,
        media_type: MediaType,
        extra: &[(&str, &str)],
    ) -> AppResult<Vec<WatchmodeListTitle>> {
        // Unknown services are filtered out before this point
        let source_id = catalog::watchmode_source_id(service)
            .map(|id| id.to_string())
            .unwrap_or_default();

        let mut params = vec![
            ("source_ids", source_id.as_str()),
            ("types", media_type.watchmode_type()),
            ("limit", LIST_LIMIT),
        ];
        params.extend_from_slice(extra);

        let list: WatchmodeTitleList = self.get_json("list-titles/", &params).await?;
        Ok(list.titles)
    }

    async fn releases_for_service(
        &self,
        service: &'static str,
        media_type: MediaType,
    ) -> AppResult<Vec<MediaItem>> {
        let titles = self
            .list_titles(service, media_type, &[("sort_by", "relevance_desc")])
            .await?;

        let items: Vec<MediaItem> = titles
            .into_iter()
            .map(|title| list_title_to_item(title, media_type, service, STREAMING_NOW.to_string()))
            .collect();

        tracing::info!(service = %service, count = items.len(), provider = "watchmode", "New releases fetched");
        Ok(items)
    }

    async fn upcoming_for_service(
        &self,
        service: &'static str,
        media_type: MediaType,
    ) -> AppResult<Vec<MediaItem>> {
        let start = release_date_start(Utc::now().date_naive());
        let titles = self
            .list_titles(
                service,
                media_type,
                &[
                    ("release_date_start", start.as_str()),
                    ("sort_by", "release_date_asc"),
                ],
            )
            .await?;

        let items: Vec<MediaItem> = titles
            .into_iter()
            .map(|title| {
                let label = format!(
                    "Coming {}",
                    format_date(title_release_date(&title).unwrap_or_default())
                );
                list_title_to_item(title, media_type, service, label)
            })
            .collect();

        tracing::info!(service = %service, count = items.len(), provider = "watchmode", "Upcoming titles fetched");
        Ok(items)
    }

    async fn title_details(&self, watchmode_id: u64) -> AppResult<WatchmodeTitleDetails> {
        self.get_json(
            &format!("title/{}/details/", watchmode_id),
            &[("append_to_response", "sources")],
        )
        .await
    }

    async fn search_item(&self, watchmode_id: u64, media_type: MediaType) -> AppResult<Vec<MediaItem>> {
        let details = self.title_details(watchmode_id).await?;
        Ok(vec![details_to_item(details, media_type)])
    }
}

/// `release_date_start` takes a compact `YYYYMMDD` date
fn release_date_start(today: NaiveDate) -> String {
    today.format("%Y%m%d").to_string()
}

fn parse_title_type(title_type: &str) -> Option<MediaType> {
    match title_type {
        "movie" | "tv_movie" => Some(MediaType::Movie),
        "tv_series" | "tv_miniseries" | "tv_special" => Some(MediaType::Tv),
        _ => None,
    }
}

/// US release date when Watchmode has one, otherwise the global date
fn title_release_date(title: &WatchmodeListTitle) -> Option<&str> {
    title
        .us_release_date
        .as_deref()
        .or(title.release_date.as_deref())
}

fn list_title_to_item(
    title: WatchmodeListTitle,
    media_type: MediaType,
    service: &str,
    available_date: String,
) -> MediaItem {
    let release_date = title_release_date(&title)
        .unwrap_or_default()
        .to_string();
    let year = title
        .year
        .map(|y| y.to_string())
        .or_else(|| crate::models::year_of(&release_date));

    MediaItem {
        id: format!("wm-{}", title.id),
        title: title.title,
        overview: title
            .plot_overview
            .filter(|o| !o.is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        poster_path: title.poster.filter(|p| !p.is_empty()),
        release_date,
        vote_average: title.tmdb_rating.or(title.imdb_rating).unwrap_or(0.0),
        genre_ids: Vec::new(),
        media_type,
        providers: vec![service.to_string()],
        service: Some(service.to_string()),
        available_date: Some(available_date),
        imdb_rating: title.imdb_rating.map(|r| format!("{:.1}", r)),
        imdb_id: title.imdb_id,
        year,
    }
}

fn details_to_item(details: WatchmodeTitleDetails, media_type: MediaType) -> MediaItem {
    let mut providers: Vec<String> = Vec::new();
    for source in details.sources.unwrap_or_default() {
        match catalog::watchmode_source_name(source.source_id) {
            Some(name) if !providers.iter().any(|p| p == name) => providers.push(name.to_string()),
            Some(_) => {}
            None => tracing::debug!(
                source_id = source.source_id,
                source_name = %source.name,
                "Unknown Watchmode source id"
            ),
        }
    }

    let service = if providers.is_empty() {
        FALLBACK_SERVICE.to_string()
    } else {
        providers.join(", ")
    };
    let release_date = details.release_date.unwrap_or_default();
    let year = details
        .year
        .map(|y| y.to_string())
        .or_else(|| crate::models::year_of(&release_date));

    MediaItem {
        id: format!("wm-{}", details.id),
        title: details.title,
        overview: details
            .plot_overview
            .filter(|o| !o.is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        poster_path: details.poster.filter(|p| !p.is_empty()),
        release_date,
        vote_average: details.user_rating.unwrap_or(0.0),
        genre_ids: details
            .genre_names
            .iter()
            .filter_map(|name| catalog::genre_slug_from_name(name))
            .map(String::from)
            .collect(),
        media_type,
        providers,
        service: Some(service),
        available_date: Some(STREAMING_NOW.to_string()),
        imdb_rating: None,
        imdb_id: details.imdb_id,
        year,
    }
}

fn source_names() -> Vec<&'static str> {
    catalog::WATCHMODE_SOURCES
        .iter()
        .map(|(name, _)| *name)
        .collect()
}

#[async_trait::async_trait]
impl CatalogProvider for WatchmodeProvider {
    async fn fetch_streaming(&self, media_type: MediaType) -> AppResult<Vec<MediaItem>> {
        let provider = self.clone();
        gather(self.name(), source_names(), move |service| {
            let provider = provider.clone();
            async move { provider.releases_for_service(service, media_type).await }
        })
        .await
    }

    async fn fetch_upcoming(&self, media_type: MediaType) -> AppResult<Vec<MediaItem>> {
        let provider = self.clone();
        gather(self.name(), source_names(), move |service| {
            let provider = provider.clone();
            async move { provider.upcoming_for_service(service, media_type).await }
        })
        .await
    }

    async fn search(&self, query: &str, media_type: MediaType) -> AppResult<Vec<MediaItem>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let response: WatchmodeSearchResponse = self
            .get_json(
                "autocomplete-search/",
                &[("search_value", query), ("search_type", "2")],
            )
            .await?;

        let ids: Vec<u64> = response
            .results
            .into_iter()
            .filter(|r| parse_title_type(&r.title_type) == Some(media_type))
            .take(SEARCH_DETAILS_LIMIT)
            .map(|r| r.id)
            .collect();

        let provider = self.clone();
        let items = gather(self.name(), ids, move |id| {
            let provider = provider.clone();
            async move { provider.search_item(id, media_type).await }
        })
        .await?;

        tracing::info!(
            query = %query,
            results = items.len(),
            provider = "watchmode",
            "Title search completed"
        );

        Ok(items)
    }

    fn name(&self) -> &'static str {
        "watchmode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WatchmodeSource;

    fn list_title() -> WatchmodeListTitle {
        serde_json::from_value(serde_json::json!({
            "id": 3173903,
            "title": "Example Movie",
            "year": 2025,
            "imdb_id": "tt0000001",
            "type": "movie",
            "imdb_rating": 7.3,
            "release_date": "2025-03-15"
        }))
        .unwrap()
    }

    fn details(sources: Vec<WatchmodeSource>) -> WatchmodeTitleDetails {
        WatchmodeTitleDetails {
            id: 42,
            title: "Example Show".to_string(),
            plot_overview: Some("A plot".to_string()),
            poster: Some("https://cdn/p.jpg".to_string()),
            release_date: Some("2024-06-01".to_string()),
            year: None,
            user_rating: Some(8.4),
            genre_names: vec!["Drama".to_string(), "Sci-Fi & Fantasy".to_string()],
            imdb_id: Some("tt42".to_string()),
            sources: Some(sources),
        }
    }

    fn source(id: u64, name: &str) -> WatchmodeSource {
        WatchmodeSource {
            source_id: id,
            name: name.to_string(),
            source_type: "sub".to_string(),
        }
    }

    #[test]
    fn test_release_date_start_is_compact() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 8).unwrap();
        assert_eq!(release_date_start(date), "20261008");
    }

    #[test]
    fn test_us_release_date_takes_precedence() {
        let mut title = list_title();
        title.us_release_date = Some("2025-04-01".to_string());
        assert_eq!(title_release_date(&title), Some("2025-04-01"));

        let item = list_title_to_item(title, MediaType::Movie, "Netflix", String::new());
        assert_eq!(item.release_date, "2025-04-01");
    }

    #[test]
    fn test_parse_title_type() {
        assert_eq!(parse_title_type("movie"), Some(MediaType::Movie));
        assert_eq!(parse_title_type("tv_series"), Some(MediaType::Tv));
        assert_eq!(parse_title_type("person"), None);
    }

    #[test]
    fn test_list_title_to_item() {
        let item = list_title_to_item(list_title(), MediaType::Movie, "Netflix", STREAMING_NOW.to_string());
        assert_eq!(item.id, "wm-3173903");
        assert_eq!(item.service.as_deref(), Some("Netflix"));
        assert_eq!(item.providers, vec!["Netflix".to_string()]);
        assert_eq!(item.release_date, "2025-03-15");
        assert_eq!(item.year.as_deref(), Some("2025"));
        assert_eq!(item.imdb_rating.as_deref(), Some("7.3"));
        assert_eq!(item.overview, NO_DESCRIPTION);
    }

    #[test]
    fn test_details_to_item_maps_known_sources_once() {
        let item = details_to_item(
            details(vec![source(203, "Netflix"), source(203, "Netflix"), source(387, "Max"), source(1, "Odd")]),
            MediaType::Tv,
        );
        assert_eq!(item.providers, vec!["Netflix".to_string(), "Max".to_string()]);
        assert_eq!(item.service.as_deref(), Some("Netflix, Max"));
        assert_eq!(item.year.as_deref(), Some("2024"));
        assert_eq!(item.genre_ids, vec!["drama".to_string(), "scifi".to_string()]);
    }

    #[test]
    fn test_details_without_known_sources_falls_back() {
        let item = details_to_item(details(vec![source(1, "Odd")]), MediaType::Tv);
        assert!(item.providers.is_empty());
        assert_eq!(item.service.as_deref(), Some(FALLBACK_SERVICE));
    }
}
