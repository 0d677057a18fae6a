use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::HashMap, fmt::Display};

pub mod card;
pub mod catalog;

pub use card::MediaCard;

/// Service name used while a title's streaming home is unknown
pub const TBA: &str = "TBA";

pub const STREAMING_NOW: &str = "Streaming Now";

pub const NO_DESCRIPTION: &str = "No description available";

/// Movie or TV show
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    /// Path segment used by TMDB (`movie/...`, `tv/...`)
    pub fn tmdb_path(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }

    /// `show_type` value used by the Streaming Availability API
    pub fn show_type(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "series",
        }
    }

    /// `types` value used by Watchmode
    pub fn watchmode_type(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv_series",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Movie => "Movie",
            MediaType::Tv => "TV Show",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tmdb_path())
    }
}

/// Which listing is being assembled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Streaming,
    Upcoming,
}

/// Upstream a media item came from, derived from its id prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Tmdb,
    StreamingAvailability,
    Watchmode,
    Unknown,
}

/// A movie or TV show as shown to the user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    /// Source-prefixed id (`tmdb-`, `sa-`, `wm-`)
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    /// `YYYY-MM-DD`, `YYYY`, or empty
    #[serde(default)]
    pub release_date: String,
    /// Score on a 0-10 scale
    #[serde(default)]
    pub vote_average: f64,
    /// Genre slugs (see [`catalog::GENRES`])
    #[serde(default)]
    pub genre_ids: Vec<String>,
    pub media_type: MediaType,
    #[serde(default)]
    pub providers: Vec<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub available_date: Option<String>,
    #[serde(default)]
    pub imdb_rating: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

impl MediaItem {
    pub fn source(&self) -> Source {
        if self.id.starts_with("tmdb-") {
            Source::Tmdb
        } else if self.id.starts_with("sa-") {
            Source::StreamingAvailability
        } else if self.id.starts_with("wm-") {
            Source::Watchmode
        } else {
            Source::Unknown
        }
    }

    /// True when no streaming service has been assigned yet
    pub fn is_tba(&self) -> bool {
        match self.service.as_deref() {
            None => true,
            Some(service) => service.is_empty() || service == TBA,
        }
    }

    /// Assigns a single service, replacing any previous guess
    pub fn assign_service(&mut self, service: &str) {
        self.service = Some(service.to_string());
        self.providers = vec![service.to_string()];
    }

    pub fn release(&self) -> Option<NaiveDate> {
        parse_release_date(&self.release_date)
    }

    pub fn shares_genre_with(&self, other: &MediaItem) -> bool {
        self.genre_ids.iter().any(|g| other.genre_ids.contains(g))
    }
}

/// Year component of a release date, if one is present
pub fn year_of(date: &str) -> Option<String> {
    let year = date.split('-').next()?.trim();
    if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) {
        Some(year.to_string())
    } else {
        None
    }
}

/// Parses `YYYY-MM-DD` or a bare `YYYY` (taken as January 1st)
pub fn parse_release_date(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Some(parsed);
    }
    let year: i32 = year_of(date)?.parse().ok()?;
    if date.len() == 4 {
        NaiveDate::from_ymd_opt(year, 1, 1)
    } else {
        None
    }
}

/// Formats a date as "Mar 15, 2025"
pub fn format_naive_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Formats a release date for display; anything unparseable is "TBA"
pub fn format_date(date: &str) -> String {
    parse_release_date(date)
        .map(format_naive_date)
        .unwrap_or_else(|| TBA.to_string())
}

/// Recommendation returned by the LLM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiRecommendation {
    pub title: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub genres: Vec<String>,
    #[serde(default)]
    pub service: String,
}

/// Accepts `"Drama, Comedy"` as well as `["Drama", "Comedy"]`
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        String(String),
        List(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::String(s) => s
            .split(',')
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect(),
        StringOrList::List(list) => list,
    })
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// One page of a TMDB list endpoint (`movie/popular`, `tv/on_the_air`, ...)
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPage {
    #[serde(default)]
    pub results: Vec<TmdbListItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbListItem {
    pub id: u64,
    /// Movies carry `title`, TV shows carry `name`
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<u64>,
    /// Only present on `search/multi`
    #[serde(default)]
    pub media_type: Option<String>,
}

impl TmdbListItem {
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_default()
    }

    /// Release date for movies, first air date for TV
    pub fn date(&self) -> Option<String> {
        self.release_date
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| self.first_air_date.clone().filter(|d| !d.is_empty()))
    }
}

/// `/{type}/{id}/watch/providers`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbWatchProviders {
    #[serde(default)]
    pub results: HashMap<String, TmdbRegionProviders>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbRegionProviders {
    #[serde(default)]
    pub flatrate: Vec<TmdbWatchProvider>,
    #[serde(default)]
    pub free: Vec<TmdbWatchProvider>,
    #[serde(default)]
    pub ads: Vec<TmdbWatchProvider>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbWatchProvider {
    pub provider_id: u64,
    #[serde(default)]
    pub provider_name: String,
}

/// `/{type}/{id}/external_ids`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TmdbExternalIds {
    #[serde(default)]
    pub imdb_id: Option<String>,
}

// ============================================================================
// Streaming Availability API Types
// ============================================================================

/// Response of `/shows/search/filters`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiShowPage {
    #[serde(default)]
    pub shows: Vec<ApiShow>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiShow {
    pub id: String,
    #[serde(default)]
    pub imdb_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub show_type: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub first_air_year: Option<i32>,
    /// 0-100
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub genres: Vec<ApiGenre>,
    #[serde(default)]
    pub image_set: Option<ApiImageSet>,
}

impl ApiShow {
    pub fn year(&self) -> Option<i32> {
        self.first_air_year.or(self.release_year)
    }

    pub fn media_type(&self) -> MediaType {
        if self.show_type == "movie" {
            MediaType::Movie
        } else {
            MediaType::Tv
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiGenre {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiImageSet {
    #[serde(default)]
    pub vertical_poster: Option<ApiPoster>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPoster {
    #[serde(default)]
    pub w480: Option<String>,
}

// ============================================================================
// Watchmode API Types
// ============================================================================

/// Response of `/v1/list-titles/`
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeTitleList {
    #[serde(default)]
    pub titles: Vec<WatchmodeListTitle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeListTitle {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(rename = "type", default)]
    pub title_type: String,
    #[serde(default)]
    pub plot_overview: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub tmdb_rating: Option<f64>,
    #[serde(default)]
    pub imdb_rating: Option<f64>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub us_release_date: Option<String>,
}

/// Watchmode autocomplete search result
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeSearchResult {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub title_type: String,
    #[serde(default)]
    pub year: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeSearchResponse {
    #[serde(default)]
    pub results: Vec<WatchmodeSearchResult>,
}

/// Watchmode title details response
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeTitleDetails {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub plot_overview: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub user_rating: Option<f64>,
    #[serde(default)]
    pub genre_names: Vec<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<WatchmodeSource>>,
}

/// Watchmode streaming source
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeSource {
    pub source_id: u64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub source_type: String,
}

// ============================================================================
// OMDb API Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OmdbTitle {
    #[serde(rename = "imdbRating", default)]
    pub imdb_rating: Option<String>,
}

// ============================================================================
// OpenAI Chat API Types
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            title: "Dune".to_string(),
            overview: String::new(),
            poster_path: None,
            release_date: "2024-03-01".to_string(),
            vote_average: 8.2,
            genre_ids: vec!["scifi".to_string()],
            media_type: MediaType::Movie,
            providers: vec![],
            service: None,
            available_date: None,
            imdb_rating: None,
            imdb_id: None,
            year: Some("2024".to_string()),
        }
    }

    #[test]
    fn test_source_from_id_prefix() {
        assert_eq!(item("tmdb-1").source(), Source::Tmdb);
        assert_eq!(item("sa-1").source(), Source::StreamingAvailability);
        assert_eq!(item("wm-1").source(), Source::Watchmode);
        assert_eq!(item("x-1").source(), Source::Unknown);
    }

    #[test]
    fn test_is_tba() {
        let mut media = item("tmdb-1");
        assert!(media.is_tba());
        media.service = Some(TBA.to_string());
        assert!(media.is_tba());
        media.assign_service("Netflix");
        assert!(!media.is_tba());
        assert_eq!(media.providers, vec!["Netflix".to_string()]);
    }

    #[test]
    fn test_parse_release_date() {
        assert_eq!(
            parse_release_date("2025-03-15"),
            NaiveDate::from_ymd_opt(2025, 3, 15)
        );
        assert_eq!(parse_release_date("2026"), NaiveDate::from_ymd_opt(2026, 1, 1));
        assert_eq!(parse_release_date(""), None);
        assert_eq!(parse_release_date("soon"), None);
        assert_eq!(parse_release_date("2025-13-40"), None);
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2025-03-05"), "Mar 5, 2025");
        assert_eq!(format_date("2026"), "Jan 1, 2026");
        assert_eq!(format_date(""), "TBA");
    }

    #[test]
    fn test_year_of() {
        assert_eq!(year_of("2024-10-01"), Some("2024".to_string()));
        assert_eq!(year_of("1999"), Some("1999".to_string()));
        assert_eq!(year_of(""), None);
    }

    #[test]
    fn test_media_type_serde() {
        assert_eq!(serde_json::to_string(&MediaType::Tv).unwrap(), "\"tv\"");
        let parsed: MediaType = serde_json::from_str("\"movie\"").unwrap();
        assert_eq!(parsed, MediaType::Movie);
    }

    #[test]
    fn test_ai_recommendation_genres_as_string() {
        let json = r#"{"title":"Dark","reason":"twisty","genres":"Drama, Mystery","service":"Netflix"}"#;
        let rec: AiRecommendation = serde_json::from_str(json).unwrap();
        assert_eq!(rec.genres, vec!["Drama".to_string(), "Mystery".to_string()]);
    }

    #[test]
    fn test_ai_recommendation_genres_as_list() {
        let json = r#"{"title":"Dark","reason":"twisty","genres":["Drama"],"service":"Netflix"}"#;
        let rec: AiRecommendation = serde_json::from_str(json).unwrap();
        assert_eq!(rec.genres, vec!["Drama".to_string()]);
    }

    #[test]
    fn test_tmdb_item_prefers_title_then_name() {
        let json = r#"{"id": 1, "name": "Severance", "first_air_date": "2022-02-18", "genre_ids": [18]}"#;
        let item: TmdbListItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.display_title(), "Severance");
        assert_eq!(item.date(), Some("2022-02-18".to_string()));
    }

    #[test]
    fn test_api_show_deserialization() {
        let json = r#"{
            "id": "82",
            "imdbId": "tt0068646",
            "title": "The Godfather",
            "showType": "movie",
            "releaseYear": 1972,
            "rating": 92,
            "genres": [{"id": "crime", "name": "Crime"}],
            "imageSet": {"verticalPoster": {"w480": "https://img/p.jpg"}}
        }"#;
        let show: ApiShow = serde_json::from_str(json).unwrap();
        assert_eq!(show.media_type(), MediaType::Movie);
        assert_eq!(show.year(), Some(1972));
        assert_eq!(show.genres[0].id, "crime");
        assert_eq!(
            show.image_set.unwrap().vertical_poster.unwrap().w480,
            Some("https://img/p.jpg".to_string())
        );
    }
}
