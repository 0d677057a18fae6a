/// Best-effort resolution of "TBA" streaming services
///
/// Three stages, cheapest first: hand-curated announcements, keyword patterns
/// over title and overview, then an LLM guess for the most popular leftovers.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        catalog, format_naive_date, ChatMessage, ChatRequest, MediaItem, TBA,
    },
    services::llm::{extract_json_object, CompletionClient},
};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const GUESS_CACHE_TTL: u64 = 86400; // 1 day
const GUESS_MODEL: &str = "gpt-4o-mini";

/// A release confirmed from an official announcement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CuratedRelease {
    pub title: String,
    pub year: String,
    pub service: String,
    /// `YYYY-MM-DD`
    pub date: String,
}

#[derive(Debug, Clone, Default)]
pub struct CuratedReleases {
    releases: Vec<CuratedRelease>,
}

impl CuratedReleases {
    pub fn new(releases: Vec<CuratedRelease>) -> Self {
        Self { releases }
    }

    /// Loads the list from a JSON file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let releases: Vec<CuratedRelease> = serde_json::from_str(&raw)?;
        tracing::info!(path = %path, count = releases.len(), "Loaded curated releases");
        Ok(Self::new(releases))
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Case-insensitive title match with an exact year
    pub fn find(&self, title: &str, year: &str) -> Option<&CuratedRelease> {
        let normalized = title.trim().to_lowercase();
        self.releases
            .iter()
            .find(|r| r.title.to_lowercase() == normalized && r.year == year)
    }
}

struct ServicePattern {
    service: &'static str,
    regex: Regex,
}

fn service_patterns() -> &'static [ServicePattern] {
    static PATTERNS: OnceLock<Vec<ServicePattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            ("Netflix", r"netflix|stranger things|bridgerton"),
            ("Disney+", r"marvel|star wars|disney|pixar|mandalorian"),
            ("Amazon Prime", r"amazon|prime video|rings of power"),
            ("Apple TV+", r"\bapple\b"),
            ("Max", r"\bhbo\b|\bmax\b|game of thrones|house of the dragon"),
            ("Paramount+", r"paramount|star trek"),
        ]
        .into_iter()
        .map(|(service, pattern)| ServicePattern {
            service,
            regex: Regex::new(pattern).expect("valid service pattern"),
        })
        .collect()
    })
}

/// Guesses a service from keywords in the title and overview
///
/// The first matching service wins; no match yields `TBA`.
pub fn predict_service_from_patterns(title: &str, overview: &str) -> &'static str {
    let text = format!("{} {}", title, overview).to_lowercase();
    service_patterns()
        .iter()
        .find(|p| p.regex.is_match(&text))
        .map(|p| p.service)
        .unwrap_or(TBA)
}

/// A service/date pair the LLM committed to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamingGuess {
    pub service: String,
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct RawGuess {
    #[serde(default)]
    service: String,
    #[serde(default)]
    date: String,
}

/// Validates an LLM reply; unknown services and "TBA" are rejected
pub fn parse_guess(reply: &str) -> Option<StreamingGuess> {
    let object = extract_json_object(reply.trim())?;
    let raw: RawGuess = serde_json::from_str(object).ok()?;
    let service = catalog::guessable_service(&raw.service)?;
    let date = NaiveDate::parse_from_str(raw.date.trim(), "%Y-%m-%d").ok();
    Some(StreamingGuess {
        service: service.to_string(),
        date,
    })
}

/// Asks the LLM which service will carry a title
#[derive(Clone)]
pub struct AiServiceGuesser {
    llm: Arc<dyn CompletionClient>,
    cache: Cache,
}

impl AiServiceGuesser {
    pub fn new(llm: Arc<dyn CompletionClient>, cache: Cache) -> Self {
        Self { llm, cache }
    }

    pub async fn guess(
        &self,
        title: &str,
        year: &str,
        release: &str,
    ) -> AppResult<Option<StreamingGuess>> {
        cached!(
            self.cache,
            CacheKey::ServiceGuess(format!("{}:{}", title, year)),
            GUESS_CACHE_TTL,
            async move {
                let reply = self.llm.complete(guess_request(title, year, release)).await?;
                let guess = parse_guess(&reply);
                match &guess {
                    Some(g) => tracing::info!(title = %title, service = %g.service, date = ?g.date, "AI service guess"),
                    None => tracing::debug!(title = %title, reply = %reply, "AI guess rejected"),
                }
                Ok::<_, AppError>(guess)
            }
        )
    }
}

fn guess_request(title: &str, year: &str, release: &str) -> ChatRequest {
    let allowed = catalog::GUESSABLE_SERVICES.join(", ");
    ChatRequest {
        model: GUESS_MODEL.to_string(),
        messages: vec![
            ChatMessage::system(format!(
                "You are a streaming service expert. Return ONLY valid JSON: \
                 {{\"service\":\"ServiceName\",\"date\":\"YYYY-MM-DD\"}}. \
                 Service must be one of: {}, or TBA if unknown. \
                 Date must be YYYY-MM-DD format or TBA.",
                allowed
            )),
            ChatMessage::user(format!(
                "Movie/Show: \"{}\" ({}), releasing {}. Which streaming service will have it and when? Reply with JSON only.",
                title, year, release
            )),
        ],
        temperature: 0.2,
        max_tokens: 60,
    }
}

/// Runs the resolution stages over a listing
#[derive(Clone)]
pub struct ServiceResolver {
    curated: CuratedReleases,
    ai: Option<AiServiceGuesser>,
    ai_limit: usize,
    ai_delay: Duration,
}

impl ServiceResolver {
    pub fn new(
        curated: CuratedReleases,
        ai: Option<AiServiceGuesser>,
        ai_limit: usize,
        ai_delay: Duration,
    ) -> Self {
        Self {
            curated,
            ai,
            ai_limit,
            ai_delay,
        }
    }

    /// Resolver that only uses the pattern heuristic
    pub fn patterns_only() -> Self {
        Self::new(CuratedReleases::default(), None, 0, Duration::ZERO)
    }

    /// Assigns services to TBA items in place and returns how many were resolved
    pub async fn resolve(&self, items: &mut [MediaItem]) -> usize {
        let mut resolved = 0;

        for item in items.iter_mut().filter(|i| i.is_tba()) {
            if self.apply_curated(item) {
                resolved += 1;
                continue;
            }
            let predicted = predict_service_from_patterns(&item.title, &item.overview);
            if predicted != TBA {
                item.assign_service(predicted);
                resolved += 1;
            } else if item.service.is_none() {
                item.service = Some(TBA.to_string());
            }
        }

        resolved + self.enhance_with_ai(items).await
    }

    fn apply_curated(&self, item: &mut MediaItem) -> bool {
        let year = item.year.clone().unwrap_or_default();
        let Some(release) = self.curated.find(&item.title, &year) else {
            return false;
        };
        item.assign_service(&release.service);
        if let Some(date) = crate::models::parse_release_date(&release.date) {
            item.release_date = release.date.clone();
            item.available_date = Some(format_naive_date(date));
        }
        true
    }

    /// Sends the highest-rated remaining TBA items to the LLM, one at a time
    async fn enhance_with_ai(&self, items: &mut [MediaItem]) -> usize {
        let Some(ai) = &self.ai else {
            return 0;
        };

        let mut candidates: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_tba())
            .map(|(idx, _)| idx)
            .collect();

        if candidates.is_empty() {
            tracing::info!("No TBA items to enhance");
            return 0;
        }

        candidates.sort_by(|a, b| items[*b].vote_average.total_cmp(&items[*a].vote_average));
        candidates.truncate(self.ai_limit);

        tracing::info!(count = candidates.len(), "Enhancing TBA items with AI");

        let mut enhanced = 0;
        for (n, idx) in candidates.into_iter().enumerate() {
            if n > 0 && !self.ai_delay.is_zero() {
                tokio::time::sleep(self.ai_delay).await;
            }

            let item = &mut items[idx];
            let year = item.year.clone().unwrap_or_default();
            let release = item.available_date.clone().unwrap_or_else(|| TBA.to_string());

            match ai.guess(&item.title, &year, &release).await {
                Ok(Some(guess)) => {
                    item.assign_service(&guess.service);
                    if let Some(date) = guess.date {
                        item.release_date = date.format("%Y-%m-%d").to_string();
                        item.available_date = Some(format_naive_date(date));
                    }
                    enhanced += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(title = %item.title, error = %e, "Failed to enhance item");
                }
            }
        }

        tracing::info!(enhanced, "AI enhancement finished");
        enhanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;
    use crate::services::llm::MockCompletionClient;

    fn tba_item(id: &str, title: &str, vote: f64) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            title: title.to_string(),
            overview: String::new(),
            poster_path: None,
            release_date: "2026-05-01".to_string(),
            vote_average: vote,
            genre_ids: vec![],
            media_type: MediaType::Movie,
            providers: vec![TBA.to_string()],
            service: Some(TBA.to_string()),
            available_date: Some("May 1, 2026".to_string()),
            imdb_rating: None,
            imdb_id: None,
            year: Some("2026".to_string()),
        }
    }

    #[test]
    fn test_patterns_first_match_wins() {
        assert_eq!(predict_service_from_patterns("Stranger Things 5", ""), "Netflix");
        assert_eq!(
            predict_service_from_patterns("Untitled", "A new Marvel adventure"),
            "Disney+"
        );
        assert_eq!(
            predict_service_from_patterns("The Rings of Power", ""),
            "Amazon Prime"
        );
        assert_eq!(
            predict_service_from_patterns("House of the Dragon", ""),
            "Max"
        );
        assert_eq!(predict_service_from_patterns("Star Trek: Legacy", ""), "Paramount+");
        assert_eq!(predict_service_from_patterns("A Quiet Film", "Nothing here"), TBA);
    }

    #[test]
    fn test_short_keywords_need_word_boundaries() {
        assert_eq!(
            predict_service_from_patterns("Maximum Overdrive", "pineapple farmers"),
            TBA
        );
        assert_eq!(predict_service_from_patterns("Mad Max", ""), "Max");
    }

    #[test]
    fn test_curated_find_is_case_insensitive() {
        let curated = CuratedReleases::new(vec![CuratedRelease {
            title: "Big Premiere".to_string(),
            year: "2026".to_string(),
            service: "Hulu".to_string(),
            date: "2026-02-01".to_string(),
        }]);
        assert!(curated.find("  big premiere ", "2026").is_some());
        assert!(curated.find("Big Premiere", "2025").is_none());
    }

    #[test]
    fn test_parse_guess_accepts_known_service() {
        let guess = parse_guess("{\"service\":\"netflix\",\"date\":\"2026-03-01\"}").unwrap();
        assert_eq!(guess.service, "Netflix");
        assert_eq!(guess.date, NaiveDate::from_ymd_opt(2026, 3, 1));
    }

    #[test]
    fn test_parse_guess_rejects_tba_and_unknown() {
        assert_eq!(parse_guess("{\"service\":\"TBA\",\"date\":\"TBA\"}"), None);
        assert_eq!(parse_guess("{\"service\":\"Crunchyroll\",\"date\":\"TBA\"}"), None);
        assert_eq!(parse_guess("I don't know"), None);
    }

    #[test]
    fn test_parse_guess_keeps_service_without_date() {
        let guess = parse_guess("{\"service\":\"Max\",\"date\":\"TBA\"}").unwrap();
        assert_eq!(guess.service, "Max");
        assert_eq!(guess.date, None);
    }

    #[tokio::test]
    async fn test_resolve_uses_curated_then_patterns() {
        let curated = CuratedReleases::new(vec![CuratedRelease {
            title: "Quiet Film".to_string(),
            year: "2026".to_string(),
            service: "Peacock".to_string(),
            date: "2026-07-04".to_string(),
        }]);
        let resolver = ServiceResolver::new(curated, None, 0, Duration::ZERO);

        let mut items = vec![
            tba_item("tmdb-1", "Quiet Film", 5.0),
            tba_item("tmdb-2", "Bridgerton", 5.0),
            tba_item("tmdb-3", "Unknown Thing", 5.0),
        ];

        let resolved = resolver.resolve(&mut items).await;

        assert_eq!(resolved, 2);
        assert_eq!(items[0].service.as_deref(), Some("Peacock"));
        assert_eq!(items[0].available_date.as_deref(), Some("Jul 4, 2026"));
        assert_eq!(items[1].service.as_deref(), Some("Netflix"));
        assert_eq!(items[2].service.as_deref(), Some(TBA));
    }

    #[tokio::test]
    async fn test_ai_only_sees_top_rated_tba_items() {
        let mut llm = MockCompletionClient::new();
        llm.expect_complete()
            .withf(|req| req.model == GUESS_MODEL && req.messages[1].content.contains("Top Pick"))
            .times(1)
            .returning(|_| Ok("{\"service\":\"Hulu\",\"date\":\"2026-09-10\"}".to_string()));

        let guesser = AiServiceGuesser::new(Arc::new(llm), Cache::disabled());
        let resolver =
            ServiceResolver::new(CuratedReleases::default(), Some(guesser), 1, Duration::ZERO);

        let mut items = vec![
            tba_item("tmdb-1", "Low Pick", 4.0),
            tba_item("tmdb-2", "Top Pick", 9.0),
        ];

        let resolved = resolver.resolve(&mut items).await;

        assert_eq!(resolved, 1);
        assert_eq!(items[1].service.as_deref(), Some("Hulu"));
        assert_eq!(items[1].release_date, "2026-09-10");
        assert_eq!(items[1].available_date.as_deref(), Some("Sep 10, 2026"));
        assert_eq!(items[0].service.as_deref(), Some(TBA));
    }

    #[tokio::test]
    async fn test_ai_errors_leave_item_untouched() {
        let mut llm = MockCompletionClient::new();
        llm.expect_complete()
            .returning(|_| Err(AppError::ExternalApi("boom".to_string())));

        let guesser = AiServiceGuesser::new(Arc::new(llm), Cache::disabled());
        let resolver =
            ServiceResolver::new(CuratedReleases::default(), Some(guesser), 5, Duration::ZERO);

        let mut items = vec![tba_item("tmdb-1", "Mystery Box", 7.0)];
        assert_eq!(resolver.resolve(&mut items).await, 0);
        assert!(items[0].is_tba());
    }
}
