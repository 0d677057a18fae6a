use crate::{
    error::{AppError, AppResult},
    models::{AiRecommendation, ChatMessage, ChatRequest, MediaItem},
    services::llm::{extract_json_array, CompletionClient},
};
use std::sync::Arc;

const MODEL: &str = "gpt-3.5-turbo";
const LIKED_LIMIT: usize = 3;
const AVAILABLE_LIMIT: usize = 30;
const SIMILAR_LIMIT: usize = 5;
const FALLBACK_SERVICE: &str = "Streaming";

/// A recommendation matched back to a listed item
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub item: MediaItem,
    pub reason: String,
}

/// Generates watch suggestions from the user's likes
///
/// Suggestions are restricted to the items the caller says are available;
/// the model only picks and explains.
#[derive(Clone)]
pub struct Recommender {
    llm: Option<Arc<dyn CompletionClient>>,
}

impl Recommender {
    pub fn new(llm: Option<Arc<dyn CompletionClient>>) -> Self {
        Self { llm }
    }

    pub fn is_enabled(&self) -> bool {
        self.llm.is_some()
    }

    fn client(&self) -> AppResult<&Arc<dyn CompletionClient>> {
        self.llm
            .as_ref()
            .ok_or_else(|| AppError::NotConfigured("OpenAI API key is not set".to_string()))
    }

    /// Three picks from `available` based on `liked`
    pub async fn recommend(
        &self,
        liked: &[MediaItem],
        available: &[MediaItem],
    ) -> AppResult<Vec<Recommendation>> {
        if liked.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one liked title is required".to_string(),
            ));
        }
        let client = self.client()?;
        if available.is_empty() {
            return Ok(Vec::new());
        }

        let request = ChatRequest {
            model: MODEL.to_string(),
            messages: vec![
                ChatMessage::system(
                    "You are a helpful streaming recommendation assistant. Always respond with valid JSON only.",
                ),
                ChatMessage::user(recommendation_prompt(liked, available)),
            ],
            temperature: 0.7,
            max_tokens: 500,
        };

        let reply = client.complete(request).await?;
        let picks = parse_recommendations(&reply)?;
        let matched = match_recommendations(picks, available);

        tracing::info!(
            liked = liked.len(),
            available = available.len(),
            matched = matched.len(),
            "Recommendations generated"
        );

        Ok(matched)
    }

    /// One-line "Watch X on Y" suggestion for an item, empty when nothing is similar
    pub async fn similar(&self, item: &MediaItem, available: &[MediaItem]) -> AppResult<String> {
        let client = self.client()?;

        let candidates: Vec<&MediaItem> = available
            .iter()
            .filter(|other| other.id != item.id && other.shares_genre_with(item))
            .take(SIMILAR_LIMIT)
            .collect();

        if candidates.is_empty() {
            return Ok(String::new());
        }

        let list = candidates
            .iter()
            .map(|c| format!("- {} on {}", c.title, service_of(c)))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Based on someone watching \"{}\", recommend ONE show/movie from this list in 10 words or less:\n\n{}\n\nRespond with ONLY: \"Watch [title] on [service]\" - nothing else.",
            item.title, list
        );

        let request = ChatRequest {
            model: MODEL.to_string(),
            messages: vec![
                ChatMessage::system("You are a concise recommendation assistant."),
                ChatMessage::user(prompt),
            ],
            temperature: 0.8,
            max_tokens: 30,
        };

        let reply = client.complete(request).await?;
        Ok(reply.trim().trim_matches('"').to_string())
    }
}

fn service_of(item: &MediaItem) -> &str {
    item.service
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_SERVICE)
}

fn prompt_line(item: &MediaItem) -> String {
    format!(
        "- {} ({}) on {}",
        item.title,
        item.genre_ids.join(", "),
        service_of(item)
    )
}

fn recommendation_prompt(liked: &[MediaItem], available: &[MediaItem]) -> String {
    let liked = liked
        .iter()
        .take(LIKED_LIMIT)
        .map(prompt_line)
        .collect::<Vec<_>>()
        .join("\n");
    let available = available
        .iter()
        .take(AVAILABLE_LIMIT)
        .map(prompt_line)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a streaming content recommendation expert. Based on what the user likes, recommend 3 shows/movies from the available list.

User likes these:
{liked}

Available content:
{available}

Return ONLY a JSON array with 3 recommendations in this exact format, no other text:
[
  {{
    "title": "exact title from available list",
    "reason": "brief reason why they'd like it (max 15 words)",
    "genres": "genres as string",
    "service": "streaming service name"
  }}
]"#
    )
}

fn parse_recommendations(reply: &str) -> AppResult<Vec<AiRecommendation>> {
    let json = extract_json_array(reply).ok_or_else(|| {
        AppError::ExternalApi("LLM reply did not contain a JSON array".to_string())
    })?;
    serde_json::from_str(json)
        .map_err(|e| AppError::ExternalApi(format!("Failed to parse recommendations: {}", e)))
}

/// Pairs each pick with the first available item whose title equals, contains,
/// or is contained in the recommended title
fn match_recommendations(
    picks: Vec<AiRecommendation>,
    available: &[MediaItem],
) -> Vec<Recommendation> {
    picks
        .into_iter()
        .filter_map(|pick| {
            let wanted = pick.title.trim().to_lowercase();
            if wanted.is_empty() {
                return None;
            }
            let found = available.iter().find(|item| {
                let title = item.title.trim().to_lowercase();
                !title.is_empty()
                    && (title == wanted || title.contains(&wanted) || wanted.contains(&title))
            });
            match found {
                Some(item) => Some(Recommendation {
                    item: item.clone(),
                    reason: pick.reason,
                }),
                None => {
                    tracing::debug!(title = %pick.title, "Recommendation not in available list");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;
    use crate::services::llm::MockCompletionClient;

    fn item(id: &str, title: &str, genres: &[&str], service: Option<&str>) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            title: title.to_string(),
            overview: String::new(),
            poster_path: None,
            release_date: "2024-01-01".to_string(),
            vote_average: 7.5,
            genre_ids: genres.iter().map(|g| g.to_string()).collect(),
            media_type: MediaType::Tv,
            providers: service.map(|s| vec![s.to_string()]).unwrap_or_default(),
            service: service.map(String::from),
            available_date: None,
            imdb_rating: None,
            imdb_id: None,
            year: Some("2024".to_string()),
        }
    }

    fn recommender(mock: MockCompletionClient) -> Recommender {
        Recommender::new(Some(Arc::new(mock)))
    }

    #[tokio::test]
    async fn test_recommend_requires_liked_items() {
        let result = recommender(MockCompletionClient::new())
            .recommend(&[], &[item("tmdb-1", "Dark", &["drama"], Some("Netflix"))])
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_recommend_without_llm_is_not_configured() {
        let liked = [item("tmdb-1", "Dark", &["drama"], Some("Netflix"))];
        let result = Recommender::new(None).recommend(&liked, &liked).await;
        assert!(matches!(result, Err(AppError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_recommend_with_nothing_available_skips_llm() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete().never();

        let liked = [item("tmdb-1", "Dark", &["drama"], Some("Netflix"))];
        let recs = recommender(mock).recommend(&liked, &[]).await.unwrap();
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn test_recommend_matches_titles_loosely() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .withf(|req| {
                req.model == "gpt-3.5-turbo"
                    && req.max_tokens == 500
                    && req.messages[1].content.contains("- Dark (drama, scifi) on Netflix")
                    && req.messages[1].content.contains("- 1899 (mystery) on Streaming")
            })
            .times(1)
            .returning(|_| {
                Ok(r#"Sure! [
                    {"title": "1899", "reason": "Same creators", "genres": "mystery", "service": "Netflix"},
                    {"title": "Severance", "reason": "Mind-bending", "genres": ["drama", "scifi"], "service": "Apple TV+"},
                    {"title": "Unknown Show", "reason": "n/a", "genres": "", "service": "Hulu"}
                ]"#
                .to_string())
            });

        let liked = [item("tmdb-1", "Dark", &["drama", "scifi"], Some("Netflix"))];
        let available = [
            item("tmdb-2", "1899", &["mystery"], None),
            item("sa-3", "Severance: Season 2", &["drama"], Some("Apple TV+")),
        ];

        let recs = recommender(mock).recommend(&liked, &available).await.unwrap();

        let ids: Vec<_> = recs.iter().map(|r| r.item.id.as_str()).collect();
        assert_eq!(ids, vec!["tmdb-2", "sa-3"]);
        assert_eq!(recs[0].reason, "Same creators");
    }

    #[test]
    fn test_untitled_items_never_match() {
        let picks = vec![
            AiRecommendation {
                title: "Severance".to_string(),
                reason: "r1".to_string(),
                genres: Vec::new(),
                service: String::new(),
            },
            AiRecommendation {
                title: "Totally Unlisted".to_string(),
                reason: "r2".to_string(),
                genres: Vec::new(),
                service: String::new(),
            },
        ];
        let available = [
            item("tmdb-", "  ", &["drama"], None),
            item("sa-3", "Severance", &["drama"], Some("Apple TV+")),
        ];

        let recs = match_recommendations(picks, &available);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].item.id, "sa-3");
        assert_eq!(recs[0].reason, "r1");
    }

    #[tokio::test]
    async fn test_recommend_rejects_reply_without_array() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .returning(|_| Ok("I cannot help with that".to_string()));

        let liked = [item("tmdb-1", "Dark", &["drama"], Some("Netflix"))];
        let result = recommender(mock).recommend(&liked, &liked).await;
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }

    #[tokio::test]
    async fn test_similar_uses_genre_overlap() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .withf(|req| {
                let prompt = &req.messages[1].content;
                req.max_tokens == 30
                    && prompt.contains("- Ozark on Netflix")
                    && !prompt.contains("Bluey")
                    && !prompt.contains("- Dark on")
            })
            .times(1)
            .returning(|_| Ok("\"Watch Ozark on Netflix\"\n".to_string()));

        let current = item("tmdb-1", "Dark", &["drama"], Some("Netflix"));
        let available = [
            current.clone(),
            item("tmdb-2", "Ozark", &["crime", "drama"], Some("Netflix")),
            item("tmdb-3", "Bluey", &["animation"], Some("Disney+")),
        ];

        let suggestion = recommender(mock).similar(&current, &available).await.unwrap();
        assert_eq!(suggestion, "Watch Ozark on Netflix");
    }

    #[tokio::test]
    async fn test_similar_without_candidates_is_empty() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete().never();

        let current = item("tmdb-1", "Dark", &["drama"], Some("Netflix"));
        let available = [item("tmdb-3", "Bluey", &["animation"], Some("Disney+"))];

        let suggestion = recommender(mock).similar(&current, &available).await.unwrap();
        assert!(suggestion.is_empty());
    }
}
