use crate::{
    error::{AppError, AppResult},
    models::{ContentKind, MediaItem, MediaType, Source, NO_DESCRIPTION, TBA},
    services::{providers::CatalogProvider, service_guess::ServiceResolver},
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-source item counts for a listing
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SourceStats {
    pub tmdb: usize,
    pub streaming_availability: usize,
    pub watchmode: usize,
    pub total: usize,
}

impl SourceStats {
    pub fn from_items(items: &[MediaItem]) -> Self {
        let mut stats = Self {
            total: items.len(),
            ..Self::default()
        };
        for item in items {
            match item.source() {
                Source::Tmdb => stats.tmdb += 1,
                Source::StreamingAvailability => stats.streaming_availability += 1,
                Source::Watchmode => stats.watchmode += 1,
                Source::Unknown => {}
            }
        }
        stats
    }
}

/// Fans a listing request out to every registered provider and merges the results
///
/// Providers are queried concurrently. Registration order decides which
/// duplicate wins, so register the most complete source first.
#[derive(Clone)]
pub struct Aggregator {
    providers: Vec<Arc<dyn CatalogProvider>>,
    resolver: ServiceResolver,
}

impl Aggregator {
    pub fn new(providers: Vec<Arc<dyn CatalogProvider>>, resolver: ServiceResolver) -> Self {
        Self {
            providers,
            resolver,
        }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Merged listing for one content kind and media type
    pub async fn collect(&self, kind: ContentKind, media_type: MediaType) -> AppResult<Vec<MediaItem>> {
        let batches = self
            .run_all(move |provider| async move {
                match kind {
                    ContentKind::Streaming => provider.fetch_streaming(media_type).await,
                    ContentKind::Upcoming => provider.fetch_upcoming(media_type).await,
                }
            })
            .await?;

        let mut items = merge(batches);

        if kind == ContentKind::Upcoming {
            let resolved = self.resolver.resolve(&mut items).await;
            tracing::info!(resolved, total = items.len(), "Resolved upcoming services");
        }

        let stats = SourceStats::from_items(&items);
        tracing::info!(
            kind = ?kind,
            media_type = %media_type,
            tmdb = stats.tmdb,
            streaming_availability = stats.streaming_availability,
            watchmode = stats.watchmode,
            total = stats.total,
            "Listing aggregated"
        );

        Ok(items)
    }

    /// Merged search results across providers
    pub async fn search(&self, query: &str, media_type: MediaType) -> AppResult<Vec<MediaItem>> {
        let query = query.to_string();
        let batches = self
            .run_all(move |provider| {
                let query = query.clone();
                async move { provider.search(&query, media_type).await }
            })
            .await?;

        Ok(merge(batches))
    }

    /// Runs `call` once per provider on its own task, in registration order
    ///
    /// Fails only when every provider failed.
    async fn run_all<F, Fut>(&self, call: F) -> AppResult<Vec<Vec<MediaItem>>>
    where
        F: Fn(Arc<dyn CatalogProvider>) -> Fut,
        Fut: std::future::Future<Output = AppResult<Vec<MediaItem>>> + Send + 'static,
    {
        let tasks: Vec<_> = self
            .providers
            .iter()
            .map(|provider| (provider.name(), tokio::spawn(call(Arc::clone(provider)))))
            .collect();

        let mut batches = Vec::with_capacity(tasks.len());
        let mut errors = Vec::new();

        for (name, task) in tasks {
            match task.await {
                Ok(Ok(items)) => {
                    tracing::debug!(provider = name, count = items.len(), "Provider returned items");
                    batches.push(items);
                }
                Ok(Err(e)) => {
                    tracing::error!(provider = name, error = %e, "Provider failed");
                    errors.push(e);
                }
                Err(e) => {
                    tracing::error!(provider = name, error = %e, "Provider task join error");
                    errors.push(AppError::Internal(e.to_string()));
                }
            }
        }

        if batches.is_empty() && !errors.is_empty() {
            return Err(AppError::ExternalApi(
                "Every catalog provider failed".to_string(),
            ));
        }

        Ok(batches)
    }
}

/// Lower-cased title with collapsed whitespace, paired with the year
fn dedupe_key(item: &MediaItem) -> (String, String) {
    let title = item
        .title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    (title, item.year.clone().unwrap_or_default())
}

/// Merges provider batches; the first occurrence of a title wins and later
/// duplicates only fill gaps
pub fn merge(batches: Vec<Vec<MediaItem>>) -> Vec<MediaItem> {
    let mut merged: Vec<MediaItem> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for item in batches.into_iter().flatten() {
        let key = dedupe_key(&item);
        match index.get(&key) {
            Some(&pos) => absorb(&mut merged[pos], item),
            None => {
                index.insert(key, merged.len());
                merged.push(item);
            }
        }
    }

    merged
}

fn absorb(kept: &mut MediaItem, other: MediaItem) {
    let other_is_tba = other.is_tba();

    if kept.is_tba() && !other_is_tba {
        kept.service = other.service.clone();
        kept.providers.retain(|p| p != TBA);
        if kept.available_date.is_none() {
            kept.available_date = other.available_date.clone();
        }
    }

    for provider in other.providers {
        if provider == TBA && !kept.is_tba() {
            continue;
        }
        if !kept.providers.contains(&provider) {
            kept.providers.push(provider);
        }
    }

    if kept.poster_path.is_none() {
        kept.poster_path = other.poster_path;
    }
    if kept.imdb_id.is_none() {
        kept.imdb_id = other.imdb_id;
    }
    if kept.imdb_rating.is_none() {
        kept.imdb_rating = other.imdb_rating;
    }
    if kept.year.is_none() {
        kept.year = other.year;
    }
    let kept_lacks_overview = kept.overview.is_empty() || kept.overview == NO_DESCRIPTION;
    if kept_lacks_overview && !other.overview.is_empty() {
        kept.overview = other.overview;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn item(id: &str, title: &str, year: &str, service: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            title: title.to_string(),
            overview: NO_DESCRIPTION.to_string(),
            poster_path: None,
            release_date: format!("{}-05-01", year),
            vote_average: 7.0,
            genre_ids: vec!["drama".to_string()],
            media_type: MediaType::Movie,
            providers: vec![service.to_string()],
            service: Some(service.to_string()),
            available_date: None,
            imdb_rating: None,
            imdb_id: None,
            year: Some(year.to_string()),
        }
    }

    struct StaticProvider {
        name: &'static str,
        items: Vec<MediaItem>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StaticProvider {
        fn new(name: &'static str, items: Vec<MediaItem>) -> Arc<Self> {
            Arc::new(Self {
                name,
                items,
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                items: vec![],
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn respond(&self) -> AppResult<Vec<MediaItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::ExternalApi(format!("{} down", self.name)))
            } else {
                Ok(self.items.clone())
            }
        }
    }

    #[async_trait::async_trait]
    impl CatalogProvider for StaticProvider {
        async fn fetch_streaming(&self, _media_type: MediaType) -> AppResult<Vec<MediaItem>> {
            self.respond()
        }

        async fn fetch_upcoming(&self, _media_type: MediaType) -> AppResult<Vec<MediaItem>> {
            self.respond()
        }

        async fn search(&self, query: &str, _media_type: MediaType) -> AppResult<Vec<MediaItem>> {
            let items = self.respond()?;
            Ok(items
                .into_iter()
                .filter(|i| i.title.to_lowercase().contains(&query.to_lowercase()))
                .collect())
        }

        fn name(&self) -> &'static str {
            self.name
        }
    }

    #[test]
    fn test_merge_unions_providers_and_fills_gaps() {
        let first = item("tmdb-1", "The  Bear", "2022", "Hulu");
        let mut second = item("sa-9", "the bear", "2022", "Disney+");
        second.poster_path = Some("https://img/bear.jpg".to_string());
        second.imdb_id = Some("tt14452776".to_string());
        second.overview = "Chef returns home".to_string();

        let merged = merge(vec![vec![first], vec![second]]);

        assert_eq!(merged.len(), 1);
        let bear = &merged[0];
        assert_eq!(bear.id, "tmdb-1");
        assert_eq!(bear.service.as_deref(), Some("Hulu"));
        assert_eq!(bear.providers, vec!["Hulu".to_string(), "Disney+".to_string()]);
        assert_eq!(bear.poster_path.as_deref(), Some("https://img/bear.jpg"));
        assert_eq!(bear.imdb_id.as_deref(), Some("tt14452776"));
        assert_eq!(bear.overview, "Chef returns home");
    }

    #[test]
    fn test_merge_keeps_different_years_apart() {
        let merged = merge(vec![
            vec![item("tmdb-1", "Dune", "1984", "Max")],
            vec![item("sa-1", "Dune", "2021", "Max")],
        ]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_real_service_replaces_tba() {
        let merged = merge(vec![
            vec![item("tmdb-1", "Severance", "2025", TBA)],
            vec![item("wm-1", "Severance", "2025", "Apple TV+")],
        ]);
        assert_eq!(merged[0].service.as_deref(), Some("Apple TV+"));
        assert_eq!(merged[0].providers, vec!["Apple TV+".to_string()]);
    }

    #[test]
    fn test_merge_ignores_tba_from_later_duplicates() {
        let merged = merge(vec![
            vec![item("tmdb-1", "Severance", "2025", "Apple TV+")],
            vec![item("wm-1", "Severance", "2025", TBA)],
        ]);
        assert_eq!(merged[0].providers, vec!["Apple TV+".to_string()]);
    }

    #[test]
    fn test_source_stats() {
        let items = vec![
            item("tmdb-1", "A", "2020", "Netflix"),
            item("tmdb-2", "B", "2020", "Netflix"),
            item("sa-1", "C", "2020", "Netflix"),
            item("wm-1", "D", "2020", "Netflix"),
        ];
        let stats = SourceStats::from_items(&items);
        assert_eq!(
            stats,
            SourceStats {
                tmdb: 2,
                streaming_availability: 1,
                watchmode: 1,
                total: 4
            }
        );
    }

    #[tokio::test]
    async fn test_collect_survives_one_failing_provider() {
        let good = StaticProvider::new("good", vec![item("tmdb-1", "Arcane", "2021", "Netflix")]);
        let bad = StaticProvider::failing("bad");
        let aggregator = Aggregator::new(
            vec![bad.clone(), good.clone()],
            ServiceResolver::patterns_only(),
        );

        let items = aggregator
            .collect(ContentKind::Streaming, MediaType::Tv)
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(bad.calls.load(Ordering::SeqCst), 1);
        assert_eq!(good.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_collect_fails_when_all_providers_fail() {
        let aggregator = Aggregator::new(
            vec![StaticProvider::failing("a"), StaticProvider::failing("b")],
            ServiceResolver::patterns_only(),
        );
        let result = aggregator.collect(ContentKind::Streaming, MediaType::Movie).await;
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }

    #[tokio::test]
    async fn test_collect_without_providers_is_empty() {
        let aggregator = Aggregator::new(vec![], ServiceResolver::patterns_only());
        let items = aggregator
            .collect(ContentKind::Upcoming, MediaType::Movie)
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_collect_upcoming_resolves_tba_by_pattern() {
        let mut tba = item("tmdb-5", "Stranger Things 5", "2027", TBA);
        tba.providers = vec![TBA.to_string()];
        let aggregator = Aggregator::new(
            vec![StaticProvider::new("tmdb", vec![tba])],
            ServiceResolver::patterns_only(),
        );

        let items = aggregator
            .collect(ContentKind::Upcoming, MediaType::Tv)
            .await
            .unwrap();

        assert_eq!(items[0].service.as_deref(), Some("Netflix"));
    }

    #[tokio::test]
    async fn test_search_merges_across_providers() {
        let aggregator = Aggregator::new(
            vec![
                StaticProvider::new("a", vec![item("tmdb-1", "Arcane", "2021", "Netflix")]),
                StaticProvider::new("b", vec![item("wm-1", "Arcane", "2021", "Netflix")]),
            ],
            ServiceResolver::patterns_only(),
        );

        let items = aggregator.search("arc", MediaType::Tv).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "tmdb-1");
    }
}
