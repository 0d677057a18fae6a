use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    db::Cache,
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::{
        llm::{CompletionClient, OpenAiClient},
        providers::{
            CatalogProvider, StreamingAvailabilityProvider, TmdbProvider, WatchmodeProvider,
        },
        ratings::RatingsClient,
        service_guess::{AiServiceGuesser, CuratedReleases, ServiceResolver},
        Aggregator, Recommender,
    },
};

pub mod catalog;
pub mod media;
pub mod recommendations;
pub mod search;

/// Shared state handed to every handler
pub struct AppState {
    pub aggregator: Aggregator,
    pub recommender: Recommender,
    /// Present only when the Streaming Availability key is configured
    pub streaming_availability: Option<StreamingAvailabilityProvider>,
}

impl AppState {
    /// Wires providers and LLM clients for every configured API key
    ///
    /// Registration order is TMDB, Streaming Availability, Watchmode; the
    /// aggregator keeps the first copy of a duplicated title.
    pub fn from_config(config: &Config, cache: Cache) -> anyhow::Result<Self> {
        let mut providers: Vec<Arc<dyn CatalogProvider>> = Vec::new();

        if let Some(key) = &config.tmdb_api_key {
            let ratings = RatingsClient::new(
                cache.clone(),
                config.omdb_api_key.clone(),
                config.omdb_api_url.clone(),
            );
            providers.push(Arc::new(TmdbProvider::new(
                cache.clone(),
                ratings,
                key.clone(),
                config.tmdb_api_url.clone(),
                config.region.clone(),
                config.tmdb_pages,
            )));
        }

        let streaming_availability = config.streaming_api_key.as_ref().map(|key| {
            StreamingAvailabilityProvider::new(
                key.clone(),
                config.streaming_api_url.clone(),
                config.country(),
            )
        });
        if let Some(provider) = &streaming_availability {
            providers.push(Arc::new(provider.clone()));
        }

        if let Some(key) = &config.watchmode_api_key {
            providers.push(Arc::new(WatchmodeProvider::new(
                key.clone(),
                config.watchmode_api_url.clone(),
            )));
        }

        let llm: Option<Arc<dyn CompletionClient>> = match &config.openai_api_key {
            Some(key) => Some(Arc::new(OpenAiClient::new(
                key.clone(),
                config.openai_api_url.clone(),
                Duration::from_secs(config.llm_timeout_secs),
            )?)),
            None => None,
        };

        let curated = match &config.curated_releases_path {
            Some(path) => CuratedReleases::from_file(path)?,
            None => CuratedReleases::default(),
        };

        let resolver = ServiceResolver::new(
            curated,
            llm.clone()
                .map(|client| AiServiceGuesser::new(client, cache.clone())),
            config.ai_enhance_limit,
            Duration::from_millis(config.ai_delay_ms),
        );

        for (variable, missing) in [
            ("TMDB_API_KEY", config.tmdb_api_key.is_none()),
            ("STREAMING_API_KEY", config.streaming_api_key.is_none()),
            ("WATCHMODE_API_KEY", config.watchmode_api_key.is_none()),
            ("OPENAI_API_KEY", config.openai_api_key.is_none()),
        ] {
            if missing {
                tracing::error!(variable, "API key not set, dependent features disabled");
            }
        }

        let aggregator = Aggregator::new(providers, resolver);
        tracing::info!(
            providers = ?aggregator.provider_names(),
            llm_enabled = llm.is_some(),
            cache_enabled = cache.is_enabled(),
            "Application state initialized"
        );

        Ok(Self {
            aggregator,
            recommender: Recommender::new(llm),
            streaming_availability,
        })
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/media", get(media::list))
        .route("/search", get(search::search))
        .route("/recommendations", post(recommendations::recommend))
        .route("/recommendations/similar", post(recommendations::similar))
        .route("/services", get(catalog::services))
        .route("/genres", get(catalog::genres))
        .route("/diagnostics/catalogs/:service", get(catalog::probe))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
