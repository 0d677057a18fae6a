use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{media::default_media_type, AppState};
use crate::{
    error::{AppError, AppResult},
    models::{ContentKind, MediaCard, MediaType},
    services::filters::{filter_by_genre, search_items},
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
    #[serde(default = "default_media_type")]
    media_type: MediaType,
    genre: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub items: Vec<MediaCard>,
}

/// Handler for title search
///
/// Falls back to filtering the streaming listing locally when every
/// upstream search fails.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    let query = params.q.trim().to_string();
    if query.is_empty() {
        return Err(AppError::InvalidInput(
            "Search query cannot be empty".to_string(),
        ));
    }

    let items = match state.aggregator.search(&query, params.media_type).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(query = %query, error = %e, "Upstream search failed, filtering listing");
            let listing = state
                .aggregator
                .collect(ContentKind::Streaming, params.media_type)
                .await?;
            search_items(&listing, &query)
        }
    };

    let items = filter_by_genre(items, params.genre.as_deref());

    Ok(Json(SearchResponse {
        query,
        items: items.into_iter().map(MediaCard::from).collect(),
    }))
}
