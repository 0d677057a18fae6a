use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;
use crate::{
    error::AppResult,
    models::{ContentKind, MediaCard, MediaType},
    services::{
        filters::{DateFilter, MediaFilter},
        SourceStats,
    },
};

pub(crate) fn default_media_type() -> MediaType {
    MediaType::Movie
}

#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    #[serde(default)]
    content: ContentKind,
    #[serde(default = "default_media_type")]
    media_type: MediaType,
    genre: Option<String>,
    #[serde(default)]
    date: DateFilter,
    service: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub items: Vec<MediaCard>,
    /// Source counts before filtering
    pub stats: SourceStats,
}

/// Handler for the aggregated listing endpoint
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MediaQuery>,
) -> AppResult<Json<MediaResponse>> {
    let items = state
        .aggregator
        .collect(params.content, params.media_type)
        .await?;
    let stats = SourceStats::from_items(&items);

    let filter = MediaFilter {
        genre: params.genre,
        date: params.date,
        service: params.service,
    };
    let items = filter.apply(items, Utc::now().date_naive());

    tracing::info!(
        content = ?params.content,
        media_type = %params.media_type,
        shown = items.len(),
        total = stats.total,
        "Media listing served"
    );

    Ok(Json(MediaResponse {
        items: items.into_iter().map(MediaCard::from).collect(),
        stats,
    }))
}
