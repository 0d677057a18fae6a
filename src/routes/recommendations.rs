use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{MediaCard, MediaItem},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub liked: Vec<MediaItem>,
    #[serde(default)]
    pub available: Vec<MediaItem>,
}

#[derive(Debug, Serialize)]
pub struct RecommendedCard {
    #[serde(flatten)]
    pub card: MediaCard,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<RecommendedCard>,
}

#[derive(Debug, Deserialize)]
pub struct SimilarRequest {
    pub item: MediaItem,
    #[serde(default)]
    pub available: Vec<MediaItem>,
}

#[derive(Debug, Serialize)]
pub struct SimilarResponse {
    pub suggestion: String,
}

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    tracing::info!(
        request_id = %request_id,
        liked_count = request.liked.len(),
        available_count = request.available.len(),
        "Processing recommendation request"
    );

    let recommendations = state
        .recommender
        .recommend(&request.liked, &request.available)
        .await?
        .into_iter()
        .map(|rec| RecommendedCard {
            card: MediaCard::from(rec.item),
            reason: rec.reason,
        })
        .collect();

    Ok(Json(RecommendationResponse { recommendations }))
}

/// Handler for the single "watch this next" suggestion
pub async fn similar(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<SimilarRequest>,
) -> AppResult<Json<SimilarResponse>> {
    tracing::info!(
        request_id = %request_id,
        title = %request.item.title,
        "Processing similar-title request"
    );

    let suggestion = state
        .recommender
        .similar(&request.item, &request.available)
        .await?;

    Ok(Json(SimilarResponse { suggestion }))
}
