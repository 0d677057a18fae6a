use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::AppState;
use crate::{
    error::{AppError, AppResult},
    models::catalog::{self, CatalogEntry},
};

#[derive(Debug, Serialize)]
pub struct CatalogProbeResponse {
    pub service: String,
    pub catalogs: Vec<String>,
}

pub async fn services() -> Json<Vec<CatalogEntry>> {
    Json(catalog::entries(catalog::STREAMING_SERVICES))
}

pub async fn genres() -> Json<Vec<CatalogEntry>> {
    Json(catalog::entries(catalog::GENRES))
}

/// Which Streaming Availability catalogs return data for a service code
pub async fn probe(
    State(state): State<Arc<AppState>>,
    Path(service): Path<String>,
) -> AppResult<Json<CatalogProbeResponse>> {
    let provider = state.streaming_availability.as_ref().ok_or_else(|| {
        AppError::NotConfigured("Streaming Availability API key is not set".to_string())
    })?;

    let service = service.trim().to_lowercase();
    if catalog::streaming_availability_name(&service).is_none() {
        return Err(AppError::InvalidInput(format!(
            "Unknown service code: {}",
            service
        )));
    }

    let catalogs = provider.probe_catalogs(&service).await;
    tracing::info!(service = %service, working = ?catalogs, "Catalog probe finished");

    Ok(Json(CatalogProbeResponse { service, catalogs }))
}
