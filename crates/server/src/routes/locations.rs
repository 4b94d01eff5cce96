use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use common::metrics::LOCATION_MUTATIONS_TOTAL;
use serde::Deserialize;
use service::locations::{input, Location};
use tracing::info;

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /locations
pub async fn list(State(state): State<ServerState>) -> Json<Vec<Location>> {
    Json(state.locations.list_all().await)
}

/// GET /locations/:id
pub async fn get(
    State(state): State<ServerState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Location>, JsonApiError> {
    let Path(id) = id?;
    state
        .locations
        .get_by_id(id)
        .await
        .map(Json)
        .ok_or_else(|| JsonApiError::not_found("location"))
}

/// POST /locations
pub async fn create(
    State(state): State<ServerState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Location>), JsonApiError> {
    let Json(body) = body?;
    let new = input::sanitize_new(&body)?;
    let created = state.locations.add(new).await?;
    LOCATION_MUTATIONS_TOTAL.with_label_values(&["create"]).inc();
    info!(id = created.id, city = %created.city_name, "location_created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /locations/:id
pub async fn update(
    State(state): State<ServerState>,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<Location>, JsonApiError> {
    let Path(id) = id?;
    let Json(body) = body?;
    let patch = input::sanitize_patch(&body)?;
    match state.locations.update(id, patch).await? {
        Some(updated) => {
            LOCATION_MUTATIONS_TOTAL.with_label_values(&["update"]).inc();
            Ok(Json(updated))
        }
        None => Err(JsonApiError::not_found("location")),
    }
}

/// DELETE /locations/:id
pub async fn delete(
    State(state): State<ServerState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<StatusCode, JsonApiError> {
    let Path(id) = id?;
    if state.locations.delete(id).await? {
        LOCATION_MUTATIONS_TOTAL.with_label_values(&["delete"]).inc();
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(JsonApiError::not_found("location"))
    }
}

/// GET /favorites
pub async fn favorites(State(state): State<ServerState>) -> Json<Vec<Location>> {
    Json(state.locations.list_favorites().await)
}

/// GET /locations/search?q=
pub async fn search(
    State(state): State<ServerState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Location>>, JsonApiError> {
    let Query(query) = query?;
    Ok(Json(state.locations.search(query.q.trim()).await))
}
