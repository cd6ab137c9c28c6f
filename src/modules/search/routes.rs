use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;
use shelf_http::{error::AppError, extract::ApiQuery};

use super::service::{SearchResults, SearchService};

/// `q` is required but may be empty.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

pub fn router(service: SearchService) -> Router {
    Router::new()
        .route("/", get(search))
        .with_state(service)
}

async fn search(
    State(service): State<SearchService>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<SearchResults>, AppError> {
    let query = params
        .q
        .ok_or_else(|| AppError::invalid_field("q", "required"))?;
    Ok(Json(service.search(&query).await?))
}
