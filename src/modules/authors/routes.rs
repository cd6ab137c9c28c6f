use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use shelf_db::{Author, AuthorWithBookCount, AuthorWithBooks};
use shelf_http::{
    error::AppError,
    extract::{ApiJson, EntityId},
};

use super::{models::AuthorPayload, service::AuthorService};

pub fn router(service: AuthorService) -> Router {
    Router::new()
        .route("/", get(list_authors).post(create_author))
        .route(
            "/{id}",
            get(get_author).put(update_author).delete(delete_author),
        )
        .with_state(service)
}

async fn list_authors(
    State(service): State<AuthorService>,
) -> Result<Json<Vec<AuthorWithBookCount>>, AppError> {
    Ok(Json(service.list().await?))
}

async fn get_author(
    State(service): State<AuthorService>,
    EntityId(id): EntityId,
) -> Result<Json<AuthorWithBooks>, AppError> {
    Ok(Json(service.get(id).await?))
}

async fn create_author(
    State(service): State<AuthorService>,
    ApiJson(payload): ApiJson<AuthorPayload>,
) -> Result<(StatusCode, Json<Author>), AppError> {
    let name = payload.validate()?;
    let author = service.create(&name).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

async fn update_author(
    State(service): State<AuthorService>,
    EntityId(id): EntityId,
    ApiJson(payload): ApiJson<AuthorPayload>,
) -> Result<Json<Author>, AppError> {
    let name = payload.validate()?;
    Ok(Json(service.update(id, &name).await?))
}

async fn delete_author(
    State(service): State<AuthorService>,
    EntityId(id): EntityId,
) -> Result<Json<Value>, AppError> {
    service.delete(id).await?;
    Ok(Json(json!({ "message": "Author deleted successfully" })))
}
