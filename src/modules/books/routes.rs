use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use shelf_db::BookWithAuthor;
use shelf_http::{
    error::AppError,
    extract::{ApiJson, EntityId},
};

use super::{
    models::{CreateBookPayload, UpdateBookPayload},
    service::BookService,
};

pub fn router(service: BookService) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/{id}", get(get_book).put(update_book).delete(delete_book))
        .with_state(service)
}

async fn list_books(
    State(service): State<BookService>,
) -> Result<Json<Vec<BookWithAuthor>>, AppError> {
    Ok(Json(service.list().await?))
}

async fn get_book(
    State(service): State<BookService>,
    EntityId(id): EntityId,
) -> Result<Json<BookWithAuthor>, AppError> {
    Ok(Json(service.get(id).await?))
}

async fn create_book(
    State(service): State<BookService>,
    ApiJson(payload): ApiJson<CreateBookPayload>,
) -> Result<(StatusCode, Json<BookWithAuthor>), AppError> {
    let book = payload.validate()?;
    let created = service.create(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_book(
    State(service): State<BookService>,
    EntityId(id): EntityId,
    ApiJson(payload): ApiJson<UpdateBookPayload>,
) -> Result<Json<BookWithAuthor>, AppError> {
    let patch = payload.validate()?;
    Ok(Json(service.update(id, patch).await?))
}

async fn delete_book(
    State(service): State<BookService>,
    EntityId(id): EntityId,
) -> Result<Json<Value>, AppError> {
    service.delete(id).await?;
    Ok(Json(json!({ "message": "Book deleted successfully" })))
}
