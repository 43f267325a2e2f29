//! API module for HTTP handlers.
//!
//! This module contains route definitions and request/response handlers.

pub mod dto;
pub mod error;
pub mod handlers;

use axum::{
    Router,
    routing::{get, patch},
};

pub use dto::{CreateItemRequest, ItemResponse, ListQuery, UpdateItemRequest};
pub use error::{ApiError, ApiErrorResponse, FieldError, ValidationError};
pub use handlers::{
    AppState, HealthResponse, create_item, delete_item, get_item, health_check, list_items,
    mark_done, mark_not_done, update_item,
};

/// Builds the application router without middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/todos", get(list_items).post(create_item))
        .route(
            "/api/v1/todos/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/api/v1/todos/{id}/done", patch(mark_done))
        .route("/api/v1/todos/{id}/not-done", patch(mark_not_done))
        .with_state(state)
}
