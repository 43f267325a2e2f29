//! HTTP handlers for the to-do API.
//!
//! Handlers validate the request, call [`ItemService`] and map its errors.
//! Every error body carries the original request path.

use axum::{
    Json,
    extract::{
        OriginalUri, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};

use super::dto::{
    CreateItemRequest, ItemResponse, ListQuery, UpdateItemRequest, parse_item_id,
    validate_create_request, validate_update_request,
};
use super::error::{ApiErrorResponse, ValidationError};
use crate::domain::ItemId;
use crate::service::{ItemError, ItemService};

// =============================================================================
// Application State
// =============================================================================

/// Shared application dependencies.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Item state machine.
    pub service: ItemService,
}

impl AppState {
    /// Creates a new `AppState` around a service.
    #[must_use]
    pub const fn new(service: ItemService) -> Self {
        Self { service }
    }
}

type HandlerResult<T> = Result<T, ApiErrorResponse>;

// =============================================================================
// Helper Functions
// =============================================================================

fn service_error(path: &str) -> impl FnOnce(ItemError) -> ApiErrorResponse + '_ {
    move |error| ApiErrorResponse::from_item_error(error, path)
}

fn invalid(path: &str) -> impl FnOnce(ValidationError) -> ApiErrorResponse + '_ {
    move |error| ApiErrorResponse::from(error).at(path)
}

fn body<T>(path: &str, payload: Result<Json<T>, JsonRejection>) -> HandlerResult<T> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| ValidationError::single("body", rejection.body_text()))
        .map_err(invalid(path))
}

fn item_id(path: &str, raw: &str) -> HandlerResult<ItemId> {
    parse_item_id(raw).map_err(invalid(path))
}

// =============================================================================
// Item Handlers
// =============================================================================

/// `GET /api/v1/todos[?includeAll=true]`
///
/// # Errors
///
/// 400 for a malformed query string, 500 on store failure.
pub async fn list_items(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> HandlerResult<Json<Vec<ItemResponse>>> {
    let path = uri.path();
    let Query(query) = query
        .map_err(|rejection| ValidationError::single("query", rejection.body_text()))
        .map_err(invalid(path))?;

    let items = state
        .service
        .list_items(query.include_all)
        .await
        .map_err(service_error(path))?;

    Ok(Json(items.iter().map(ItemResponse::from).collect()))
}

/// `GET /api/v1/todos/{id}`
///
/// # Errors
///
/// 400 for a bad id, 404 if absent.
pub async fn get_item(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(raw_id): Path<String>,
) -> HandlerResult<Json<ItemResponse>> {
    let path = uri.path();
    let id = item_id(path, &raw_id)?;

    let item = state
        .service
        .get_item(id)
        .await
        .map_err(service_error(path))?;

    Ok(Json(ItemResponse::from(item)))
}

/// `POST /api/v1/todos`
///
/// # Errors
///
/// 400 with field messages for an invalid body.
pub async fn create_item(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    payload: Result<Json<CreateItemRequest>, JsonRejection>,
) -> HandlerResult<(StatusCode, Json<ItemResponse>)> {
    let path = uri.path();
    let request = body(path, payload)?;
    let input =
        validate_create_request(&request, state.service.clock().now()).map_err(invalid(path))?;

    let item = state
        .service
        .add_item(&input.description, input.due_date_time)
        .await
        .map_err(service_error(path))?;

    Ok((StatusCode::CREATED, Json(ItemResponse::from(item))))
}

/// `PUT /api/v1/todos/{id}`
///
/// # Errors
///
/// 400 for a bad id or body, 404 if absent, 409 if the item is overdue.
pub async fn update_item(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> HandlerResult<Json<ItemResponse>> {
    let path = uri.path();
    let id = item_id(path, &raw_id)?;
    let request = body(path, payload)?;
    let changes =
        validate_update_request(&request, state.service.clock().now()).map_err(invalid(path))?;

    let item = state
        .service
        .update_item(id, changes.description, changes.due_date_time)
        .await
        .map_err(service_error(path))?;

    Ok(Json(ItemResponse::from(item)))
}

/// `PATCH /api/v1/todos/{id}/done`
///
/// # Errors
///
/// 400 for a bad id, 404 if absent.
pub async fn mark_done(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(raw_id): Path<String>,
) -> HandlerResult<Json<ItemResponse>> {
    let path = uri.path();
    let id = item_id(path, &raw_id)?;

    let item = state
        .service
        .mark_as_done(id)
        .await
        .map_err(service_error(path))?;

    Ok(Json(ItemResponse::from(item)))
}

/// `PATCH /api/v1/todos/{id}/not-done`
///
/// # Errors
///
/// 400 for a bad id, 404 if absent, 409 if the item is overdue.
pub async fn mark_not_done(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(raw_id): Path<String>,
) -> HandlerResult<Json<ItemResponse>> {
    let path = uri.path();
    let id = item_id(path, &raw_id)?;

    let item = state
        .service
        .mark_as_not_done(id)
        .await
        .map_err(service_error(path))?;

    Ok(Json(ItemResponse::from(item)))
}

/// `DELETE /api/v1/todos/{id}`. Responds 200 with an empty body.
///
/// # Errors
///
/// 400 for a bad id, 404 if absent.
pub async fn delete_item(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(raw_id): Path<String>,
) -> HandlerResult<StatusCode> {
    let path = uri.path();
    let id = item_id(path, &raw_id)?;

    state
        .service
        .delete_item(id)
        .await
        .map_err(service_error(path))?;

    Ok(StatusCode::OK)
}

// =============================================================================
// GET /health Handler
// =============================================================================

/// Health check response body.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Health check endpoint.
///
/// ```json
/// { "status": "healthy", "version": "0.1.0" }
/// ```
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
