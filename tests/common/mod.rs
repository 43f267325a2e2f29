//! Common test helpers for integration tests.
//!
//! ```ignore
//! mod common;
//! use common::{TestApp, start};
//! ```
//!
//! Each integration test file is compiled as its own crate, so helpers used
//! by only some of them would otherwise trigger dead code warnings.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use todo_list_api::api::{AppState, router};
use todo_list_api::domain::{Item, ItemDraft, ItemId, ManualClock};
use todo_list_api::infrastructure::{InMemoryItemStore, ItemStore, StoreError};
use todo_list_api::service::ItemService;

/// Instant every test clock starts at: `2030-01-01T00:00:00Z`.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
}

// =============================================================================
// Recording Store
// =============================================================================

/// In-memory store that counts write calls.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: InMemoryItemStore,
    writes: AtomicUsize,
}

impl RecordingStore {
    /// Number of `save` and `save_all` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Direct access to the wrapped store, bypassing the counter.
    pub const fn inner(&self) -> &InMemoryItemStore {
        &self.inner
    }
}

#[async_trait]
impl ItemStore for RecordingStore {
    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, draft: ItemDraft) -> Result<Item, StoreError> {
        self.inner.insert(draft).await
    }

    async fn save(&self, item: &Item) -> Result<Item, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.save(item).await
    }

    async fn save_all(&self, items: &[Item]) -> Result<Vec<Item>, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.save_all(items).await
    }

    async fn delete_by_id(&self, id: ItemId) -> Result<bool, StoreError> {
        self.inner.delete_by_id(id).await
    }

    async fn find_all(&self) -> Result<Vec<Item>, StoreError> {
        self.inner.find_all().await
    }

    async fn find_all_excluding_done(&self) -> Result<Vec<Item>, StoreError> {
        self.inner.find_all_excluding_done().await
    }

    async fn find_not_done_with_due_before(
        &self,
        instant: DateTime<Utc>,
    ) -> Result<Vec<Item>, StoreError> {
        self.inner.find_not_done_with_due_before(instant).await
    }
}

// =============================================================================
// Test Application
// =============================================================================

/// Router, service, clock and store wired together.
pub struct TestApp {
    pub router: Router,
    pub service: ItemService,
    pub clock: ManualClock,
    pub store: Arc<RecordingStore>,
}

/// Creates a test application with the clock at [`start`].
pub fn test_app() -> TestApp {
    let clock = ManualClock::new(start());
    let store = Arc::new(RecordingStore::default());
    let service = ItemService::new(store.clone(), Arc::new(clock.clone()));
    TestApp {
        router: router(AppState::new(service.clone())),
        service,
        clock,
        store,
    }
}

impl TestApp {
    /// Sends a request and returns the status and the JSON body
    /// (`Value::Null` for an empty body).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();
        self.dispatch(request).await
    }

    /// Sends a raw JSON body, valid or not.
    pub async fn send_raw(&self, method: Method, uri: &str, raw: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(raw.to_string()))
            .unwrap();
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Inserts an item straight into the store, skipping validation.
    pub async fn insert_raw(&self, description: &str, due_date_time: DateTime<Utc>) -> Item {
        self.store
            .insert(ItemDraft::new(description, due_date_time, self.clock_now()))
            .await
            .unwrap()
    }

    fn clock_now(&self) -> DateTime<Utc> {
        use todo_list_api::domain::Clock;
        self.clock.now()
    }
}
