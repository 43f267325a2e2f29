//! In-memory item store.
//!
//! The default backend, also used by the test suites.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::repository::{ItemStore, StoreError};
use crate::domain::{Item, ItemDraft, ItemId, ItemStatus};

// =============================================================================
// Internal State
// =============================================================================

#[derive(Debug, Default)]
struct StoreState {
    items: BTreeMap<ItemId, Item>,
    last_id: i64,
}

impl StoreState {
    /// Checks that `item` may overwrite its stored record.
    fn check_writable(&self, item: &Item) -> Result<(), StoreError> {
        let existing = self
            .items
            .get(&item.id)
            .ok_or(StoreError::NotFound(item.id))?;
        if existing.version == item.version {
            Ok(())
        } else {
            Err(StoreError::VersionConflict {
                id: item.id,
                expected: existing.version,
                found: item.version,
            })
        }
    }

    fn write(&mut self, item: &Item) -> Item {
        let stored = Item {
            version: item.version + 1,
            ..item.clone()
        };
        self.items.insert(stored.id, stored.clone());
        stored
    }
}

// =============================================================================
// Bulk Operation Helpers
// =============================================================================

/// Returns the first id that appears more than once in `items`.
///
/// Two entries for the same id in one batch carry the same version, so the
/// second would always lose the compare-and-swap.
fn first_duplicate_id(items: &[Item]) -> Option<&Item> {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().find(|item| !seen.insert(item.id))
}

// =============================================================================
// In-Memory Item Store
// =============================================================================

/// In-memory implementation of [`ItemStore`].
///
/// An ordered map and an id counter behind a `tokio::sync::RwLock`. Each
/// call takes the lock once, so every call is atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryItemStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryItemStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn select(&self, predicate: impl Fn(&Item) -> bool + Send) -> Vec<Item> {
        let guard = self.state.read().await;
        guard
            .items
            .values()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }
}

#[allow(clippy::significant_drop_tightening)]
#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let guard = self.state.read().await;
        Ok(guard.items.get(&id).cloned())
    }

    async fn insert(&self, draft: ItemDraft) -> Result<Item, StoreError> {
        let mut guard = self.state.write().await;
        guard.last_id += 1;
        let item = draft.into_item(ItemId::from_i64(guard.last_id));
        guard.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn save(&self, item: &Item) -> Result<Item, StoreError> {
        let mut guard = self.state.write().await;
        guard.check_writable(item)?;
        Ok(guard.write(item))
    }

    async fn save_all(&self, items: &[Item]) -> Result<Vec<Item>, StoreError> {
        let mut guard = self.state.write().await;

        if let Some(duplicate) = first_duplicate_id(items) {
            return Err(StoreError::VersionConflict {
                id: duplicate.id,
                expected: duplicate.version + 1,
                found: duplicate.version,
            });
        }
        for item in items {
            guard.check_writable(item)?;
        }

        Ok(items.iter().map(|item| guard.write(item)).collect())
    }

    async fn delete_by_id(&self, id: ItemId) -> Result<bool, StoreError> {
        let mut guard = self.state.write().await;
        Ok(guard.items.remove(&id).is_some())
    }

    async fn find_all(&self) -> Result<Vec<Item>, StoreError> {
        Ok(self.select(|_| true).await)
    }

    async fn find_all_excluding_done(&self) -> Result<Vec<Item>, StoreError> {
        Ok(self.select(|item| !item.status.is_done()).await)
    }

    async fn find_not_done_with_due_before(
        &self,
        instant: DateTime<Utc>,
    ) -> Result<Vec<Item>, StoreError> {
        Ok(self
            .select(|item| item.status == ItemStatus::NotDone && item.due_date_time < instant)
            .await)
    }
}

// =============================================================================
// Tests
// =============================================================================
