//! Store contract for to-do items.
//!
//! Every method is a single logical transaction. Writes are compare-and-swap
//! on [`Item::version`]: a save carrying a version that no longer matches the
//! stored record fails with [`StoreError::VersionConflict`] and changes nothing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Item, ItemDraft, ItemId};

// =============================================================================
// Store Error
// =============================================================================

/// Errors that can occur during store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record exists for the id.
    #[error("Item not found: {0}")]
    NotFound(ItemId),

    /// Optimistic locking conflict.
    ///
    /// `expected` is the version currently stored; `found` is the version
    /// carried by the rejected write.
    #[error("Version conflict on item {id}: expected {expected}, found {found}")]
    VersionConflict {
        id: ItemId,
        expected: u64,
        found: u64,
    },

    /// Database connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A stored row could not be turned back into an item.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl StoreError {
    /// Returns `true` for [`StoreError::VersionConflict`].
    #[must_use]
    pub const fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

// =============================================================================
// Item Store
// =============================================================================

/// Persistent mapping from item id to item record.
///
/// Returned sequences carry no ordering guarantee.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Finds an item by its id.
    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    /// Stores a new item and returns it with a freshly assigned id and version 1.
    ///
    /// Ids start at 1 and are strictly increasing.
    async fn insert(&self, draft: ItemDraft) -> Result<Item, StoreError>;

    /// Replaces the stored record with `item`.
    ///
    /// Fails with [`StoreError::NotFound`] when the id is absent and with
    /// [`StoreError::VersionConflict`] when the stored version differs from
    /// `item.version`. Returns the item carrying its new version.
    async fn save(&self, item: &Item) -> Result<Item, StoreError>;

    /// Replaces every record in `items`, all or nothing.
    ///
    /// A missing id or a version conflict on any element aborts the batch.
    async fn save_all(&self, items: &[Item]) -> Result<Vec<Item>, StoreError>;

    /// Deletes an item. Returns whether a record existed.
    async fn delete_by_id(&self, id: ItemId) -> Result<bool, StoreError>;

    /// Returns every stored item.
    async fn find_all(&self) -> Result<Vec<Item>, StoreError>;

    /// Returns every item whose status is not `done`.
    async fn find_all_excluding_done(&self) -> Result<Vec<Item>, StoreError>;

    /// Returns `not done` items due strictly before `instant`.
    async fn find_not_done_with_due_before(
        &self,
        instant: DateTime<Utc>,
    ) -> Result<Vec<Item>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_version_conflict_message() {
        let error = StoreError::VersionConflict {
            id: ItemId::from_i64(3),
            expected: 2,
            found: 1,
        };
        assert_eq!(
            error.to_string(),
            "Version conflict on item 3: expected 2, found 1"
        );
        assert!(error.is_version_conflict());
    }

    #[rstest]
    #[case(StoreError::NotFound(ItemId::from_i64(1)))]
    #[case(StoreError::DatabaseError("connection refused".to_string()))]
    #[case(StoreError::SerializationError("bad status".to_string()))]
    fn test_other_errors_are_not_conflicts(#[case] error: StoreError) {
        assert!(!error.is_version_conflict());
    }
}
