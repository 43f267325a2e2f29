//! Item state machine.
//!
//! [`ItemService`] owns every rule about which transitions are legal. The
//! HTTP layer and the sweeper only ever go through it.
//!
//! Writes are optimistic: the loaded item carries its store version, and a
//! save that loses the compare-and-swap reloads the item and re-runs the
//! whole decision, state checks included.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Clock, Item, ItemDraft, ItemId};
use crate::infrastructure::{ItemStore, StoreError};

/// Attempts made for one read-modify-write before giving up with a conflict.
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Reason given for a blank description.
pub const MUST_NOT_BE_BLANK: &str = "must not be blank";
/// Reason given for a due instant that is not after now.
pub const MUST_BE_FUTURE: &str = "must be a future date";

// =============================================================================
// Errors
// =============================================================================

/// A rejected request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Wire name of the field (`description`, `dueDateTime`, ...).
    pub field: String,
    /// Human readable reason.
    pub reason: String,
}

impl FieldViolation {
    /// Creates a violation.
    #[must_use]
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}: '{}'", self.field, self.reason)
    }
}

/// Failures of item operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ItemError {
    /// One or more fields were rejected.
    #[error("Invalid Request")]
    InvalidRequest(Vec<FieldViolation>),

    /// No item with this id.
    #[error("Item id {0} not found")]
    NotFound(ItemId),

    /// The transition is refused in the item's current state.
    #[error("{message}")]
    ActionNotAllowed { id: ItemId, message: String },

    /// Every write attempt lost the compare-and-swap.
    #[error("Todo item with id {0} was modified concurrently, please retry")]
    Conflict(ItemId),

    /// The store failed.
    #[error("Store failure: {0}")]
    Store(StoreError),
}

impl ItemError {
    /// Refusal to edit an overdue item.
    #[must_use]
    pub fn update_past_due(id: ItemId) -> Self {
        Self::ActionNotAllowed {
            id,
            message: format!(
                "Updates on Todo item with id {id} is not allowed because it's past due"
            ),
        }
    }

    /// Refusal to reopen an overdue item.
    #[must_use]
    pub fn reopen_past_due(id: ItemId) -> Self {
        Self::ActionNotAllowed {
            id,
            message: format!(
                "Todo item with id {id} can't be marked as NOT DONE because it's past due"
            ),
        }
    }

    /// Single-field validation failure.
    #[must_use]
    pub fn invalid(field: &str, reason: &str) -> Self {
        Self::InvalidRequest(vec![FieldViolation::new(field, reason)])
    }
}

impl From<StoreError> for ItemError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::VersionConflict { id, .. } => Self::Conflict(id),
            other => Self::Store(other),
        }
    }
}

// =============================================================================
// Pure transition planning
// =============================================================================

/// Outcome of deciding a transition on a loaded item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Nothing to change; the loaded item is the result.
    Keep(Item),
    /// The item must be written.
    Write(Item),
}

/// Checks the fields of a new item against `now`.
///
/// # Errors
///
/// Returns [`ItemError::InvalidRequest`] listing every rejected field.
pub fn validate_new_item(
    description: &str,
    due_date_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ItemError> {
    let mut violations = Vec::new();
    if description.trim().is_empty() {
        violations.push(FieldViolation::new("description", MUST_NOT_BE_BLANK));
    }
    if due_date_time <= now {
        violations.push(FieldViolation::new("dueDateTime", MUST_BE_FUTURE));
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ItemError::InvalidRequest(violations))
    }
}

/// Decides a partial update.
///
/// A blank description is ignored. The status never changes here, so a
/// `done` item stays `done`.
///
/// # Errors
///
/// [`ItemError::ActionNotAllowed`] for overdue items, and
/// [`ItemError::InvalidRequest`] for a due instant that is not in the future.
pub fn plan_update(
    item: Item,
    description: Option<&str>,
    due_date_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Step, ItemError> {
    if item.is_past_due(now) {
        return Err(ItemError::update_past_due(item.id));
    }

    let mut updated = item;
    let mut changed = false;

    if let Some(description) = description.filter(|text| !text.trim().is_empty()) {
        updated = updated.with_description(description);
        changed = true;
    }
    if let Some(due_date_time) = due_date_time {
        if due_date_time <= now {
            return Err(ItemError::invalid("dueDateTime", MUST_BE_FUTURE));
        }
        updated = updated.with_due_date_time(due_date_time);
        changed = true;
    }

    Ok(if changed {
        Step::Write(updated.touched(now))
    } else {
        Step::Keep(updated)
    })
}

/// Decides completion. Overdue and `past due` items may still be completed.
#[must_use]
pub fn plan_mark_done(item: Item, now: DateTime<Utc>) -> Step {
    if item.status.is_done() {
        Step::Keep(item)
    } else {
        Step::Write(item.completed(now))
    }
}

/// Decides reopening.
///
/// # Errors
///
/// [`ItemError::ActionNotAllowed`] for overdue items.
pub fn plan_mark_not_done(item: Item, now: DateTime<Utc>) -> Result<Step, ItemError> {
    if item.is_past_due(now) {
        return Err(ItemError::reopen_past_due(item.id));
    }
    Ok(if item.status.is_done() {
        Step::Write(item.reopened(now))
    } else {
        Step::Keep(item)
    })
}

// =============================================================================
// Item Service
// =============================================================================

/// Entry point for every item operation.
#[derive(Clone)]
pub struct ItemService {
    store: Arc<dyn ItemStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ItemService {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ItemService")
            .field("store", &"Arc<dyn ItemStore>")
            .field("clock", &"Arc<dyn Clock>")
            .finish()
    }
}

impl ItemService {
    /// Creates a service over a store and a clock.
    #[must_use]
    pub fn new(store: Arc<dyn ItemStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Returns the clock the service reads.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Lists items sorted by id. `done` items are included only with `include_all`.
    ///
    /// # Errors
    ///
    /// [`ItemError::Store`] on store failure.
    pub async fn list_items(&self, include_all: bool) -> Result<Vec<Item>, ItemError> {
        tracing::info!(include_all, "Listing items");
        let mut items = if include_all {
            self.store.find_all().await?
        } else {
            self.store.find_all_excluding_done().await?
        };
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    /// Fetches one item.
    ///
    /// # Errors
    ///
    /// [`ItemError::NotFound`] if absent.
    pub async fn get_item(&self, id: ItemId) -> Result<Item, ItemError> {
        tracing::info!(item_id = %id, "Fetching item");
        self.load(id).await
    }

    /// Creates an item in status `not done`.
    ///
    /// # Errors
    ///
    /// [`ItemError::InvalidRequest`] for a blank description or a due instant
    /// that is not strictly after now.
    pub async fn add_item(
        &self,
        description: &str,
        due_date_time: DateTime<Utc>,
    ) -> Result<Item, ItemError> {
        let now = self.clock.now();
        validate_new_item(description, due_date_time, now)?;

        let item = self
            .store
            .insert(ItemDraft::new(description, due_date_time, now))
            .await?;
        tracing::info!(item_id = %item.id, due_date_time = %item.due_date_time, "Added item");
        Ok(item)
    }

    /// Applies a partial update. Without effective changes nothing is written.
    ///
    /// # Errors
    ///
    /// See [`plan_update`]; also [`ItemError::NotFound`] and [`ItemError::Conflict`].
    pub async fn update_item(
        &self,
        id: ItemId,
        description: Option<String>,
        due_date_time: Option<DateTime<Utc>>,
    ) -> Result<Item, ItemError> {
        tracing::info!(item_id = %id, "Updating item");
        self.mutate(id, |item, now| {
            plan_update(item, description.as_deref(), due_date_time, now)
        })
        .await
    }

    /// Marks an item `done`. Completing a `done` item writes nothing.
    ///
    /// # Errors
    ///
    /// [`ItemError::NotFound`] if absent.
    pub async fn mark_as_done(&self, id: ItemId) -> Result<Item, ItemError> {
        tracing::info!(item_id = %id, "Marking item as done");
        self.mutate(id, |item, now| Ok(plan_mark_done(item, now)))
            .await
    }

    /// Reopens a `done` item. Reopening an open item writes nothing.
    ///
    /// # Errors
    ///
    /// [`ItemError::ActionNotAllowed`] for overdue items; [`ItemError::NotFound`] if absent.
    pub async fn mark_as_not_done(&self, id: ItemId) -> Result<Item, ItemError> {
        tracing::info!(item_id = %id, "Marking item as not done");
        self.mutate(id, plan_mark_not_done).await
    }

    /// Deletes an item.
    ///
    /// # Errors
    ///
    /// [`ItemError::NotFound`] if absent.
    pub async fn delete_item(&self, id: ItemId) -> Result<(), ItemError> {
        tracing::info!(item_id = %id, "Deleting item");
        if self.store.delete_by_id(id).await? {
            Ok(())
        } else {
            Err(ItemError::NotFound(id))
        }
    }

    /// Moves every overdue `not done` item to `past due` in one batch.
    ///
    /// Returns how many items were moved.
    ///
    /// # Errors
    ///
    /// [`ItemError::Store`] on store failure, [`ItemError::Conflict`] when the
    /// batch keeps racing with client writes or deletes.
    pub async fn sweep_past_due(&self) -> Result<usize, ItemError> {
        let mut attempt = 1;
        loop {
            let now = self.clock.now();
            let overdue = self.store.find_not_done_with_due_before(now).await?;
            if overdue.is_empty() {
                tracing::debug!("No overdue items");
                return Ok(0);
            }

            let expired: Vec<Item> = overdue.into_iter().map(|item| item.expired(now)).collect();
            tracing::info!(count = expired.len(), "Updating {} items to past due", expired.len());

            match self.store.save_all(&expired).await {
                Ok(saved) => return Ok(saved.len()),
                Err(error) if Self::should_retry_batch(&error, attempt) => attempt += 1,
                Err(StoreError::NotFound(id)) => return Err(ItemError::Conflict(id)),
                Err(error) => return Err(error.into()),
            }
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    async fn load(&self, id: ItemId) -> Result<Item, ItemError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(ItemError::NotFound(id))
    }

    fn should_retry(error: &StoreError, attempt: u32) -> bool {
        if error.is_version_conflict() && attempt < MAX_WRITE_ATTEMPTS {
            tracing::warn!(attempt, error = %error, "Write lost a concurrent update, retrying");
            true
        } else {
            false
        }
    }

    /// A batch also goes stale when one of its items is deleted after the query.
    fn should_retry_batch(error: &StoreError, attempt: u32) -> bool {
        match error {
            StoreError::NotFound(id) if attempt < MAX_WRITE_ATTEMPTS => {
                tracing::warn!(attempt, item_id = %id, "Swept item was deleted, retrying");
                true
            }
            _ => Self::should_retry(error, attempt),
        }
    }

    /// Runs load, plan, save; reloading and re-planning on version conflicts.
    async fn mutate<F>(&self, id: ItemId, plan: F) -> Result<Item, ItemError>
    where
        F: Fn(Item, DateTime<Utc>) -> Result<Step, ItemError> + Send + Sync,
    {
        let mut attempt = 1;
        loop {
            let item = self.load(id).await?;
            let updated = match plan(item, self.clock.now())? {
                Step::Keep(item) => {
                    tracing::debug!(item_id = %id, "Nothing to change");
                    return Ok(item);
                }
                Step::Write(item) => item,
            };

            match self.store.save(&updated).await {
                Ok(saved) => return Ok(saved),
                Err(error) if Self::should_retry(&error, attempt) => attempt += 1,
                Err(error) => return Err(error.into()),
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
