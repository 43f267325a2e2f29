//! To-do item domain model.
//!
//! An [`Item`] is the only entity of the service. All state changes are
//! expressed as pure, consuming methods that return the next version of the
//! record; persistence and clock access happen elsewhere.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Value Objects - Newtypes
// =============================================================================

/// Store-assigned identifier of an item.
///
/// Always positive. The store hands out ids on insert and never reuses them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(i64);

impl ItemId {
    /// Wraps a raw id. Returns `None` unless `value >= 1`.
    #[must_use]
    pub const fn new(value: i64) -> Option<Self> {
        if value >= 1 { Some(Self(value)) } else { None }
    }

    /// Wraps a raw id coming from a trusted source (the store).
    #[must_use]
    pub const fn from_i64(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle status of an item.
///
/// The serialized form is the lowercase spaced label (`"not done"`). The
/// store persists the same label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ItemStatus {
    /// Open item, not yet completed.
    #[default]
    #[serde(rename = "not done")]
    NotDone,
    /// Completed item.
    #[serde(rename = "done")]
    Done,
    /// Open item whose due instant passed before it was completed.
    #[serde(rename = "past due")]
    PastDue,
}

impl ItemStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::NotDone, Self::Done, Self::PastDue];

    /// Returns the wire and storage label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotDone => "not done",
            Self::Done => "done",
            Self::PastDue => "past due",
        }
    }

    /// Returns `true` for [`ItemStatus::Done`].
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Error returned when a status label is not one of the three known labels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown status label: '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ItemStatus {
    type Err = UnknownStatus;

    /// Parses a status label, ignoring ASCII case.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

// =============================================================================
// Item Draft
// =============================================================================

/// An item that has not been stored yet and therefore has no id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    /// Text of the to-do.
    pub description: String,
    /// Instant the item is due.
    pub due_date_time: DateTime<Utc>,
    /// Creation instant; also the initial `updated_at`.
    pub created_at: DateTime<Utc>,
}

impl ItemDraft {
    /// Creates a draft stamped with `now`.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        due_date_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            description: description.into(),
            due_date_time,
            created_at: now,
        }
    }

    /// Materializes the draft as a stored item with the given id.
    ///
    /// Status starts as `not done`, `done_at` is absent and the version is 1.
    #[must_use]
    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id,
            description: self.description,
            due_date_time: self.due_date_time,
            status: ItemStatus::NotDone,
            done_at: None,
            created_at: self.created_at,
            updated_at: self.created_at,
            version: 1,
        }
    }
}

// =============================================================================
// Item
// =============================================================================

/// A stored to-do item.
///
/// `version` is the compare-and-swap token used by the store: it changes on
/// every committed write, and a save carrying a stale version is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Store-assigned id.
    pub id: ItemId,
    /// Text of the to-do.
    pub description: String,
    /// Instant the item is due.
    pub due_date_time: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: ItemStatus,
    /// Completion instant; present iff `status` is `done`.
    pub done_at: Option<DateTime<Utc>>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Instant of the last committed mutation.
    pub updated_at: DateTime<Utc>,
    /// Version of the stored record this value was read from.
    pub version: u64,
}

impl Item {
    /// Returns `true` when client edits must be refused.
    ///
    /// An item counts as past due once swept, and also as soon as its due
    /// instant is behind `now`, whether or not the sweeper has caught up yet.
    #[must_use]
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ItemStatus::PastDue || self.due_date_time < now
    }

    /// Returns `true` when `status` and `done_at` agree.
    #[must_use]
    pub const fn has_consistent_completion(&self) -> bool {
        self.status.is_done() == self.done_at.is_some()
    }

    // -------------------------------------------------------------------------
    // Pure transitions
    // -------------------------------------------------------------------------

    /// Replaces the description.
    #[must_use]
    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self
        }
    }

    /// Replaces the due instant.
    #[must_use]
    pub fn with_due_date_time(self, due_date_time: DateTime<Utc>) -> Self {
        Self {
            due_date_time,
            ..self
        }
    }

    /// Stamps `updated_at`.
    #[must_use]
    pub fn touched(self, now: DateTime<Utc>) -> Self {
        Self {
            updated_at: now,
            ..self
        }
    }

    /// Marks the item `done` at `now`.
    #[must_use]
    pub fn completed(self, now: DateTime<Utc>) -> Self {
        Self {
            status: ItemStatus::Done,
            done_at: Some(now),
            updated_at: now,
            ..self
        }
    }

    /// Reopens the item as `not done`, clearing `done_at`.
    #[must_use]
    pub fn reopened(self, now: DateTime<Utc>) -> Self {
        Self {
            status: ItemStatus::NotDone,
            done_at: None,
            updated_at: now,
            ..self
        }
    }

    /// Moves the item to `past due`.
    #[must_use]
    pub fn expired(self, now: DateTime<Utc>) -> Self {
        Self {
            status: ItemStatus::PastDue,
            updated_at: now,
            ..self
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
