//! Domain module for to-do items.
//!
//! This module contains the item model, its status, and the clock abstraction.

pub mod clock;
pub mod item;

pub use clock::{Clock, ManualClock, SystemClock};
pub use item::{Item, ItemDraft, ItemId, ItemStatus, UnknownStatus};
