//! Application services.
//!
//! The item state machine and the background sweeper that drives its
//! time-based transition.

pub mod item_service;
pub mod sweeper;

pub use item_service::{
    FieldViolation, ItemError, ItemService, MAX_WRITE_ATTEMPTS, MUST_BE_FUTURE,
    MUST_NOT_BE_BLANK, Step,
};
pub use sweeper::{DEFAULT_SWEEP_INTERVAL, Sweeper, SweeperConfig};
