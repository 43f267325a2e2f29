//! To-do list service.
//!
//! An HTTP API over to-do items with a three-state lifecycle
//! (`not done`, `done`, `past due`) and a background sweeper that moves
//! overdue items to `past due`.

pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod service;
