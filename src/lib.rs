//! Classroom roll-call core: roster, leave checks, per-student marking state
//! machine with a late-correction window, and durable audit history on SQLite.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod roll_call;

pub use config::{ManagerConfig, Settings};
pub use db::Storage;
pub use errors::{Result, RollCallError};
pub use roll_call::{OpenSessionRequest, RollCallManager};
