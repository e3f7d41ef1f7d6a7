//! Save, load, and expire partially-filled form data across pluggable
//! storage backends.
//!
//! ARCHITECTURE
//! ============
//! `manager::ProgressManager` is the caller-facing API. It builds progress
//! records (`progress`) and persists them through one `storage` adapter
//! chosen by `config`. The `routes`, `db`, and `services` modules make up the
//! remote progress service that `storage::ServerStorage` talks to.

pub mod config;
pub mod db;
pub mod guard;
pub mod manager;
pub mod progress;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;

pub use config::{FormProgressConfig, FormProgressConfigUpdate, StorageKind};
pub use manager::ProgressManager;
pub use progress::{FormData, FormProgress, NewProgress};
pub use storage::{ProgressError, ProgressStorage, StorageError};
