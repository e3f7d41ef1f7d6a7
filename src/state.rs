//! Shared application state for the progress service.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. The
//! store is a trait object so the same router serves PostgreSQL in production
//! and an in-memory session area in tests.

use std::sync::Arc;

use crate::storage::ProgressStorage;

/// Clone is required by Axum; the store is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProgressStorage>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn ProgressStorage>) -> Self {
        Self { store }
    }
}
