//! Global application state.
//!
//! Handlers extract the parts they need with [`axum::extract::State`].

use crate::feature::item::item_service::ItemService;
use axum::extract::FromRef;
use std::sync::Arc;

/// A shared, type erased [`ItemService`].
pub type DynItemService = Arc<dyn ItemService>;

/// Global application state.
#[derive(Clone, FromRef)]
pub struct AppState {
    items: DynItemService,
}

impl AppState {
    /// Constructs a new [`AppState`].
    pub fn new(items: DynItemService) -> Self {
        Self { items }
    }
}
