use std::sync::Arc;

use crate::token::TokenProvider;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Token provider backing the relay endpoint
    pub tokens: Arc<dyn TokenProvider>,
}

impl AppState {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self { tokens }
    }
}
