//! Shared application state for the Axum webhook server.

use herald_common::config::AppConfig;
use herald_engine::dispatcher::NotificationDispatcher;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: NotificationDispatcher,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(dispatcher: NotificationDispatcher, config: AppConfig) -> Self {
        Self { dispatcher, config }
    }
}
