use crate::live::LiveSessionManager;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Owner of the single active live session
    pub manager: Arc<LiveSessionManager>,
}

impl AppState {
    pub fn new(manager: Arc<LiveSessionManager>) -> Self {
        Self { manager }
    }
}
