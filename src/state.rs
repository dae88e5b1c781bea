//! Shared process state handed to every Axum handler.

use std::sync::Arc;

use crate::config::Config;
use crate::dispatcher::DispatcherHandle;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: DispatcherHandle,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            dispatcher: crate::dispatcher::spawn(),
            config: Arc::new(config),
        }
    }
}
