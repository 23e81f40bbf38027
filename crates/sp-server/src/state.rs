//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;

use crate::dispatcher::Dispatcher;

/// Application state shared across all request handlers.
///
/// Read-only after startup, so handlers share it without locking.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The action dispatcher.
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Creates a new application state.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Returns the dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
