//! Shared application state handed to every handler and the auth middleware.

use std::sync::Arc;

use crate::{
    services::{gate::Gate, model_events::ModelEventHub, model_registry::ModelRegistry},
    store::GateStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GateStore>,
    pub gate: Gate,
    pub events: ModelEventHub,
}

impl AppState {
    pub fn registry(&self) -> &ModelRegistry {
        self.events.registry()
    }
}
