//! Application context shared by all request handlers (via Axum state).

use std::sync::Arc;

use rp_core::config::Config;
use rp_core::events::EventBus;
use rp_engine::{EngineFactory, ToolRegistry};
use rp_form::{FormController, ResourceStore};

/// Cheaply cloneable because it only holds `Arc`s.
#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// The form session this server presents.
    pub form: FormController,
    /// Broadcast event bus for SSE.
    pub event_bus: Arc<EventBus>,
    /// Produced outputs, served under `/resources`.
    pub resources: Arc<ResourceStore>,
    /// External tool registry.
    pub tools: Arc<ToolRegistry>,
}

impl AppContext {
    /// Wire a fresh form to `factory`.
    pub fn new(config: Config, factory: Arc<dyn EngineFactory>, tools: Arc<ToolRegistry>) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let resources = Arc::new(ResourceStore::new());
        let form = FormController::new(
            factory,
            Arc::clone(&event_bus),
            Arc::clone(&resources),
            &config.form,
        );
        Self {
            config: Arc::new(config),
            form,
            event_bus,
            resources,
            tools,
        }
    }
}
