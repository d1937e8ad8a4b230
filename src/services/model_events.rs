//! Model registration events from upstream connections.
//!
//! Each event updates the [`ModelRegistry`] synchronously and, for
//! registrations, queues the [`ModelSeeder`] on the background worker. The two
//! consumers are independent: neither waits for nor depends on the other.

use std::sync::Arc;

use super::{background::BackgroundQueue, model_registry::ModelRegistry, model_seeder::ModelSeeder};
use crate::models::model::ModelDescriptor;

#[derive(Debug, Clone)]
pub enum ModelEvent {
    /// A connection published its complete model list.
    Registered {
        provider: String,
        connection_id: String,
        models: Vec<ModelDescriptor>,
    },
    /// A connection went away.
    Unregistered {
        provider: String,
        connection_id: String,
    },
}

/// Fans registration events out to the registry and the seeding hook.
#[derive(Clone)]
pub struct ModelEventHub {
    registry: Arc<ModelRegistry>,
    seeder: ModelSeeder,
    background: BackgroundQueue,
}

impl ModelEventHub {
    pub fn new(registry: Arc<ModelRegistry>, seeder: ModelSeeder, background: BackgroundQueue) -> Self {
        Self {
            registry,
            seeder,
            background,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn publish(&self, event: ModelEvent) {
        match event {
            ModelEvent::Registered {
                provider,
                connection_id,
                models,
            } => {
                tracing::info!(%provider, %connection_id, count = models.len(), "models registered");
                self.registry.upsert(&provider, &connection_id, &models);

                let seeder = self.seeder.clone();
                self.background.submit("seed_model_mappings", async move {
                    seeder.seed(&provider, &models).await;
                });
            }
            ModelEvent::Unregistered {
                provider,
                connection_id,
            } => {
                tracing::info!(%provider, %connection_id, "models unregistered");
                self.registry.remove(&provider, &connection_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{services::background::BackgroundLimits, store::memory::MemoryStore};
    use std::time::Duration;

    #[tokio::test]
    async fn registration_reaches_registry_and_seeder() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(ModelRegistry::new());
        let (background, _handle) = BackgroundQueue::spawn(BackgroundLimits::default());
        let hub = ModelEventHub::new(registry.clone(), ModelSeeder::new(store.clone()), background);

        hub.publish(ModelEvent::Registered {
            provider: "claude".to_string(),
            connection_id: "conn-1".to_string(),
            models: vec![ModelDescriptor::new("claude-opus-4")],
        });
        assert!(registry.get_by_provider_and_id("claude", "claude-opus-4").is_some());

        let mut seeded = false;
        for _ in 0..100 {
            if store.mappings().len() == 1 {
                seeded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(seeded, "mapping was never seeded");

        hub.publish(ModelEvent::Unregistered {
            provider: "claude".to_string(),
            connection_id: "conn-1".to_string(),
        });
        assert!(registry.snapshot().is_empty());
        // Unregistering never deletes persisted mappings.
        assert_eq!(store.mappings().len(), 1);
    }
}
