//! Seeds model-name mappings from registration events.
//!
//! Every (provider, model) pair seen for the first time gets an enabled identity
//! mapping (source = target = the registered id). Existing rows are never touched,
//! so an operator who repointed a model to an alias keeps that alias, and a model
//! registered under a name that is already some mapping's target is not re-added.
//!
//! Failures are logged and swallowed: seeding warms a table, it does not gate requests.

use std::{collections::HashSet, sync::Arc};

use crate::{
    models::model::{ModelDescriptor, NewModelMapping},
    store::GateStore,
};

#[derive(Clone)]
pub struct ModelSeeder {
    store: Arc<dyn GateStore>,
}

impl ModelSeeder {
    pub fn new(store: Arc<dyn GateStore>) -> Self {
        Self { store }
    }

    /// Insert identity mappings for unseen models. Returns how many were inserted.
    pub async fn seed(&self, provider: &str, models: &[ModelDescriptor]) -> usize {
        if provider.is_empty() {
            return 0;
        }

        let mut seen = HashSet::new();
        let mut inserted = 0;

        for model in models {
            if model.id.is_empty() || !seen.insert(model.key()) {
                continue;
            }

            match self.store.model_mapping_exists(provider, &model.id).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(provider, model = %model.id, error = %err, "failed to look up model mapping");
                    continue;
                }
            }

            let mapping = NewModelMapping::identity(provider, &model.id);
            match self.store.insert_model_mapping(&mapping).await {
                Ok(true) => {
                    inserted += 1;
                    tracing::debug!(provider, model = %model.id, "seeded model mapping");
                }
                Ok(false) => {
                    tracing::debug!(provider, model = %model.id, "model mapping written concurrently");
                }
                Err(err) => {
                    tracing::warn!(provider, model = %model.id, error = %err, "failed to seed model mapping");
                }
            }
        }

        inserted
    }
}
