//! In-memory registry of the models upstream connections currently serve.
//!
//! Each (provider, connection) publishes a full replacement set of model
//! descriptors. The registry keeps those sets and, per provider, a merged view:
//! the union over that provider's live connections keyed by case-folded model id.
//!
//! # Invariants
//!
//! - Readers only ever get clones. Mutating a returned descriptor never changes
//!   what the next reader sees.
//! - Writers rebuild the provider view under the same exclusive lock that
//!   changed the connection sets, so a reader never sees a view that disagrees
//!   with the sets it came from.
//! - On a key collision between connections the first one merged wins. Map
//!   iteration order decides which that is, so the winner is unspecified.
//!   Connections of one provider are not expected to disagree on a model.
//!
//! No I/O happens while the lock is held.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::models::model::ModelDescriptor;

/// Case-folded model id -> descriptor.
type ModelSet = HashMap<String, ModelDescriptor>;

#[derive(Default)]
struct RegistryInner {
    /// provider -> connection id -> models
    connections: HashMap<String, HashMap<String, ModelSet>>,
    /// provider -> merged models
    merged: HashMap<String, ModelSet>,
}

impl RegistryInner {
    fn rebuild(&mut self, provider: &str) {
        let Some(conns) = self.connections.get(provider) else {
            self.merged.remove(provider);
            return;
        };

        let mut view = ModelSet::new();
        for set in conns.values() {
            for (key, descriptor) in set {
                view.entry(key.clone()).or_insert_with(|| descriptor.clone());
            }
        }
        self.merged.insert(provider.to_string(), view);
    }
}

/// Concurrency-safe model registry shared by every request handler.
#[derive(Default)]
pub struct ModelRegistry {
    inner: RwLock<RegistryInner>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the model set of one connection.
    ///
    /// An empty provider or connection id is ignored. Descriptors with an empty
    /// id are skipped; on duplicate ids within one call the last one wins.
    pub fn upsert(&self, provider: &str, connection_id: &str, models: &[ModelDescriptor]) {
        if provider.is_empty() || connection_id.is_empty() {
            return;
        }

        let set: ModelSet = models
            .iter()
            .filter(|m| !m.id.is_empty())
            .map(|m| (m.key(), m.clone()))
            .collect();

        let mut inner = self.inner.write();
        inner
            .connections
            .entry(provider.to_string())
            .or_default()
            .insert(connection_id.to_string(), set);
        inner.rebuild(provider);
    }

    /// Drop one connection's models. The provider disappears with its last connection.
    pub fn remove(&self, provider: &str, connection_id: &str) {
        if provider.is_empty() || connection_id.is_empty() {
            return;
        }

        let mut inner = self.inner.write();
        let Some(conns) = inner.connections.get_mut(provider) else {
            return;
        };
        if conns.remove(connection_id).is_none() {
            return;
        }
        if conns.is_empty() {
            inner.connections.remove(provider);
        }
        inner.rebuild(provider);
    }

    /// Look up one model of a provider, case-insensitively.
    pub fn get_by_provider_and_id(&self, provider: &str, model_id: &str) -> Option<ModelDescriptor> {
        let inner = self.inner.read();
        inner
            .merged
            .get(provider)
            .and_then(|view| view.get(&model_id.to_lowercase()))
            .cloned()
    }

    /// The merged models of one provider, sorted by case-folded id.
    pub fn snapshot_by_provider(&self, provider: &str) -> Vec<ModelDescriptor> {
        let inner = self.inner.read();
        inner
            .merged
            .get(provider)
            .map(sorted_copy)
            .unwrap_or_default()
    }

    /// Every provider's merged models.
    pub fn snapshot(&self) -> HashMap<String, Vec<ModelDescriptor>> {
        let inner = self.inner.read();
        inner
            .merged
            .iter()
            .map(|(provider, view)| (provider.clone(), sorted_copy(view)))
            .collect()
    }
}

fn sorted_copy(view: &ModelSet) -> Vec<ModelDescriptor> {
    let mut entries: Vec<_> = view.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries.into_iter().map(|(_, d)| d.clone()).collect()
}
