//! Singleton registry: one instance per declared application.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::app::{MockApp, SharedState};
use crate::error::HansError;

struct Entry {
    type_name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
}

/// Owns the name → instance mapping for the orchestrator's lifetime.
#[derive(Default)]
pub struct AppRegistry {
    instances: Mutex<HashMap<String, Entry>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the instance registered under `name`, constructing it with
    /// `state` on first use.
    pub fn get_or_create<A: MockApp>(&self, name: &str, state: &SharedState) -> Result<Arc<A>, HansError> {
        let mut instances = self
            .instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(entry) = instances.get(name) {
            return entry
                .instance
                .clone()
                .downcast::<A>()
                .map_err(|_| HansError::DuplicateApplication {
                    name: name.to_string(),
                    first: entry.type_name,
                    second: std::any::type_name::<A>(),
                });
        }

        let instance = Arc::new(A::create(state.clone()));
        tracing::debug!(app = %name, "application instance created");
        instances.insert(
            name.to_string(),
            Entry {
                type_name: std::any::type_name::<A>(),
                instance: instance.clone(),
            },
        );
        Ok(instance)
    }

    pub fn len(&self) -> usize {
        self.instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
