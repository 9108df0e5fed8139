use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use parking_lot::RwLock;
use tracing::warn;

use crate::domain::Example;
use crate::port::{ExampleRepository, RepositoryError};

/// In-memory example store. Stands in for a real database so the
/// scaffold runs without external services.
pub struct MemoryRepository {
    inner: RwLock<Store>,
}

struct Store {
    examples: HashMap<u32, Example>,
    next_id: u32,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Store {
                examples: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Seeds the store with starter rows. Failures are logged and
    /// skipped so one bad seed does not abort startup.
    pub fn preload(&self, descriptions: &[&str]) {
        for description in descriptions {
            if let Err(e) = self.insert(description.to_string()) {
                warn!(description, error = %e, "failed to preload example");
            }
        }
    }

    fn insert(&self, description: String) -> Result<Example, RepositoryError> {
        let mut store = self.inner.write();
        if store
            .examples
            .values()
            .any(|example| example.description == description)
        {
            return Err(RepositoryError::Duplicate(description));
        }
        let id = store.next_id;
        store.next_id += 1;
        let example = Example::new(id, description);
        store.examples.insert(id, example.clone());
        Ok(example)
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ExampleRepository for MemoryRepository {
    fn find_by_id(
        &self,
        id: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Example>, RepositoryError>> + Send + '_>> {
        Box::pin(async move { Ok(self.inner.read().examples.get(&id).cloned()) })
    }

    fn save(
        &self,
        description: String,
    ) -> Pin<Box<dyn Future<Output = Result<Example, RepositoryError>> + Send + '_>> {
        Box::pin(async move { self.insert(description) })
    }
}
