use std::sync::Arc;

use crate::adapter::MemoryRepository;
use crate::config::Environment;
use crate::logger::Logger;
use crate::port::ExampleRepository;

/// Shared per-request dependencies, cloned into every handler and
/// middleware invocation.
#[derive(Clone)]
pub struct AppState {
    pub logger: Logger,
    pub repository: Arc<dyn ExampleRepository>,
    pub environment: Environment,
}

impl AppState {
    /// Builds the default state: in-memory repository seeded with
    /// starter rows.
    pub fn new(logger: Logger, environment: Environment) -> Self {
        let repository = MemoryRepository::new();
        repository.preload(&["Example 1", "Example 2"]);
        Self {
            logger,
            repository: Arc::new(repository),
            environment,
        }
    }
}
