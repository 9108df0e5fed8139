use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::domain::Example;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("duplicate entry: {0}")]
    Duplicate(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Outbound port for example persistence. The in-memory adapter backs
/// it by default; a database adapter can replace it without touching
/// the handlers.
pub trait ExampleRepository: Send + Sync {
    fn find_by_id(
        &self,
        id: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Example>, RepositoryError>> + Send + '_>>;

    fn save(
        &self,
        description: String,
    ) -> Pin<Box<dyn Future<Output = Result<Example, RepositoryError>> + Send + '_>>;
}
