pub mod repository;
pub mod sink;

pub use repository::{ExampleRepository, RepositoryError};
pub use sink::{AccessFilter, LogSink, SinkError, SinkFilter};
