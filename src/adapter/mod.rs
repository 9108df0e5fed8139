pub mod memory_repo;
pub mod remote;
pub mod rolling_file;
pub mod stdout;

pub use memory_repo::MemoryRepository;
pub use remote::RemoteSink;
pub use rolling_file::RollingFileSink;
pub use stdout::StdoutSink;
