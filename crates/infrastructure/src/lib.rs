pub mod failure_sink;
pub mod in_memory_repository;

pub use failure_sink::TracingFailureSink;
pub use in_memory_repository::InMemoryJobRepository;
