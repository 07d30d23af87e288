mod cached_repository;
mod dual_write_repository;
mod graph_repository;
mod postgres_repository;
mod r#trait;

pub use cached_repository::CachedGraphRepository;
pub use dual_write_repository::DualWriteRepository;
pub use graph_repository::GraphRepository;
pub use postgres_repository::PostgresGraphRepository;
pub use r#trait::GraphRepositoryTrait;
