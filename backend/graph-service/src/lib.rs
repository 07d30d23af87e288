pub mod config;
pub mod domain;
pub mod grpc;
pub mod migration;
pub mod repository;

pub use domain::edge::{Edge, EdgeType, GraphStats};
pub use repository::{DualWriteRepository, GraphRepository, PostgresGraphRepository};
