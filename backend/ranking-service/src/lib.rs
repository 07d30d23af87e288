pub mod config;
pub mod grpc;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use grpc::ranking_proto;
pub use services::{DiversityLayer, FeatureClient, RankingLayer, RecallLayer};
