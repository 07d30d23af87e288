pub mod diversity;
pub mod ranking;
pub mod recall;

pub use diversity::DiversityLayer;
pub use ranking::RankingLayer;
pub use recall::RecallLayer;
