//! Background jobs for messaging-service
//!
//! Contains long-running background tasks that maintain data integrity
//! and perform periodic cleanup operations.

pub mod orphan_cleaner;

pub use orphan_cleaner::start_orphan_cleaner;
