// Re-export route modules
pub mod attachments;
pub mod calls;
pub mod conversations;
pub mod groups;
pub mod key_exchange;
pub mod locations;
pub mod messages;
pub mod reactions;
pub mod rtc;
pub mod wsroute;
