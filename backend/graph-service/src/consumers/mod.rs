pub mod identity_events;
pub mod social_events;

pub use identity_events::IdentityEventsConsumer;
pub use social_events::SocialEventsConsumer;
