pub mod appeal;
pub mod enforcement;
pub mod moderation;

pub use appeal::*;
pub use enforcement::*;
pub use moderation::*;
