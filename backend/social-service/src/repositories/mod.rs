// Repository layer for data access
// Re-export from crate::repository for backward compatibility

#[allow(unused_imports)]
pub use crate::repository::{
    comments::CommentRepository, likes::LikeRepository, shares::ShareRepository,
};
