pub mod likes;
pub mod comments;
pub mod shares;

pub use likes::LikeRepository;
pub use comments::CommentRepository;
pub use shares::ShareRepository;
