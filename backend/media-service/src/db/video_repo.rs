/// Video repository - database operations for videos
use crate::error::Result;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn get_video(_pool: &PgPool, _video_id: Uuid) -> Result<Option<()>> {
    // TODO: Implement from user-service
    Ok(None)
}
