/// Upload repository - database operations for uploads
use crate::error::Result;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn get_upload(_pool: &PgPool, _upload_id: Uuid) -> Result<Option<()>> {
    // TODO: Implement from user-service
    Ok(None)
}
