/// Video Upload & Management Service
///
/// Handles video uploads, processing, and storage integration
use crate::error::{AppError, Result};
use chrono::Utc;
use uuid::Uuid;

use tracing::{debug, error, info, warn};

/// Video service for uploads and processing
pub struct VideoService;

impl VideoService {
    /// Create new video service instance
    pub fn new() -> Self {
        Self
    }

    /// Generate presigned URL for video upload
    ///
    /// Returns URL that client can use to upload directly to S3
    pub async fn generate_upload_url(&self, _user_id: Uuid) -> Result<PresignedUploadResponse> {
        Err(AppError::Internal(
            "Video upload not yet implemented".to_string(),
        ))
    }

    /// Validate uploaded video metadata
    pub async fn validate_video_metadata(
        &self,
        _title: &str,
        _description: Option<&str>,
        _duration_seconds: u32,
    ) -> Result<()> {
        Err(AppError::Internal(
            "Video validation not yet implemented".to_string(),
        ))
    }

    /// Start video processing job
    pub async fn start_processing(
        &self,
        _video_id: &Uuid,
        _title: &str,
        _upload_url: &str,
    ) -> Result<()> {
        Err(AppError::Internal(
            "Video processing not yet implemented".to_string(),
        ))
    }
}

/// Presigned upload response
#[derive(Debug, Clone)]
pub struct PresignedUploadResponse {
    pub video_id: String,
    pub upload_url: String,
    pub expiry_seconds: u32,
}
