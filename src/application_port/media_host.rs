use crate::application_port::AuthError;
use crate::domain_model::{MediaUrl, UploadedFile};

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MediaError> for AuthError {
    fn from(error: MediaError) -> Self {
        AuthError::Media(error.to_string())
    }
}

/// Where uploaded images end up. Only the returned URL is kept on the identity.
#[async_trait::async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, file: UploadedFile) -> Result<MediaUrl, MediaError>;
}
