use crate::application_port::AuthError;
use crate::domain_model::{PublicUser, UploadedFile, UserId};

#[derive(Debug, Clone)]
pub struct UpdateAccountInput {
    pub full_name: String,
    pub email: String,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn update_account(
        &self,
        user_id: UserId,
        request: UpdateAccountInput,
    ) -> Result<PublicUser, AuthError>;
    async fn update_avatar(
        &self,
        user_id: UserId,
        file: UploadedFile,
    ) -> Result<PublicUser, AuthError>;
    async fn update_cover_image(
        &self,
        user_id: UserId,
        file: UploadedFile,
    ) -> Result<PublicUser, AuthError>;
}
