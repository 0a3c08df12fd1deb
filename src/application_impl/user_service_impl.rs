use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{SaveOptions, UserRepo};
use crate::logger::*;
use chrono::Utc;
use std::sync::Arc;

pub struct RealUserService {
    user_repo: Arc<dyn UserRepo>,
    media_host: Arc<dyn MediaHost>,
}

impl RealUserService {
    pub fn new(user_repo: Arc<dyn UserRepo>, media_host: Arc<dyn MediaHost>) -> RealUserService {
        RealUserService {
            user_repo,
            media_host,
        }
    }

    async fn load(&self, user_id: UserId) -> Result<Identity, AuthError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::IdentityNotFound)
    }

    async fn store(&self, mut identity: Identity) -> Result<PublicUser, AuthError> {
        identity.updated_at = Utc::now();
        self.user_repo.save(&identity, SaveOptions::default()).await?;
        Ok(identity.to_public())
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn update_account(
        &self,
        user_id: UserId,
        request: UpdateAccountInput,
    ) -> Result<PublicUser, AuthError> {
        let full_name = request.full_name.trim();
        let email = request.email.trim();
        if full_name.is_empty() || email.is_empty() {
            return Err(AuthError::Validation("All fields are required".to_string()));
        }
        if !is_plausible_email(email) {
            return Err(AuthError::Validation("Email is invalid".to_string()));
        }

        if let Some(other) = self
            .user_repo
            .find_by_username_or_email(None, Some(email))
            .await?
        {
            if other.user_id != user_id {
                return Err(AuthError::UserExists);
            }
        }

        let mut identity = self.load(user_id).await?;
        identity.full_name = full_name.to_string();
        identity.email = email.to_string();
        let user = self.store(identity).await?;

        info!(%user_id, "account details updated");
        Ok(user)
    }

    async fn update_avatar(
        &self,
        user_id: UserId,
        file: UploadedFile,
    ) -> Result<PublicUser, AuthError> {
        let mut identity = self.load(user_id).await?;
        identity.avatar = self.media_host.upload(file).await?.0;
        self.store(identity).await
    }

    async fn update_cover_image(
        &self,
        user_id: UserId,
        file: UploadedFile,
    ) -> Result<PublicUser, AuthError> {
        let mut identity = self.load(user_id).await?;
        identity.cover_image = Some(self.media_host.upload(file).await?.0);
        self.store(identity).await
    }
}
