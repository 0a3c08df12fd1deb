use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::Utc;
use std::sync::Arc;

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_service: Arc<dyn TokenService>,
    media_host: Arc<dyn MediaHost>,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_service: Arc<dyn TokenService>,
        media_host: Arc<dyn MediaHost>,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            token_service,
            media_host,
        }
    }

    fn validate_register(request: &RegisterInput) -> Result<(), AuthError> {
        let fields = [
            &request.full_name,
            &request.email,
            &request.username,
            &request.password,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(AuthError::Validation("All fields are required".to_string()));
        }
        if !is_plausible_email(request.email.trim()) {
            return Err(AuthError::Validation("Email is invalid".to_string()));
        }
        Ok(())
    }

    #[inline]
    fn non_blank(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    async fn load(&self, user_id: UserId) -> Result<Identity, AuthError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::IdentityNotFound)
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, request: RegisterInput) -> Result<PublicUser, AuthError> {
        Self::validate_register(&request)?;
        let RegisterInput {
            full_name,
            email,
            username,
            password,
            mut uploads,
        } = request;

        let username = username.trim().to_lowercase();
        let email = email.trim().to_string();

        if self
            .user_repo
            .find_by_username_or_email(Some(&username), Some(&email))
            .await?
            .is_some()
        {
            return Err(AuthError::UserExists);
        }

        let avatar = uploads
            .take(UploadField::Avatar)
            .ok_or_else(|| AuthError::Validation("Avatar file is required".to_string()))?;
        let avatar_url = self.media_host.upload(avatar).await?;
        let cover_image_url = match uploads.take(UploadField::CoverImage) {
            Some(file) => Some(self.media_host.upload(file).await?),
            None => None,
        };

        let password_hash = self.credential_hasher.hash_password(&password).await?;

        let now = Utc::now();
        let identity = Identity {
            user_id: UserId::new_v4(),
            username,
            email,
            full_name: full_name.trim().to_string(),
            avatar: avatar_url.0,
            cover_image: cover_image_url.map(|url| url.0),
            password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        identity.validate().map_err(AuthError::Validation)?;
        self.user_repo.insert(&identity).await?;

        info!(user_id = %identity.user_id, username = %identity.username, "registered user");
        Ok(identity.to_public())
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let username = Self::non_blank(request.username).map(|u| u.to_lowercase());
        let email = Self::non_blank(request.email);
        if username.is_none() && email.is_none() {
            return Err(AuthError::Validation(
                "username or email is required".to_string(),
            ));
        }

        let mut identity = self
            .user_repo
            .find_by_username_or_email(username.as_deref(), email.as_deref())
            .await?
            .ok_or(AuthError::IdentityNotFound)?;

        let ok = self
            .credential_hasher
            .verify_password(&request.password, &identity.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.token_service.issue_pair(&mut identity).await?;

        info!(user_id = %identity.user_id, "user logged in");
        Ok(LoginResult {
            user: identity.to_public(),
            tokens,
        })
    }

    async fn logout(&self, user_id: UserId) -> Result<(), AuthError> {
        self.token_service.revoke(user_id).await?;
        info!(%user_id, "user logged out");
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(AuthError::Unauthorized("Unauthorized request".to_string()));
        }

        let (identity, tokens) = self.token_service.rotate(refresh_token).await?;
        debug!(user_id = %identity.user_id, "access token refreshed");
        Ok(tokens)
    }

    async fn authenticate(&self, access_token: &str) -> Result<PublicUser, AuthError> {
        let user_id = self.token_service.verify_access(access_token)?;
        let identity = self.load(user_id).await?;
        Ok(identity.to_public())
    }

    async fn change_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let mut identity = self.load(user_id).await?;

        let ok = self
            .credential_hasher
            .verify_password(old_password, &identity.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::Validation("Invalid old password".to_string()));
        }
        if new_password.trim().is_empty() {
            return Err(AuthError::Validation("New password is required".to_string()));
        }

        identity.password_hash = self.credential_hasher.hash_password(new_password).await?;
        identity.updated_at = Utc::now();
        self.user_repo.save(&identity, SaveOptions::default()).await?;

        info!(%user_id, "password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{Argon2PasswordHasher, FakeMediaHost, JwtTokenService};
    use crate::infra_memory::MemoryUserRepo;
    use std::time::Duration;

    struct Fixture {
        service: RealAuthService,
        repo: Arc<MemoryUserRepo>,
        media: Arc<FakeMediaHost>,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(MemoryUserRepo::new());
        let media = Arc::new(FakeMediaHost::new());
        let tokens = Arc::new(JwtTokenService::new(
            TokenConfig {
                issuer: "vidtube.test".to_string(),
                access_secret: b"access".to_vec(),
                access_ttl: Duration::from_secs(60),
                refresh_secret: b"refresh".to_vec(),
                refresh_ttl: Duration::from_secs(3600),
                leeway: Duration::ZERO,
            },
            repo.clone(),
        ));
        let service = RealAuthService::new(
            repo.clone(),
            Arc::new(Argon2PasswordHasher),
            tokens,
            media.clone(),
        );
        Fixture {
            service,
            repo,
            media,
        }
    }

    fn avatar() -> UploadedFile {
        UploadedFile {
            field: UploadField::Avatar,
            file_name: Some("alice.png".to_string()),
            content_type: Some("image/png".to_string()),
            bytes: b"png".to_vec(),
        }
    }

    fn register_input(username: &str) -> RegisterInput {
        RegisterInput {
            full_name: "Alice Liddell".to_string(),
            email: format!("{}@example.com", username.to_lowercase()),
            username: username.to_string(),
            password: "p@ss".to_string(),
            uploads: ParsedUpload {
                avatar: Some(avatar()),
                cover_image: None,
            },
        }
    }

    #[tokio::test]
    async fn register_lowercases_username_and_uploads_avatar() {
        let f = fixture();
        let user = f.service.register(register_input("Alice")).await.unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.avatar, "fake://media/avatar/alice.png");
        assert_eq!(user.cover_image, None);
        assert_eq!(f.media.upload_count(), 1);
        assert_eq!(f.repo.len(), 1);
    }

    #[tokio::test]
    async fn register_requires_fields_and_avatar() {
        let f = fixture();

        let mut blank = register_input("alice");
        blank.full_name = "   ".to_string();
        assert!(matches!(
            f.service.register(blank).await,
            Err(AuthError::Validation(_))
        ));

        let mut no_avatar = register_input("alice");
        no_avatar.uploads = ParsedUpload::default();
        assert!(matches!(
            f.service.register(no_avatar).await,
            Err(AuthError::Validation(_))
        ));
        assert_eq!(f.media.upload_count(), 0);
        assert!(f.repo.is_empty());
    }

    #[tokio::test]
    async fn register_rejects_taken_username() {
        let f = fixture();
        f.service.register(register_input("alice")).await.unwrap();

        let mut again = register_input("ALICE");
        again.email = "other@example.com".to_string();
        assert!(matches!(
            f.service.register(again).await,
            Err(AuthError::UserExists)
        ));
    }

    #[tokio::test]
    async fn login_by_username_or_email() {
        let f = fixture();
        f.service.register(register_input("alice")).await.unwrap();

        let by_name = f
            .service
            .login(LoginInput {
                username: Some("Alice".to_string()),
                email: None,
                password: "p@ss".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(by_name.user.username, "alice");

        let by_email = f
            .service
            .login(LoginInput {
                username: None,
                email: Some("alice@example.com".to_string()),
                password: "p@ss".to_string(),
            })
            .await
            .unwrap();
        let user = f
            .service
            .authenticate(&by_email.tokens.access_token.0)
            .await
            .unwrap();
        assert_eq!(user.id, by_email.user.id);
    }

    #[tokio::test]
    async fn login_failures() {
        let f = fixture();
        f.service.register(register_input("alice")).await.unwrap();

        assert!(matches!(
            f.service
                .login(LoginInput {
                    username: Some(" ".to_string()),
                    email: None,
                    password: "p@ss".to_string(),
                })
                .await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            f.service
                .login(LoginInput {
                    username: Some("bob".to_string()),
                    email: None,
                    password: "p@ss".to_string(),
                })
                .await,
            Err(AuthError::IdentityNotFound)
        ));
        assert!(matches!(
            f.service
                .login(LoginInput {
                    username: Some("alice".to_string()),
                    email: None,
                    password: "nope".to_string(),
                })
                .await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn logout_kills_refresh_token() {
        let f = fixture();
        f.service.register(register_input("alice")).await.unwrap();
        let login = f
            .service
            .login(LoginInput {
                username: Some("alice".to_string()),
                email: None,
                password: "p@ss".to_string(),
            })
            .await
            .unwrap();

        f.service.logout(login.user.id).await.unwrap();
        assert!(matches!(
            f.service.refresh(&login.tokens.refresh_token.0).await,
            Err(AuthError::TokenMismatch)
        ));
    }

    #[tokio::test]
    async fn refresh_with_blank_token_is_unauthorized() {
        let f = fixture();
        assert!(matches!(
            f.service.refresh("  ").await,
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn authenticate_fails_once_identity_is_gone() {
        let f = fixture();
        f.service.register(register_input("alice")).await.unwrap();
        let login = f
            .service
            .login(LoginInput {
                username: Some("alice".to_string()),
                email: None,
                password: "p@ss".to_string(),
            })
            .await
            .unwrap();

        let other = fixture();
        assert!(matches!(
            other.service.authenticate(&login.tokens.access_token.0).await,
            Err(AuthError::IdentityNotFound)
        ));
    }

    #[tokio::test]
    async fn change_password_checks_old_password() {
        let f = fixture();
        let user = f.service.register(register_input("alice")).await.unwrap();

        assert!(matches!(
            f.service.change_password(user.id, "wrong", "n3w").await,
            Err(AuthError::Validation(_))
        ));
        f.service.change_password(user.id, "p@ss", "n3w").await.unwrap();

        let login = f
            .service
            .login(LoginInput {
                username: Some("alice".to_string()),
                email: None,
                password: "n3w".to_string(),
            })
            .await;
        assert!(login.is_ok());
    }
}
