use crate::api::v1::CookieOptions;
use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;

/// Everything the routes need, wired once at startup.
pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pub cookie_options: Arc<CookieOptions>,
    pub upload_limit_bytes: u64,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let mut pool = None;
        let user_repo: Arc<dyn UserRepo> = match settings.user.backend.as_str() {
            "memory" => Arc::new(MemoryUserRepo::new()),
            "mysql" => {
                let dsn = settings
                    .user
                    .dsn
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("user.dsn is required for the mysql backend"))?;
                let mysql = Pool::<MySql>::connect(dsn).await?;
                pool = Some(mysql.clone());
                Arc::new(MySqlUserRepo::new(mysql))
            }
            other => return Err(anyhow::anyhow!("Unknown user backend: {}", other)),
        };

        let media_host: Arc<dyn MediaHost> = match settings.media.backend.as_str() {
            "fake" => Arc::new(FakeMediaHost::new()),
            "local" => Arc::new(LocalMediaHost::new(
                settings.media.root.clone(),
                settings.media.public_base_url.clone(),
            )),
            other => return Err(anyhow::anyhow!("Unknown media backend: {}", other)),
        };

        let token_config = settings.auth.token_config()?;
        let cookie_options = CookieOptions::from_settings(&settings.cookie)?;

        let mut server = Self::from_parts(
            user_repo,
            media_host,
            token_config,
            cookie_options,
            settings.http.upload_limit_bytes,
        );
        server.pool = pool;

        info!(
            user_backend = %settings.user.backend,
            media_backend = %settings.media.backend,
            "server started"
        );
        Ok(server)
    }

    /// Wires the services over an already built store and media host.
    pub fn from_parts(
        user_repo: Arc<dyn UserRepo>,
        media_host: Arc<dyn MediaHost>,
        token_config: TokenConfig,
        cookie_options: CookieOptions,
        upload_limit_bytes: u64,
    ) -> Self {
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);
        let token_service: Arc<dyn TokenService> =
            Arc::new(JwtTokenService::new(token_config, user_repo.clone()));

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo.clone(),
            credential_hasher,
            token_service,
            media_host.clone(),
        ));
        let user_service: Arc<dyn UserService> =
            Arc::new(RealUserService::new(user_repo, media_host));

        Self {
            auth_service,
            user_service,
            cookie_options: Arc::new(cookie_options),
            upload_limit_bytes,
            pool: None,
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
