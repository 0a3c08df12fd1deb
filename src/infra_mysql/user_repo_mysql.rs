use super::util::is_dup_key;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

/// Identity store backed by a single `user` table:
///
/// ```sql
/// CREATE TABLE user (
///     user_id       BINARY(16)    NOT NULL PRIMARY KEY,
///     username      VARCHAR(64)   NOT NULL UNIQUE,
///     email         VARCHAR(255)  NOT NULL UNIQUE,
///     full_name     VARCHAR(255)  NOT NULL,
///     avatar        VARCHAR(1024) NOT NULL,
///     cover_image   VARCHAR(1024) NULL,
///     password_hash VARCHAR(255)  NOT NULL,
///     refresh_token TEXT          NULL,
///     created_at    TIMESTAMP(6)  NOT NULL,
///     updated_at    TIMESTAMP(6)  NOT NULL
/// );
/// ```
pub struct MySqlUserRepo {
    pool: MySqlPool,
}

const SELECT_COLUMNS: &str = r#"
SELECT user_id, username, email, full_name, avatar, cover_image,
       password_hash, refresh_token, created_at, updated_at
FROM user
"#;

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    #[inline]
    fn uid_as_bytes(id: &UserId) -> &[u8] {
        id.0.as_bytes()
    }

    #[inline]
    fn uid_from_bytes(id: &[u8]) -> Result<UserId, AuthError> {
        Ok(UserId(
            Uuid::from_slice(id).map_err(|e| AuthError::Persistence(e.to_string()))?,
        ))
    }

    fn store_err(e: sqlx::Error) -> AuthError {
        if is_dup_key(&e) {
            AuthError::UserExists
        } else {
            AuthError::Persistence(e.to_string())
        }
    }

    fn row_to_identity(row: MySqlRow) -> Result<Identity, AuthError> {
        let get_err = |e: sqlx::Error| AuthError::Persistence(e.to_string());

        let user_id_bytes: Vec<u8> = row.try_get("user_id").map_err(get_err)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(get_err)?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(get_err)?;

        Ok(Identity {
            user_id: Self::uid_from_bytes(&user_id_bytes)?,
            username: row.try_get("username").map_err(get_err)?,
            email: row.try_get("email").map_err(get_err)?,
            full_name: row.try_get("full_name").map_err(get_err)?,
            avatar: row.try_get("avatar").map_err(get_err)?,
            cover_image: row.try_get("cover_image").map_err(get_err)?,
            password_hash: row.try_get("password_hash").map_err(get_err)?,
            refresh_token: row.try_get("refresh_token").map_err(get_err)?,
            created_at,
            updated_at,
        })
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn insert(&self, identity: &Identity) -> Result<(), AuthError> {
        sqlx::query(
            r#"
INSERT INTO user (user_id, username, email, full_name, avatar, cover_image,
                  password_hash, refresh_token, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(Self::uid_as_bytes(&identity.user_id))
        .bind(&identity.username)
        .bind(&identity.email)
        .bind(&identity.full_name)
        .bind(&identity.avatar)
        .bind(&identity.cover_image)
        .bind(&identity.password_hash)
        .bind(identity.created_at)
        .bind(identity.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::store_err)?;

        Ok(())
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<Identity>, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(&format!("{SELECT_COLUMNS} WHERE user_id = ?"))
            .bind(Self::uid_as_bytes(&user_id))
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::store_err)?;

        row_opt.map(Self::row_to_identity).transpose()
    }

    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<Identity>, AuthError> {
        if username.is_none() && email.is_none() {
            return Ok(None);
        }

        // A NULL bind never matches, so an absent field drops out of the OR.
        let row_opt: Option<MySqlRow> = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE username = ? OR email = ? LIMIT 1"
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::store_err)?;

        row_opt.map(Self::row_to_identity).transpose()
    }

    async fn save(&self, identity: &Identity, options: SaveOptions) -> Result<(), AuthError> {
        if !options.skip_validation {
            identity.validate().map_err(AuthError::Validation)?;
        }

        let result = sqlx::query(
            r#"
UPDATE user
SET username = ?, email = ?, full_name = ?, avatar = ?, cover_image = ?,
    password_hash = ?, updated_at = ?
WHERE user_id = ?
"#,
        )
        .bind(&identity.username)
        .bind(&identity.email)
        .bind(&identity.full_name)
        .bind(&identity.avatar)
        .bind(&identity.cover_image)
        .bind(&identity.password_hash)
        .bind(&identity.refresh_token)
        .bind(Utc::now())
        .bind(Self::uid_as_bytes(&identity.user_id))
        .execute(&self.pool)
        .await
        .map_err(Self::store_err)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::Persistence(format!(
                "identity {} does not exist",
                identity.user_id
            )));
        }
        Ok(())
    }

    async fn set_refresh_token(
        &self,
        user_id: UserId,
        token: Option<&str>,
    ) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
UPDATE user
SET refresh_token = ?, updated_at = ?
WHERE user_id = ?
"#,
        )
        .bind(token)
        .bind(Utc::now())
        .bind(Self::uid_as_bytes(&user_id))
        .execute(&self.pool)
        .await
        .map_err(Self::store_err)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::IdentityNotFound);
        }
        Ok(())
    }

    async fn compare_and_set_refresh_token(
        &self,
        user_id: UserId,
        expected: &str,
        new: Option<&str>,
    ) -> Result<bool, AuthError> {
        let result = sqlx::query(
            r#"
UPDATE user
SET refresh_token = ?, updated_at = ?
WHERE user_id = ? AND refresh_token = ?
"#,
        )
        .bind(new)
        .bind(Utc::now())
        .bind(Self::uid_as_bytes(&user_id))
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(Self::store_err)?;

        Ok(result.rows_affected() == 1)
    }
}
