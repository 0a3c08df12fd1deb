use crate::application_port::*;
use crate::domain_model::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Skip `Identity::validate` before writing.
    pub skip_validation: bool,
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `UserExists` if the username or email is taken.
    async fn insert(&self, identity: &Identity) -> Result<(), AuthError>;

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<Identity>, AuthError>;

    /// Matches either field; `None` on both sides finds nothing.
    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<Identity>, AuthError>;

    /// Overwrites the stored record with `identity`, except `refresh_token`:
    /// that column only changes through the two token methods below.
    async fn save(&self, identity: &Identity, options: SaveOptions) -> Result<(), AuthError>;

    /// Unconditionally replaces the stored refresh token. Fails with
    /// `IdentityNotFound` if the record is gone.
    async fn set_refresh_token(&self, user_id: UserId, token: Option<&str>)
    -> Result<(), AuthError>;

    /// Sets `refresh_token` to `new` only if it currently equals `expected`.
    /// Returns whether the write landed.
    async fn compare_and_set_refresh_token(
        &self,
        user_id: UserId,
        expected: &str,
        new: Option<&str>,
    ) -> Result<bool, AuthError>;
}
