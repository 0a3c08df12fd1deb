use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UserId(pub uuid::Uuid);

impl UserId {
    pub fn new_v4() -> Self {
        UserId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(UserId)
    }
}

/// The stored representation of a user.
///
/// `refresh_token` mirrors the last refresh token issued for this identity;
/// at most one is live at a time and a new one overwrites the old.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Field checks run by the store on a validating save.
    pub fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("username is required".to_string());
        }
        if self.username != self.username.to_lowercase() {
            return Err("username must be lowercase".to_string());
        }
        if !is_plausible_email(&self.email) {
            return Err("email is invalid".to_string());
        }
        if self.full_name.trim().is_empty() {
            return Err("full name is required".to_string());
        }
        if self.avatar.trim().is_empty() {
            return Err("avatar is required".to_string());
        }
        if self.password_hash.is_empty() {
            return Err("password is required".to_string());
        }
        Ok(())
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser::from(self)
    }
}

pub fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        }
        None => false,
    }
}

/// What handlers and clients get to see of an [`Identity`]: no password hash,
/// no refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Identity> for PublicUser {
    fn from(identity: &Identity) -> Self {
        PublicUser {
            id: identity.user_id,
            username: identity.username.clone(),
            email: identity.email.clone(),
            full_name: identity.full_name.clone(),
            avatar: identity.avatar.clone(),
            cover_image: identity.cover_image.clone(),
            created_at: identity.created_at,
            updated_at: identity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        let now = Utc::now();
        Identity {
            user_id: UserId::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice Liddell".to_string(),
            avatar: "fake://media/alice.png".to_string(),
            cover_image: None,
            password_hash: "$argon2id$v=19$stub".to_string(),
            refresh_token: Some("refresh".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn public_user_hides_secrets() {
        let json = serde_json::to_value(identity().to_public()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj["username"], "alice");
        assert_eq!(obj["fullName"], "Alice Liddell");
        assert!(!obj.contains_key("password"));
        assert!(!obj.contains_key("passwordHash"));
        assert!(!obj.contains_key("refreshToken"));
    }

    #[test]
    fn validate_rejects_bad_fields() {
        assert!(identity().validate().is_ok());

        let mut bad = identity();
        bad.username = "Alice".to_string();
        assert!(bad.validate().is_err());

        let mut bad = identity();
        bad.email = "not-an-email".to_string();
        assert!(bad.validate().is_err());

        let mut bad = identity();
        bad.avatar = String::new();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn user_id_round_trips_through_string() {
        let id = UserId::new_v4();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
