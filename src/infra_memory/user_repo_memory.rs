use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use std::sync::Mutex;

/// Process-local identity store for development and tests.
pub struct MemoryUserRepo {
    users: DashMap<UserId, Identity>,
    // Serialises the uniqueness check with the write it guards.
    write_lock: Mutex<()>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        MemoryUserRepo {
            users: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn clashes(&self, identity: &Identity) -> bool {
        self.users.iter().any(|entry| {
            let other = entry.value();
            other.user_id != identity.user_id
                && (other.username == identity.username || other.email == identity.email)
        })
    }
}

impl Default for MemoryUserRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn insert(&self, identity: &Identity) -> Result<(), AuthError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| AuthError::Persistence(e.to_string()))?;

        if self.users.contains_key(&identity.user_id) || self.clashes(identity) {
            return Err(AuthError::UserExists);
        }
        self.users.insert(identity.user_id, identity.clone());
        Ok(())
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<Identity>, AuthError> {
        Ok(self.users.get(&user_id).map(|entry| entry.value().clone()))
    }

    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<Identity>, AuthError> {
        if username.is_none() && email.is_none() {
            return Ok(None);
        }
        let found = self.users.iter().find(|entry| {
            let user = entry.value();
            username.is_some_and(|u| user.username == u) || email.is_some_and(|e| user.email == e)
        });
        Ok(found.map(|entry| entry.value().clone()))
    }

    async fn save(&self, identity: &Identity, options: SaveOptions) -> Result<(), AuthError> {
        if !options.skip_validation {
            identity.validate().map_err(AuthError::Validation)?;
        }

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| AuthError::Persistence(e.to_string()))?;

        if self.clashes(identity) {
            return Err(AuthError::UserExists);
        }
        match self.users.get_mut(&identity.user_id) {
            Some(mut entry) => {
                let refresh_token = entry.refresh_token.take();
                *entry = identity.clone();
                entry.refresh_token = refresh_token;
                Ok(())
            }
            None => Err(AuthError::Persistence(format!(
                "identity {} does not exist",
                identity.user_id
            ))),
        }
    }

    async fn set_refresh_token(
        &self,
        user_id: UserId,
        token: Option<&str>,
    ) -> Result<(), AuthError> {
        let mut entry = self
            .users
            .get_mut(&user_id)
            .ok_or(AuthError::IdentityNotFound)?;
        entry.refresh_token = token.map(str::to_string);
        entry.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn compare_and_set_refresh_token(
        &self,
        user_id: UserId,
        expected: &str,
        new: Option<&str>,
    ) -> Result<bool, AuthError> {
        // The shard write lock held by `get_mut` makes compare and set one step.
        let Some(mut entry) = self.users.get_mut(&user_id) else {
            return Ok(false);
        };
        if entry.refresh_token.as_deref() != Some(expected) {
            return Ok(false);
        }
        entry.refresh_token = new.map(str::to_string);
        entry.updated_at = chrono::Utc::now();
        Ok(true)
    }
}
