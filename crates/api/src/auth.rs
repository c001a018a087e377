//! User accounts with salted argon2 password hashing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use common::UserId;

/// Errors that can occur in registration and login.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The email is already registered.
    #[error("Email {0} is already registered")]
    EmailTaken(String),

    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// User role. `Admin` gates item management in the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Customer,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// A registered user. The password is held only as a salted argon2 hash in
/// PHC string format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

/// Persistence seam for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user record.
    async fn insert(&self, user: User) -> Result<()>;

    /// Finds a user by email, case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Retrieves a user by id.
    async fn get(&self, id: UserId) -> Result<Option<User>>;
}

/// In-memory user store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> Result<()> {
        self.users.write().unwrap().insert(user.id, user);
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().unwrap();
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.read().unwrap().get(&id).cloned())
    }
}

/// Registration and login over a user store.
pub struct AuthService<U: UserStore> {
    store: U,
}

impl<U: UserStore> AuthService<U> {
    pub fn new(store: U) -> Self {
        Self { store }
    }

    /// Registers a new user, hashing the password with a fresh salt.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User> {
        if self.store.find_by_email(email).await?.is_some() {
            return Err(AuthError::EmailTaken(email.to_string()));
        }

        let user = User {
            id: UserId::new(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            password_hash: hash_password(password)?,
        };
        self.store.insert(user.clone()).await?;
        metrics::counter!("auth_registrations").increment(1);
        Ok(user)
    }

    /// Verifies credentials and returns the user.
    ///
    /// Unknown email and wrong password both return `InvalidCredentials`.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            metrics::counter!("auth_failed_logins").increment(1);
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Retrieves a user by id.
    pub async fn get(&self, id: UserId) -> Result<Option<User>> {
        self.store.get(id).await
    }
}

/// Hashes a password with argon2 and a freshly generated salt.
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Verifies a password against a PHC-format hash.
fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService<InMemoryUserStore> {
        AuthService::new(InMemoryUserStore::new())
    }

    #[tokio::test]
    async fn register_stores_salted_hash() {
        let auth = service();
        let user = auth
            .register("Jo", "jo@example.com", "hunter2", Role::Customer)
            .await
            .unwrap();

        assert!(user.password_hash.starts_with("$argon2"));
        assert!(!user.password_hash.contains("hunter2"));

        // Salts are fresh per registration: same password, different hash.
        let other = auth
            .register("Sam", "sam@example.com", "hunter2", Role::Customer)
            .await
            .unwrap();
        assert_ne!(user.password_hash, other.password_hash);
    }

    #[tokio::test]
    async fn login_verifies_password() {
        let auth = service();
        let registered = auth
            .register("Jo", "jo@example.com", "hunter2", Role::Customer)
            .await
            .unwrap();

        let user = auth.login("jo@example.com", "hunter2").await.unwrap();
        assert_eq!(user.id, registered.id);
    }

    #[tokio::test]
    async fn wrong_password_fails() {
        let auth = service();
        auth.register("Jo", "jo@example.com", "hunter2", Role::Customer)
            .await
            .unwrap();

        let result = auth.login("jo@example.com", "hunter3").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn unknown_email_fails_identically() {
        let auth = service();
        let result = auth.login("nobody@example.com", "whatever").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let auth = service();
        auth.register("Jo", "jo@example.com", "hunter2", Role::Customer)
            .await
            .unwrap();

        let result = auth
            .register("Jo Again", "JO@example.com", "other", Role::Customer)
            .await;
        assert!(matches!(result, Err(AuthError::EmailTaken(_))));
    }

    #[tokio::test]
    async fn admin_role_round_trip() {
        let auth = service();
        let user = auth
            .register("Root", "root@example.com", "s3cret", Role::Admin)
            .await
            .unwrap();
        assert!(user.role.is_admin());

        let loaded = auth.get(user.id).await.unwrap().unwrap();
        assert_eq!(loaded.role, Role::Admin);
    }
}
