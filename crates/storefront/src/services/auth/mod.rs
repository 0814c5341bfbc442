//! Authentication service.
//!
//! Email/password accounts: registration, login, and password changes.
//! Passwords are hashed with Argon2id and never stored or logged in plain
//! text.

mod error;

pub use error::{AuthError, WeakPassword};

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use aerox_core::{Email, UserId};

use crate::config::PasswordPolicy;
use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, User};

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    policy: PasswordPolicy,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, policy: PasswordPolicy) -> Self {
        Self { users, policy }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` if either field is empty.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet the policy.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let email = Email::parse(email)?;
        validate_password(&self.policy, password)?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(password)?;
        let new_user = NewUser {
            email,
            password_hash,
            name: None,
            shipping_address: None,
        };

        // The pre-check can race another registration; the store decides.
        let user = self.users.create(&new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })?;

        Ok(user)
    }

    /// Login with email and password.
    ///
    /// Unknown emails and wrong passwords fail identically.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` if either field is empty.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Replace a user's password after re-verifying the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the new password doesn't meet the policy.
    /// Returns `AuthError::UserNotFound` if the user no longer exists.
    /// Returns `AuthError::IncorrectCurrentPassword` if `current` does not verify.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        validate_password(&self.policy, new)?;

        let stored = self
            .users
            .get_password_hash_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(current, &stored).map_err(|_| AuthError::IncorrectCurrentPassword)?;

        let password_hash = hash_password(new)?;
        self.users
            .update_password(user_id, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Check a password against the policy. Length counts characters, not bytes.
///
/// # Errors
///
/// Returns the first rule the password breaks.
pub fn validate_password(policy: &PasswordPolicy, password: &str) -> Result<(), WeakPassword> {
    if password.chars().count() < policy.min_length {
        return Err(WeakPassword::TooShort(policy.min_length));
    }
    if policy.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(WeakPassword::MissingDigit);
    }
    if policy.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(WeakPassword::MissingUppercase);
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryStore::new()), PasswordPolicy::default())
    }

    #[test]
    fn test_validate_password_rules() {
        let policy = PasswordPolicy::default();
        assert_eq!(validate_password(&policy, "Ab1"), Err(WeakPassword::TooShort(8)));
        assert_eq!(
            validate_password(&policy, "Abcdefgh"),
            Err(WeakPassword::MissingDigit)
        );
        assert_eq!(
            validate_password(&policy, "abcdefg1"),
            Err(WeakPassword::MissingUppercase)
        );
        assert!(validate_password(&policy, "Abcdefg1").is_ok());
    }

    #[test]
    fn test_weak_password_messages() {
        assert_eq!(
            WeakPassword::MissingDigit.to_string(),
            "Password must contain at least one digit."
        );
        assert_eq!(
            WeakPassword::TooShort(8).message_for("New password"),
            "New password must be at least 8 characters long."
        );
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Sprint2024").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Sprint2024", &hash).is_ok());
        assert!(matches!(
            verify_password("sprint2024", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let auth = service();
        let user = auth.register("runner@aero-x.dev", "Sprint2024").await.unwrap();
        let logged_in = auth.login("runner@aero-x.dev", "Sprint2024").await.unwrap();
        assert_eq!(user.id, logged_in.id);

        assert!(matches!(
            auth.register("runner@aero-x.dev", "Sprint2024").await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let auth = service();
        auth.register("runner@aero-x.dev", "Sprint2024").await.unwrap();

        let wrong_password = auth.login("runner@aero-x.dev", "Sprint2025").await.unwrap_err();
        let unknown_user = auth.login("ghost@aero-x.dev", "Sprint2024").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_register_requires_both_fields() {
        let auth = service();
        assert!(matches!(
            auth.register("", "Sprint2024").await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            auth.register("runner@aero-x.dev", "short").await,
            Err(AuthError::WeakPassword(WeakPassword::TooShort(8)))
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let auth = service();
        let user = auth.register("runner@aero-x.dev", "Sprint2024").await.unwrap();

        assert!(matches!(
            auth.change_password(user.id, "Wrong2024", "Marathon42").await,
            Err(AuthError::IncorrectCurrentPassword)
        ));

        auth.change_password(user.id, "Sprint2024", "Marathon42")
            .await
            .unwrap();
        assert!(auth.login("runner@aero-x.dev", "Marathon42").await.is_ok());
        assert!(auth.login("runner@aero-x.dev", "Sprint2024").await.is_err());
    }
}
