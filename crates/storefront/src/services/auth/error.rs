//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// A password rejected by the [`PasswordPolicy`](crate::config::PasswordPolicy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WeakPassword {
    #[error("Password must be at least {0} characters long.")]
    TooShort(usize),

    #[error("Password must contain at least one digit.")]
    MissingDigit,

    #[error("Password must contain at least one uppercase letter.")]
    MissingUppercase,
}

impl WeakPassword {
    /// The same message with a different subject, e.g. `"New password"`.
    #[must_use]
    pub fn message_for(self, subject: &str) -> String {
        match self {
            Self::TooShort(min) => format!("{subject} must be at least {min} characters long."),
            Self::MissingDigit => format!("{subject} must contain at least one digit."),
            Self::MissingUppercase => {
                format!("{subject} must contain at least one uppercase letter.")
            }
        }
    }
}

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password absent from the request.
    #[error("Email and password are required.")]
    MissingCredentials,

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] aerox_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("Invalid credentials.")]
    InvalidCredentials,

    /// Current password did not verify during a password change.
    #[error("Current password is incorrect.")]
    IncorrectCurrentPassword,

    /// User not found.
    #[error("User not found.")]
    UserNotFound,

    /// User already exists.
    #[error("User already exists.")]
    UserAlreadyExists,

    /// Password too weak.
    #[error(transparent)]
    WeakPassword(#[from] WeakPassword),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
