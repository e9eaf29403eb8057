//! Input checks for signup and login payloads.

mod email;
mod password;
mod user_name;

pub use email::validate_email;
pub use password::{MIN_PASSWORD_LENGTH, validate_password, validate_password_confirmation};
pub use user_name::validate_user_name;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum ValidationError {
    #[error("Email cannot be empty")]
    EmailEmpty,
    #[error("Email is too long (max 254 characters)")]
    EmailTooLong,
    #[error("Invalid email format")]
    EmailInvalidFormat,
    #[error("Password cannot be empty")]
    PasswordEmpty,
    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("Password is too long (max {0} characters)")]
    PasswordTooLong(usize),
    #[error("Password and confirmation do not match")]
    PasswordMismatch,
    #[error("Username cannot be empty")]
    UserNameEmpty,
    #[error("Username cannot contain spaces")]
    UserNameHasSpaces,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmailEmpty | Self::EmailTooLong | Self::EmailInvalidFormat => "INVALID_EMAIL",
            Self::PasswordEmpty | Self::PasswordTooShort(_) | Self::PasswordTooLong(_) => {
                "INVALID_PASSWORD"
            }
            Self::PasswordMismatch => "PASSWORD_MISMATCH",
            Self::UserNameEmpty | Self::UserNameHasSpaces => "INVALID_USERNAME",
        }
    }
}
