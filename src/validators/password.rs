use super::ValidationError;

pub const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Length counted in characters, not bytes.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len == 0 {
        return Err(ValidationError::PasswordEmpty);
    }
    if len < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong(MAX_PASSWORD_LENGTH));
    }
    Ok(())
}

pub fn validate_password_confirmation(
    password: &str,
    confirmation: &str,
) -> Result<(), ValidationError> {
    if password == confirmation {
        Ok(())
    } else {
        Err(ValidationError::PasswordMismatch)
    }
}
