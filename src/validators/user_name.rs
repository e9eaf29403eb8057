use super::ValidationError;

pub fn validate_user_name(user_name: &str) -> Result<(), ValidationError> {
    if user_name.is_empty() {
        return Err(ValidationError::UserNameEmpty);
    }
    if user_name.chars().any(char::is_whitespace) {
        return Err(ValidationError::UserNameHasSpaces);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_user_names() {
        assert!(validate_user_name("alice").is_ok());
        assert!(validate_user_name("alice_liddell-99").is_ok());
    }

    #[test]
    fn test_invalid_user_names() {
        assert_eq!(validate_user_name(""), Err(ValidationError::UserNameEmpty));
        assert_eq!(
            validate_user_name("alice liddell"),
            Err(ValidationError::UserNameHasSpaces)
        );
        assert_eq!(
            validate_user_name(" alice"),
            Err(ValidationError::UserNameHasSpaces)
        );
    }
}
