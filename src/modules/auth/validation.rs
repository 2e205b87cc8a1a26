/// Minimum username length (ASCII lowercase only)
const MIN_USERNAME_LEN: usize = 4;
/// Minimum password length
const MIN_PASSWORD_LEN: usize = 5;

/// Function to validate a username: four or more lowercase ASCII letters
pub fn validate_username(username: &str) -> bool {
    username.len() >= MIN_USERNAME_LEN && username.chars().all(|c| c.is_ascii_lowercase())
}

/// Function to validate password strength
///
/// All four rules must hold on the same string: long enough, at least one
/// uppercase, one lowercase and one digit, and nothing outside `[A-Za-z0-9]`.
pub fn validate_password(password: &str) -> bool {
    if password.len() < MIN_PASSWORD_LEN {
        return false;
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return false;
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return false;
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    // Rejects symbols, whitespace and any non-ASCII character
    password.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Function to validate a first or last name: one or more ASCII letters
pub fn validate_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic())
}
