//! Client-side form validation. Nothing here touches the network.

use secrecy::{ExposeSecret, SecretString};

use freelance_types::auth::{LoginCredentials, PasswordStrength, RegisterData};
use freelance_types::error::ValidationErrors;
use freelance_types::user::UserType;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_USERNAME_LEN: usize = 3;

/// `local@domain.tld` with no whitespace and exactly one `@`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Letters, digits and underscore, at least three characters.
pub fn is_valid_username(username: &str) -> bool {
    username.chars().count() >= MIN_USERNAME_LEN
        && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Mainland mobile number: 11 digits starting with 13-19.
pub fn is_valid_phone(phone: &str) -> bool {
    let bytes = phone.as_bytes();
    bytes.len() == 11
        && bytes[0] == b'1'
        && (b'3'..=b'9').contains(&bytes[1])
        && bytes.iter().all(u8::is_ascii_digit)
}

/// Score a password on a 0..=9 scale and grade it.
///
/// Anything shorter than the minimum length scores 0. Length thresholds
/// (8/12/16), each character class, the absence of triple repeats and the
/// absence of `123`/`abc`/`qwe` runs each add one point.
pub fn password_strength(password: &str) -> (PasswordStrength, u8) {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return (PasswordStrength::Weak, 0);
    }

    let mut score = 1u8;
    if len >= 12 {
        score += 1;
    }
    if len >= 16 {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    }
    if password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        score += 1;
    }
    if !has_triple_repeat(password) {
        score += 1;
    }
    let lower = password.to_lowercase();
    if !["123", "abc", "qwe"].iter().any(|run| lower.contains(run)) {
        score += 1;
    }

    let strength = match score {
        0..=3 => PasswordStrength::Weak,
        4..=6 => PasswordStrength::Medium,
        _ => PasswordStrength::Strong,
    };
    (strength, score)
}

fn has_triple_repeat(s: &str) -> bool {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(3).any(|w| w[0] == w[1] && w[1] == w[2])
}

/// Login form: a well-formed email and a non-empty password.
///
/// Length rules only apply at registration; existing accounts may predate them.
pub fn validate_login(credentials: &LoginCredentials) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, &credentials.email);
    if credentials.password.expose_secret().is_empty() {
        errors.add("password", "Password is required");
    }
    errors.into_result()
}

/// Registration form as entered, including the fields the backend never sees.
pub struct RegisterForm {
    pub data: RegisterData,
    pub confirm_password: SecretString,
    pub agree_to_terms: bool,
}

pub fn validate_registration(form: &RegisterForm) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let data = &form.data;

    check_email(&mut errors, &data.email);

    let password = data.password.expose_secret();
    if password.is_empty() {
        errors.add("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", "Password must be at least 8 characters");
    }

    let confirm = form.confirm_password.expose_secret();
    if confirm.is_empty() {
        errors.add("confirm_password", "Please confirm your password");
    } else if confirm != password {
        errors.add("confirm_password", "Passwords do not match");
    }

    if data.username.is_empty() {
        errors.add("username", "Username is required");
    } else if data.username.chars().count() < MIN_USERNAME_LEN {
        errors.add("username", "Username must be at least 3 characters");
    } else if !is_valid_username(&data.username) {
        errors.add("username", "Username may only contain letters, digits and underscores");
    }

    if data.user_type == UserType::Admin {
        errors.add("user_type", "Choose a client or freelancer account");
    }

    if data.first_name.trim().is_empty() {
        errors.add("first_name", "First name is required");
    }
    if data.last_name.trim().is_empty() {
        errors.add("last_name", "Last name is required");
    }
    if let Some(phone) = data.phone.as_deref().filter(|p| !p.is_empty()) {
        if !is_valid_phone(phone) {
            errors.add("phone", "Enter a valid mobile number");
        }
    }

    if !form.agree_to_terms {
        errors.add("agree_to_terms", "You must accept the terms of service");
    }

    errors.into_result()
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(email) {
        errors.add("email", "Enter a valid email address");
    }
}
