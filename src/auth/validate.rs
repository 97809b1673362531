use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;
pub const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 6..=100;
pub const PROFILE_INFO_MAX: usize = 500;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    email.len() <= 100 && EMAIL_RE.is_match(email)
}

pub fn username(name: &str) -> Result<(), AppError> {
    if !USERNAME_LEN.contains(&name.chars().count()) {
        return Err(AppError::BadRequest(
            "Username must be between 3 and 50 characters".into(),
        ));
    }
    // login treats an identifier containing '@' as an email
    if name.contains('@') {
        return Err(AppError::BadRequest("Username must not contain '@'".into()));
    }
    Ok(())
}

pub fn email(email: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    Ok(())
}

pub fn password(password: &str) -> Result<(), AppError> {
    if !PASSWORD_LEN.contains(&password.chars().count()) {
        return Err(AppError::BadRequest(
            "Password must be between 6 and 100 characters".into(),
        ));
    }
    Ok(())
}

pub fn profile_info(info: &str) -> Result<(), AppError> {
    if info.chars().count() > PROFILE_INFO_MAX {
        return Err(AppError::BadRequest("Profile info is too long".into()));
    }
    Ok(())
}
