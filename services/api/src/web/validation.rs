//! services/api/src/web/validation.rs
//!
//! Field checks for the account forms. Every problem is collected so the
//! client can show them all at once.

use crate::error::ApiError;
use regex::Regex;

const MIN_PASSWORD_LEN: usize = 8;

/// Compiled once at startup and shared through `AppState`.
pub struct FormValidator {
    uppercase: Regex,
    lowercase: Regex,
    digit: Regex,
    special: Regex,
    email: Regex,
}

impl FormValidator {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            uppercase: Regex::new(r"[A-Z]")?,
            lowercase: Regex::new(r"[a-z]")?,
            digit: Regex::new(r"\d")?,
            special: Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#)?,
            email: Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")?,
        })
    }

    pub fn check_registration(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), ApiError> {
        let mut problems = Vec::new();
        require("Username", username, &mut problems);
        if require("Email", email, &mut problems) && !self.email.is_match(email.trim()) {
            problems.push("Email not valid".to_string());
        }
        self.check_password(password, confirm_password, &mut problems);
        finish(problems)
    }

    pub fn check_password_change(
        &self,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), ApiError> {
        let mut problems = Vec::new();
        require("Password", current_password, &mut problems);
        self.check_password(new_password, confirm_password, &mut problems);
        finish(problems)
    }

    pub fn check_login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let mut problems = Vec::new();
        require("Username", username, &mut problems);
        require("Password", password, &mut problems);
        finish(problems)
    }

    fn check_password(&self, password: &str, confirm_password: &str, problems: &mut Vec<String>) {
        if !require("Password", password, problems) {
            return;
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            problems.push(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LEN
            ));
        }
        let rules = [
            (&self.uppercase, "Password must contain at least one uppercase letter"),
            (&self.lowercase, "Password must contain at least one lowercase letter"),
            (&self.digit, "Password must contain at least one digit"),
            (&self.special, "Password must contain at least one special character"),
        ];
        if let Some((_, message)) = rules.iter().find(|(re, _)| !re.is_match(password)) {
            problems.push(message.to_string());
        }
        if password != confirm_password {
            problems.push("Passwords must match".to_string());
        }
    }
}

/// Records a problem for a blank field; returns whether the field was filled.
fn require(field: &str, value: &str, problems: &mut Vec<String>) -> bool {
    if value.trim().is_empty() {
        problems.push(format!("{} is required", field));
        false
    } else {
        true
    }
}

fn finish(problems: Vec<String>) -> Result<(), ApiError> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(problems))
    }
}
