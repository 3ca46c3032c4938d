//! Form schemas for every page that accepts input.
//!
//! Bodies arrive as `application/x-www-form-urlencoded`; missing fields
//! deserialize to empty strings so validation can report them instead of the
//! extractor rejecting the request outright.

use std::collections::BTreeMap;

use serde::Deserialize;

pub const USERNAME_MAX_LEN: usize = 20;
pub const EMAIL_MAX_LEN: usize = 50;
pub const NAME_MAX_LEN: usize = 30;
pub const TITLE_MAX_LEN: usize = 100;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_EMAIL: &str = "Invalid email address.";
pub const INVALID_CSRF: &str = "The CSRF token is invalid.";
pub const INVALID_USERNAME: &str =
    "Usernames may only contain letters, numbers, '_' and '-'.";

/// Validation failures keyed by field name, plus errors that belong to the
/// form as a whole.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
    form: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn add_form_error(&mut self, message: impl Into<String>) {
        self.form.push(message.into());
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn form_errors(&self) -> &[String] {
        &self.form
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.form.is_empty()
    }

    fn finish<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    fn required(&mut self, field: &'static str, value: &str, max_len: Option<usize>) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, REQUIRED);
        } else if let Some(max) = max_len {
            if trimmed.chars().count() > max {
                self.add(field, format!("Field cannot be longer than {} characters.", max));
            }
        }
        trimmed.to_string()
    }

    /// Usernames become a URL path segment, so they are kept verbatim and
    /// limited to characters that need no escaping there.
    fn username(&mut self, value: &str, max_len: Option<usize>) -> String {
        if value.trim().is_empty() {
            self.add("username", REQUIRED);
        } else if !value.chars().all(is_username_char) {
            self.add("username", INVALID_USERNAME);
        } else if let Some(max) = max_len {
            if value.chars().count() > max {
                self.add("username", format!("Field cannot be longer than {} characters.", max));
            }
        }
        value.to_string()
    }

    fn csrf(&mut self, submitted: &str, expected: &str) {
        if submitted.is_empty() || submitted != expected {
            self.add_form_error(INVALID_CSRF);
        }
    }
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !value.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}

// -- Register --

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub csrf_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterForm {
    pub fn validate(&self, csrf: &str) -> Result<NewUser, FormErrors> {
        let mut errors = FormErrors::new();
        errors.csrf(&self.csrf_token, csrf);

        let username = errors.username(&self.username, Some(USERNAME_MAX_LEN));
        if self.password.trim().is_empty() {
            errors.add("password", REQUIRED);
        }
        let email = errors.required("email", &self.email, Some(EMAIL_MAX_LEN));
        if !email.is_empty() && !looks_like_email(&email) {
            errors.add("email", INVALID_EMAIL);
        }
        let first_name = errors.required("first_name", &self.first_name, Some(NAME_MAX_LEN));
        let last_name = errors.required("last_name", &self.last_name, Some(NAME_MAX_LEN));

        errors.finish(NewUser {
            username,
            password: self.password.clone(),
            email,
            first_name,
            last_name,
        })
    }
}

// -- Login --

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub csrf_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self, csrf: &str) -> Result<Credentials, FormErrors> {
        let mut errors = FormErrors::new();
        errors.csrf(&self.csrf_token, csrf);

        // Verbatim, so it matches exactly what registration stored.
        if self.username.trim().is_empty() {
            errors.add("username", REQUIRED);
        }
        let username = self.username.clone();
        if self.password.trim().is_empty() {
            errors.add("password", REQUIRED);
        }

        errors.finish(Credentials {
            username,
            password: self.password.clone(),
        })
    }
}

// -- Feedback --

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct FeedbackForm {
    pub title: String,
    pub content: String,
    pub csrf_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackInput {
    pub title: String,
    pub content: String,
}

impl FeedbackForm {
    /// Prefills the form from an existing item, as the update page does.
    pub fn from_feedback(feedback: &crate::models::Feedback) -> Self {
        Self {
            title: feedback.title.clone(),
            content: feedback.content.clone(),
            csrf_token: String::new(),
        }
    }

    pub fn validate(&self, csrf: &str) -> Result<FeedbackInput, FormErrors> {
        let mut errors = FormErrors::new();
        errors.csrf(&self.csrf_token, csrf);

        let title = errors.required("title", &self.title, Some(TITLE_MAX_LEN));
        let content = errors.required("content", &self.content, None);

        errors.finish(FeedbackInput { title, content })
    }
}

// -- Delete --

/// Carries nothing but the CSRF token.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DeleteForm {
    pub csrf_token: String,
}

impl DeleteForm {
    pub fn validate(&self, csrf: &str) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        errors.csrf(&self.csrf_token, csrf);
        errors.finish(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "tok";

    fn register_form() -> RegisterForm {
        RegisterForm {
            username: "alice".into(),
            password: " secret pw ".into(),
            email: "alice@example.com".into(),
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
            csrf_token: TOKEN.into(),
        }
    }

    #[test]
    fn register_trims_fields_but_keeps_password_verbatim() {
        let mut form = register_form();
        form.first_name = "  Alice ".into();
        let user = form.validate(TOKEN).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.first_name, "Alice");
        assert_eq!(user.password, " secret pw ");
    }

    #[test]
    fn register_reports_every_blank_field() {
        let form = RegisterForm {
            csrf_token: TOKEN.into(),
            ..Default::default()
        };
        let errors = form.validate(TOKEN).unwrap_err();
        for field in ["username", "password", "email", "first_name", "last_name"] {
            assert_eq!(errors.field(field), [REQUIRED.to_string()], "{field}");
        }
        assert!(errors.form_errors().is_empty());
    }

    #[test]
    fn register_rejects_long_username_and_bad_email() {
        let mut form = register_form();
        form.username = "x".repeat(USERNAME_MAX_LEN + 1);
        form.email = "not-an-email".into();
        let errors = form.validate(TOKEN).unwrap_err();
        assert_eq!(
            errors.field("username"),
            ["Field cannot be longer than 20 characters.".to_string()]
        );
        assert_eq!(errors.field("email"), [INVALID_EMAIL.to_string()]);
    }

    #[test]
    fn usernames_must_be_url_safe() {
        for bad in ["a?b", "a/b", "a#b", "a b", " alice", "al%69ce", "ali.ce", "ålice"] {
            let mut form = register_form();
            form.username = bad.into();
            let errors = form.validate(TOKEN).unwrap_err();
            assert_eq!(errors.field("username"), [INVALID_USERNAME.to_string()], "{bad:?}");
        }
        for good in ["alice", "Bob_99", "x-y"] {
            let mut form = register_form();
            form.username = good.into();
            assert_eq!(form.validate(TOKEN).unwrap().username, good);
        }
    }

    #[test]
    fn login_keeps_username_verbatim() {
        let form = LoginForm {
            username: " alice".into(),
            password: "pw".into(),
            csrf_token: TOKEN.into(),
        };
        assert_eq!(form.validate(TOKEN).unwrap().username, " alice");

        let blank = LoginForm {
            username: "  ".into(),
            ..form
        };
        assert_eq!(blank.validate(TOKEN).unwrap_err().field("username"), [REQUIRED.to_string()]);
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let form = FeedbackForm {
            title: "   ".into(),
            content: "\n\t".into(),
            csrf_token: TOKEN.into(),
        };
        let errors = form.validate(TOKEN).unwrap_err();
        assert_eq!(errors.field("title"), [REQUIRED.to_string()]);
        assert_eq!(errors.field("content"), [REQUIRED.to_string()]);
    }

    #[test]
    fn mismatched_csrf_is_a_form_error() {
        let form = LoginForm {
            username: "alice".into(),
            password: "pw".into(),
            csrf_token: "forged".into(),
        };
        let errors = form.validate(TOKEN).unwrap_err();
        assert_eq!(errors.form_errors(), [INVALID_CSRF.to_string()]);
        assert!(errors.field("username").is_empty());
    }

    #[test]
    fn empty_csrf_never_matches() {
        assert!(DeleteForm::default().validate("").is_err());
        let form = DeleteForm { csrf_token: TOKEN.into() };
        assert!(form.validate(TOKEN).is_ok());
    }

    #[test]
    fn email_shapes() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a@"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("a b@c.de"));
        assert!(!looks_like_email("a@b@c.de"));
    }
}
