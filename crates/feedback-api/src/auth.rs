use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{info, warn};

use feedback_db::Database;
use feedback_db::models::UserRow;
use feedback_types::forms::{FormErrors, LoginForm, NewUser, RegisterForm};
use feedback_types::models::User;

use crate::error::AppError;
use crate::session::{FlashCategory, Session, SessionConfig};
use crate::views::{self, PageContext};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub session: SessionConfig,
    /// Enables `/error`.
    pub debug: bool,
}

/// Runs store work (and argon2) off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&AppStateInner) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state)).await?
}

pub(crate) fn user_path(username: &str) -> String {
    format!("/users/{}", username)
}

pub(crate) fn user_from_row(row: UserRow) -> User {
    User {
        username: row.username,
        email: row.email,
        first_name: row.first_name,
        last_name: row.last_name,
    }
}

// -- Passwords --

/// Argon2id with a random salt, PHC string format.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// False for a wrong password and for a stored hash that doesn't parse.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// -- Operations --

/// Hashes the password and stores the account.
/// Fails with [`AppError::DuplicateUsername`] if the name is taken.
pub fn register(db: &Database, new_user: NewUser) -> Result<User, AppError> {
    let row = UserRow {
        password: hash_password(&new_user.password)?,
        username: new_user.username,
        email: new_user.email,
        first_name: new_user.first_name,
        last_name: new_user.last_name,
    };
    db.create_user(&row)?;
    Ok(user_from_row(row))
}

/// `None` means invalid credentials, whatever the reason.
pub fn authenticate(db: &Database, username: &str, password: &str) -> Result<Option<User>, AppError> {
    let user = db
        .get_user(username)?
        .filter(|row| verify_password(password, &row.password))
        .map(user_from_row);
    Ok(user)
}

// -- Handlers --

pub async fn index() -> Redirect {
    Redirect::to("/register")
}

pub async fn register_page(mut session: Session) -> Response {
    if let Some(username) = session.username() {
        return Redirect::to(&user_path(username)).into_response();
    }

    let page = views::register_page(
        &PageContext::new(&mut session),
        &RegisterForm::default(),
        &FormErrors::new(),
    );
    (session, page).into_response()
}

pub async fn register_submit(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if let Some(username) = session.username() {
        return Ok(Redirect::to(&user_path(username)).into_response());
    }

    let errors = match form.validate(session.csrf_token()) {
        Ok(new_user) => match blocking(&state, move |s| register(&s.db, new_user)).await {
            Ok(user) => {
                info!("Registered user {}", user.username);
                session.login(&user.username);
                session.flash(
                    FlashCategory::Success,
                    "Welcome! Successfully Created Your Account!",
                );
                return Ok((session, Redirect::to(&user_path(&user.username))).into_response());
            }
            Err(AppError::DuplicateUsername) => {
                let mut errors = FormErrors::new();
                errors.add("username", "Username taken.  Please pick another");
                errors
            }
            Err(e) => return Err(e),
        },
        Err(errors) => errors,
    };

    let page = views::register_page(&PageContext::new(&mut session), &form, &errors);
    Ok((session, page).into_response())
}

pub async fn login_page(mut session: Session) -> Response {
    if let Some(username) = session.username() {
        return Redirect::to(&user_path(username)).into_response();
    }

    let page = views::login_page(
        &PageContext::new(&mut session),
        &LoginForm::default(),
        &FormErrors::new(),
    );
    (session, page).into_response()
}

pub async fn login_submit(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if let Some(username) = session.username() {
        return Ok(Redirect::to(&user_path(username)).into_response());
    }

    let errors = match form.validate(session.csrf_token()) {
        Ok(creds) => {
            let username = creds.username.clone();
            let user = blocking(&state, move |s| {
                authenticate(&s.db, &creds.username, &creds.password)
            })
            .await?;

            match user {
                Some(user) => {
                    info!("User {} logged in", user.username);
                    session.flash(
                        FlashCategory::Primary,
                        format!("Welcome Back, {}!", user.username),
                    );
                    session.login(&user.username);
                    return Ok((session, Redirect::to(&user_path(&user.username))).into_response());
                }
                None => {
                    warn!("Failed login for {}", username);
                    let mut errors = FormErrors::new();
                    errors.add("username", "Invalid username/password.");
                    errors
                }
            }
        }
        Err(errors) => errors,
    };

    let page = views::login_page(&PageContext::new(&mut session), &form, &errors);
    Ok((session, page).into_response())
}

pub async fn logout(mut session: Session) -> Response {
    if let Some(username) = session.logout() {
        info!("User {} logged out", username);
    }
    session.flash(FlashCategory::Info, "Goodbye!");
    (session, Redirect::to("/")).into_response()
}

/// Debug aid: always answers 401 when debug mode is on.
pub async fn debug_error(State(state): State<AppState>) -> AppError {
    if state.debug {
        AppError::Unauthorized
    } else {
        AppError::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, password: &str) -> NewUser {
        NewUser {
            username: username.into(),
            password: password.into(),
            email: format!("{username}@example.com"),
            first_name: "First".into(),
            last_name: "Last".into(),
        }
    }

    #[test]
    fn password_hash_verifies_only_exact_password() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[test]
    fn register_never_stores_plaintext() {
        let db = Database::open_in_memory().unwrap();
        register(&db, new_user("alice", "pw")).unwrap();
        let row = db.get_user("alice").unwrap().unwrap();
        assert_ne!(row.password, "pw");
    }

    #[test]
    fn second_registration_with_same_username_fails() {
        let db = Database::open_in_memory().unwrap();
        let first = register(&db, new_user("alice", "pw1")).unwrap();
        assert_eq!(first.username, "alice");

        let err = register(&db, new_user("alice", "pw2")).unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));

        assert!(authenticate(&db, "alice", "pw1").unwrap().is_some());
        assert!(authenticate(&db, "alice", "pw2").unwrap().is_none());
    }

    #[test]
    fn authenticate_matches_exact_password_only() {
        let db = Database::open_in_memory().unwrap();
        register(&db, new_user("bob", "Secret!")).unwrap();

        let user = authenticate(&db, "bob", "Secret!").unwrap().unwrap();
        assert_eq!(user.email, "bob@example.com");

        for wrong in ["secret!", "Secret", "Secret! ", ""] {
            assert!(authenticate(&db, "bob", wrong).unwrap().is_none(), "{wrong:?}");
        }
        assert!(authenticate(&db, "nobody", "Secret!").unwrap().is_none());
    }
}
