use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::error::AppError;
use crate::session::{FlashCategory, Session};

/// The logged-in user, inserted by [`require_login`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
}

impl CurrentUser {
    /// Only the owner may see or touch their account and feedback.
    pub fn ensure_owns(&self, owner: &str) -> Result<(), AppError> {
        if self.username == owner {
            Ok(())
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

/// Sends anonymous visitors to the login page with a flash.
pub async fn require_login(mut session: Session, mut req: Request, next: Next) -> Response {
    match session.username() {
        Some(username) => {
            let current = CurrentUser {
                username: username.to_string(),
            };
            req.extensions_mut().insert(current);
            next.run(req).await
        }
        None => {
            session.flash(FlashCategory::Danger, "Please login first!");
            (session, Redirect::to("/login")).into_response()
        }
    }
}
