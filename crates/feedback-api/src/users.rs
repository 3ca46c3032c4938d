use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::info;

use crate::auth::{AppState, blocking, user_from_row};
use crate::error::AppError;
use crate::feedback::feedback_from_row;
use crate::middleware::CurrentUser;
use crate::session::{FlashCategory, Session};
use crate::views::{self, PageContext};

pub async fn show_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    mut session: Session,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    current.ensure_owns(&username)?;

    let (user, feedback) = blocking(&state, move |s| {
        let user = s.db.get_user(&username)?.ok_or(AppError::NotFound)?;
        let feedback = s.db.feedback_for_user(&username)?;
        Ok((user, feedback))
    })
    .await?;

    let user = user_from_row(user);
    let feedback: Vec<_> = feedback.into_iter().map(feedback_from_row).collect();

    let page = views::user_detail(&PageContext::new(&mut session), &user, &feedback);
    Ok((session, page).into_response())
}

/// Removes the account and all of its feedback, then logs out.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    mut session: Session,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    current.ensure_owns(&username)?;

    let target = username.clone();
    let deleted = blocking(&state, move |s| Ok(s.db.delete_user(&target)?)).await?;
    if !deleted {
        return Err(AppError::NotFound);
    }

    info!("Deleted user {}", username);
    session.logout();
    session.flash(FlashCategory::Info, "User deleted!");
    Ok((session, Redirect::to("/")).into_response())
}
