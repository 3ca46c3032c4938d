use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::{info, warn};

use feedback_db::models::FeedbackRow;
use feedback_types::forms::{DeleteForm, FeedbackForm, FormErrors};
use feedback_types::models::Feedback;

use crate::auth::{AppState, blocking, user_path};
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::session::{FlashCategory, Session};
use crate::views::{self, PageContext};

pub(crate) fn feedback_from_row(row: FeedbackRow) -> Feedback {
    Feedback {
        id: row.id,
        title: row.title,
        content: row.content,
        username: row.username,
    }
}

/// Ids that aren't integers can't name a row.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

async fn load_owned(state: &AppState, current: &CurrentUser, raw_id: &str) -> Result<Feedback, AppError> {
    let id = parse_id(raw_id)?;
    let row = blocking(state, move |s| s.db.get_feedback(id)?.ok_or(AppError::NotFound)).await?;
    current.ensure_owns(&row.username)?;
    Ok(feedback_from_row(row))
}

async fn ensure_user_exists(state: &AppState, username: &str) -> Result<(), AppError> {
    let username = username.to_string();
    blocking(state, move |s| {
        s.db.get_user(&username)?.map(|_| ()).ok_or(AppError::NotFound)
    })
    .await
}

// -- Add --

pub async fn new_feedback(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    mut session: Session,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    current.ensure_owns(&username)?;
    ensure_user_exists(&state, &username).await?;

    let page = views::new_feedback_page(
        &PageContext::new(&mut session),
        &username,
        &FeedbackForm::default(),
        &FormErrors::new(),
    );
    Ok((session, page).into_response())
}

pub async fn create_feedback(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    mut session: Session,
    Path(username): Path<String>,
    Form(form): Form<FeedbackForm>,
) -> Result<Response, AppError> {
    current.ensure_owns(&username)?;
    ensure_user_exists(&state, &username).await?;

    match form.validate(session.csrf_token()) {
        Ok(input) => {
            let owner = username.clone();
            let id = blocking(&state, move |s| {
                Ok(s.db.insert_feedback(&input.title, &input.content, &owner)?)
            })
            .await?;

            info!("User {} created feedback {}", username, id);
            session.flash(FlashCategory::Success, "Feedback Submitted!");
            Ok((session, Redirect::to(&user_path(&username))).into_response())
        }
        Err(errors) => {
            let page =
                views::new_feedback_page(&PageContext::new(&mut session), &username, &form, &errors);
            Ok((session, page).into_response())
        }
    }
}

// -- Update --

pub async fn edit_feedback(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    mut session: Session,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let feedback = load_owned(&state, &current, &id).await?;

    let page = views::edit_feedback_page(
        &PageContext::new(&mut session),
        &feedback,
        &FeedbackForm::from_feedback(&feedback),
        &FormErrors::new(),
    );
    Ok((session, page).into_response())
}

pub async fn update_feedback(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    mut session: Session,
    Path(id): Path<String>,
    Form(form): Form<FeedbackForm>,
) -> Result<Response, AppError> {
    let feedback = load_owned(&state, &current, &id).await?;

    match form.validate(session.csrf_token()) {
        Ok(input) => {
            let id = feedback.id;
            let updated = blocking(&state, move |s| {
                Ok(s.db.update_feedback(id, &input.title, &input.content)?)
            })
            .await?;
            if !updated {
                return Err(AppError::NotFound);
            }

            info!("Feedback {} updated", id);
            session.flash(FlashCategory::Info, "Feedback Updated!");
            Ok((session, Redirect::to(&user_path(&feedback.username))).into_response())
        }
        Err(errors) => {
            let page =
                views::edit_feedback_page(&PageContext::new(&mut session), &feedback, &form, &errors);
            Ok((session, page).into_response())
        }
    }
}

// -- Delete --

pub async fn delete_feedback(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    mut session: Session,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Result<Response, AppError> {
    let feedback = load_owned(&state, &current, &id).await?;

    if form.validate(session.csrf_token()).is_ok() {
        let id = feedback.id;
        blocking(&state, move |s| Ok(s.db.delete_feedback(id)?)).await?;
        info!("Feedback {} deleted", id);
        session.flash(FlashCategory::Info, "Feedback deleted!");
    } else {
        warn!("Rejected delete of feedback {}: bad CSRF token", feedback.id);
        session.flash(FlashCategory::Danger, "Invalid form submission.");
    }

    Ok((session, Redirect::to(&user_path(&feedback.username))).into_response())
}
