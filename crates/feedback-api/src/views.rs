//! Server-rendered pages.
//!
//! Every page goes through [`layout`], which draws the nav for the current
//! login state and the pending flash messages. Anything that came from a user
//! is passed through [`escape`] before it lands in the markup.

use axum::http::StatusCode;
use axum::response::Html;

use feedback_types::forms::{FeedbackForm, FormErrors, LoginForm, RegisterForm};
use feedback_types::models::{Feedback, User};

use crate::session::{Flash, Session};

/// Per-request data every page needs. Building one drains the session's
/// flashes, so the caller must send the session back with the response.
pub struct PageContext {
    pub current_user: Option<String>,
    pub flashes: Vec<Flash>,
    pub csrf: String,
}

impl PageContext {
    pub fn new(session: &mut Session) -> Self {
        Self {
            current_user: session.username().map(str::to_string),
            flashes: session.take_flashes(),
            csrf: session.csrf_token().to_string(),
        }
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(ctx: &PageContext, title: &str, body: &str) -> Html<String> {
    let nav = match &ctx.current_user {
        Some(username) => format!(
            r#"<a href="/users/{u}">{u}</a> <a href="/logout">Logout</a>"#,
            u = escape(username)
        ),
        None => r#"<a href="/login">Login</a> <a href="/register">Register</a>"#.to_string(),
    };

    let mut flashes = String::new();
    for flash in &ctx.flashes {
        flashes.push_str(&format!(
            r#"<div class="alert alert-{}">{}</div>"#,
            flash.category.as_str(),
            escape(&flash.message)
        ));
    }

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} | Feedback</title>
</head>
<body>
<nav>{nav}</nav>
<main>
{flashes}
<h1>{title}</h1>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    ))
}

pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<h1>{title}</h1>
<p>{message}</p>
<p><a href="/">Home</a></p>
</body>
</html>
"#,
        title = escape(&title),
        message = escape(message),
    ))
}

// -- Form pieces --

fn csrf_field(token: &str) -> String {
    format!(
        r#"<input type="hidden" name="csrf_token" value="{}">"#,
        escape(token)
    )
}

fn field_errors(errors: &[String]) -> String {
    errors
        .iter()
        .map(|e| format!(r#"<small class="error">{}</small>"#, escape(e)))
        .collect()
}

fn form_level_errors(errors: &FormErrors) -> String {
    field_errors(errors.form_errors())
}

fn input(label: &str, name: &str, kind: &str, value: &str, errors: &FormErrors) -> String {
    format!(
        r#"<p><label for="{name}">{label}</label>
<input id="{name}" name="{name}" type="{kind}" value="{value}">{errs}</p>
"#,
        label = escape(label),
        value = escape(value),
        errs = field_errors(errors.field(name)),
    )
}

fn textarea(label: &str, name: &str, value: &str, errors: &FormErrors) -> String {
    format!(
        r#"<p><label for="{name}">{label}</label>
<textarea id="{name}" name="{name}">{value}</textarea>{errs}</p>
"#,
        label = escape(label),
        value = escape(value),
        errs = field_errors(errors.field(name)),
    )
}

// -- Pages --

pub fn register_page(ctx: &PageContext, form: &RegisterForm, errors: &FormErrors) -> Html<String> {
    let body = format!(
        r#"<form method="POST" action="/register">
{csrf}{form_errs}{username}{password}{email}{first}{last}<button>Register</button>
</form>"#,
        csrf = csrf_field(&ctx.csrf),
        form_errs = form_level_errors(errors),
        username = input("Username", "username", "text", &form.username, errors),
        // Passwords are never echoed back.
        password = input("Password", "password", "password", "", errors),
        email = input("Email", "email", "email", &form.email, errors),
        first = input("First Name", "first_name", "text", &form.first_name, errors),
        last = input("Last Name", "last_name", "text", &form.last_name, errors),
    );
    layout(ctx, "Register", &body)
}

pub fn login_page(ctx: &PageContext, form: &LoginForm, errors: &FormErrors) -> Html<String> {
    let body = format!(
        r#"<form method="POST" action="/login">
{csrf}{form_errs}{username}{password}<button>Login</button>
</form>"#,
        csrf = csrf_field(&ctx.csrf),
        form_errs = form_level_errors(errors),
        username = input("Username", "username", "text", &form.username, errors),
        password = input("Password", "password", "password", "", errors),
    );
    layout(ctx, "Login", &body)
}

pub fn user_detail(ctx: &PageContext, user: &User, feedback: &[Feedback]) -> Html<String> {
    let u = escape(&user.username);
    let mut items = String::new();
    for item in feedback {
        items.push_str(&format!(
            r#"<li>
<h3>{title}</h3>
<p>{content}</p>
<a href="/feedback/{id}/update">Edit</a>
<form method="POST" action="/feedback/{id}/delete">{csrf}<button>Delete</button></form>
</li>
"#,
            title = escape(&item.title),
            content = escape(&item.content),
            id = item.id,
            csrf = csrf_field(&ctx.csrf),
        ));
    }
    if items.is_empty() {
        items.push_str("<li>No feedback yet.</li>\n");
    }

    let body = format!(
        r#"<section class="profile">
<p><b>Username:</b> {u}</p>
<p><b>Name:</b> {name}</p>
<p><b>Email:</b> {email}</p>
</section>
<h2>Feedback</h2>
<ul class="feedback">
{items}</ul>
<p><a href="/users/{u}/feedback/add">Add Feedback</a></p>
<p><a href="/users/{u}/delete">Delete Account</a></p>"#,
        name = escape(&user.full_name()),
        email = escape(&user.email),
    );
    layout(ctx, &user.username, &body)
}

fn feedback_fields(ctx: &PageContext, form: &FeedbackForm, errors: &FormErrors) -> String {
    format!(
        "{csrf}{form_errs}{title}{content}",
        csrf = csrf_field(&ctx.csrf),
        form_errs = form_level_errors(errors),
        title = input("Title", "title", "text", &form.title, errors),
        content = textarea("What's on Your Mind?", "content", &form.content, errors),
    )
}

pub fn new_feedback_page(
    ctx: &PageContext,
    username: &str,
    form: &FeedbackForm,
    errors: &FormErrors,
) -> Html<String> {
    let body = format!(
        r#"<form method="POST" action="/users/{u}/feedback/add">
{fields}<button>Submit</button>
</form>"#,
        u = escape(username),
        fields = feedback_fields(ctx, form, errors),
    );
    layout(ctx, "Add Feedback", &body)
}

pub fn edit_feedback_page(
    ctx: &PageContext,
    feedback: &Feedback,
    form: &FeedbackForm,
    errors: &FormErrors,
) -> Html<String> {
    let body = format!(
        r#"<form method="POST" action="/feedback/{id}/update">
{fields}<button>Update</button>
</form>
<p><a href="/users/{u}">Cancel</a></p>"#,
        id = feedback.id,
        u = escape(&feedback.username),
        fields = feedback_fields(ctx, form, errors),
    );
    layout(ctx, "Edit Feedback", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FlashCategory;

    fn ctx() -> PageContext {
        PageContext {
            current_user: Some("alice".into()),
            flashes: vec![Flash {
                category: FlashCategory::Success,
                message: "Saved <ok>".into(),
            }],
            csrf: "tok123".into(),
        }
    }

    #[test]
    fn escape_covers_html_specials() {
        assert_eq!(
            escape(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;&lt;/a&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn layout_shows_flashes_and_logged_in_nav() {
        let Html(page) = login_page(&ctx(), &LoginForm::default(), &FormErrors::new());
        assert!(page.contains(r#"<div class="alert alert-success">Saved &lt;ok&gt;</div>"#));
        assert!(page.contains(r#"href="/logout""#));
        assert!(page.contains(r#"name="csrf_token" value="tok123""#));
    }

    #[test]
    fn register_page_echoes_values_and_errors_but_not_password() {
        let form = RegisterForm {
            username: "bob".into(),
            password: "hunter2".into(),
            ..Default::default()
        };
        let mut errors = FormErrors::new();
        errors.add("username", "Username taken.  Please pick another");

        let Html(page) = register_page(&ctx(), &form, &errors);
        assert!(page.contains(r#"value="bob""#));
        assert!(page.contains("Username taken.  Please pick another"));
        assert!(!page.contains("hunter2"));
    }

    #[test]
    fn user_detail_lists_feedback_with_controls() {
        let user = User {
            username: "alice".into(),
            email: "alice@example.com".into(),
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
        };
        let items = [Feedback {
            id: 7,
            title: "<script>".into(),
            content: "hello".into(),
            username: "alice".into(),
        }];

        let Html(page) = user_detail(&ctx(), &user, &items);
        assert!(page.contains("Alice Liddell"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
        assert!(page.contains(r#"href="/feedback/7/update""#));
        assert!(page.contains(r#"action="/feedback/7/delete""#));
    }

    #[test]
    fn error_page_names_the_status() {
        let Html(page) = error_page(StatusCode::UNAUTHORIZED, "nope");
        assert!(page.contains("401 Unauthorized"));
    }
}
