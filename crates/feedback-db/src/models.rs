//! Database row types. These map directly to SQLite rows and are kept apart
//! from the feedback-types models so the store layer stays independent.

pub struct UserRow {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

pub struct FeedbackRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub username: String,
}
