//! Cookie-backed session.
//!
//! The whole session lives client-side in one cookie holding an HS256 JWT.
//! Handlers extract a [`Session`], mutate it, and hand it back as part of the
//! response so the re-signed cookie is written out. A cookie that is missing,
//! expired or fails signature checks simply yields a fresh anonymous session.

use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::response::{IntoResponseParts, ResponseParts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::auth::AppState;

pub const COOKIE_NAME: &str = "session";

/// Signing keys and cookie policy, built once at startup.
#[derive(Clone)]
pub struct SessionConfig {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
    secure: bool,
}

impl SessionConfig {
    pub fn new(secret: &str, ttl_hours: i64, secure: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: chrono::Duration::hours(ttl_hours),
            secure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Primary,
    Info,
    Danger,
}

impl FlashCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashCategory::Success => "success",
            FlashCategory::Primary => "primary",
            FlashCategory::Info => "info",
            FlashCategory::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    flashes: Vec<Flash>,
    #[serde(default)]
    csrf: String,
    exp: usize,
}

pub struct Session {
    claims: Claims,
    jar: CookieJar,
    config: SessionConfig,
}

fn new_csrf_token() -> String {
    let bytes: [u8; 32] = rand::random();
    B64.encode(bytes)
}

impl Session {
    pub fn from_jar(jar: CookieJar, config: SessionConfig) -> Self {
        let mut claims = jar
            .get(COOKIE_NAME)
            .and_then(|cookie| {
                decode::<Claims>(cookie.value(), &config.decoding, &Validation::default())
                    .map_err(|e| debug!("Discarding session cookie: {}", e))
                    .ok()
            })
            .map(|data| data.claims)
            .unwrap_or_default();

        if claims.csrf.is_empty() {
            claims.csrf = new_csrf_token();
        }

        Self {
            claims,
            jar,
            config,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.claims.username.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.claims.username.is_some()
    }

    /// Marks the session as belonging to `username`. The CSRF token is
    /// rotated whenever the identity changes.
    pub fn login(&mut self, username: impl Into<String>) {
        self.claims.username = Some(username.into());
        self.claims.csrf = new_csrf_token();
    }

    /// Returns the username that was logged in, if any.
    pub fn logout(&mut self) -> Option<String> {
        let previous = self.claims.username.take();
        if previous.is_some() {
            self.claims.csrf = new_csrf_token();
        }
        previous
    }

    pub fn flash(&mut self, category: FlashCategory, message: impl Into<String>) {
        self.claims.flashes.push(Flash {
            category,
            message: message.into(),
        });
    }

    /// Drains queued flashes; each one is shown exactly once.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.claims.flashes)
    }

    pub fn csrf_token(&self) -> &str {
        &self.claims.csrf
    }

    /// Re-signs the claims into the cookie jar.
    pub fn into_jar(mut self) -> CookieJar {
        self.claims.exp = (chrono::Utc::now() + self.config.ttl).timestamp() as usize;

        match encode(&Header::default(), &self.claims, &self.config.encoding) {
            Ok(token) => self.jar.add(
                Cookie::build((COOKIE_NAME, token))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .secure(self.config.secure),
            ),
            Err(e) => {
                error!("Failed to sign session: {}", e);
                self.jar.remove(Cookie::build(COOKIE_NAME).path("/"))
            }
        }
    }
}

impl<S> FromRequestParts<S> for Session
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(Session::from_jar(jar, state.session.clone()))
    }
}

impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.into_jar().into_response_parts(res)
    }
}
