#![cfg(feature = "web")]

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::{Result, ViewerError};

pub const SESSION_COOKIE: &str = "session";
const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// Login form data
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Password in plaintext (only transmitted, never stored)
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    pub error: Option<String>,
}

/// Per-browser session state
#[derive(Debug, Clone)]
pub struct Session {
    pub authenticated: bool,
    pub expires_at: SystemTime,
}

/// Shared-password gate
///
/// Holds the Argon2 hash of the configured password together with the live
/// sessions. A gate built from an empty password is disabled and lets every
/// request through.
pub struct LoginGate {
    password_hash: Option<String>,
    sessions: RwLock<HashMap<String, Session>>,
}

impl LoginGate {
    pub fn new(password: &str) -> Result<Self> {
        let password_hash = if password.is_empty() {
            None
        } else {
            Some(hash_password(password)?)
        };
        Ok(LoginGate {
            password_hash,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub fn enabled(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Check a login attempt against the configured password.
    pub fn verify(&self, password: &str) -> bool {
        match &self.password_hash {
            Some(hash) => verify_password(password, hash),
            None => true,
        }
    }

    /// Create and store a new authenticated session, returning its id.
    pub fn create_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        let session = Session {
            authenticated: true,
            expires_at: SystemTime::now() + Duration::from_secs(SESSION_DURATION),
        };

        let mut sessions = match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.retain(|_, s| s.expires_at > SystemTime::now());
        sessions.insert(session_id.clone(), session);

        session_id
    }

    /// Whether the session id belongs to a live authenticated session.
    pub fn validate_session(&self, session_id: &str) -> bool {
        let sessions = match self.sessions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions
            .get(session_id)
            .is_some_and(|s| s.authenticated && s.expires_at > SystemTime::now())
    }

    pub fn end_session(&self, session_id: &str) {
        let mut sessions = match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.remove(session_id);
    }

    /// Whether the request carrying `jar` may see the viewer.
    pub fn is_authenticated(&self, jar: &CookieJar) -> bool {
        if !self.enabled() {
            return true;
        }
        jar.get(SESSION_COOKIE)
            .is_some_and(|cookie| self.validate_session(cookie.value()))
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ViewerError::Config("password hashing failed".to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Serve the login page, with the error line shown after a failed attempt.
pub async fn serve_login_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<LoginPageQuery>,
) -> Response {
    if !state.gate.enabled() || state.gate.is_authenticated(&jar) {
        return Redirect::to("/").into_response();
    }

    let error_line = if params.error.is_some() {
        r#"<p class="error">Incorrect password.</p>"#
    } else {
        ""
    };
    let page = include_str!("./static/login.html").replace("{{error}}", error_line);
    Html(page).into_response()
}

/// Handle a login form submission.
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    if state.gate.verify(&form.password) {
        let session_id = state.gate.create_session();
        let cookie = Cookie::build((SESSION_COOKIE, session_id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();
        (jar.add(cookie), Redirect::to("/")).into_response()
    } else {
        log::warn!("Rejected login attempt");
        Redirect::to("/login?error=1").into_response()
    }
}

/// Handle user logout
pub async fn handle_logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.gate.end_session(cookie.value());
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    (jar, Redirect::to("/login"))
}

/// Authentication middleware
///
/// Passes authenticated requests (or every request when the gate is
/// disabled). Otherwise API calls get `401` and pages redirect to `/login`.
pub async fn require_auth(
    State(gate): State<Arc<LoginGate>>,
    jar: CookieJar,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    if gate.is_authenticated(&jar) {
        return next.run(request).await;
    }

    if request.uri().path().starts_with("/api/") {
        (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    } else {
        Redirect::to("/login").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_gate_accepts_anything() {
        let gate = LoginGate::new("").unwrap();
        assert!(!gate.enabled());
        assert!(gate.verify("whatever"));
        assert!(gate.is_authenticated(&CookieJar::new()));
    }

    #[test]
    fn password_check_and_sessions() {
        let gate = LoginGate::new("hunter2").unwrap();
        assert!(gate.enabled());
        assert!(gate.verify("hunter2"));
        assert!(!gate.verify("hunter3"));
        assert!(!gate.is_authenticated(&CookieJar::new()));

        let id = gate.create_session();
        assert!(gate.validate_session(&id));
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, id.clone()));
        assert!(gate.is_authenticated(&jar));

        gate.end_session(&id);
        assert!(!gate.validate_session(&id));
        assert!(!gate.validate_session("not-a-session"));
    }
}
