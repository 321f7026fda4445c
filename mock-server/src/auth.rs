//! Email/password session endpoints.
//!
//! Sessions are opaque tokens handed out in a `session_token` cookie and
//! valid for seven days. Passwords are kept in plain text; this server only
//! exists for tests and local development.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::AppState;

pub const SESSION_COOKIE: &str = "session_token";
pub const MIN_PASSWORD_LENGTH: usize = 8;
const SESSION_DAYS: i64 = 7;

#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    password: String,
}

#[derive(Clone, Debug)]
struct SessionEntry {
    email: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct Accounts {
    users: HashMap<String, User>,
    sessions: HashMap<String, SessionEntry>,
}

pub type AuthStore = Arc<RwLock<Accounts>>;

#[derive(Deserialize)]
pub struct SignUpBody {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
pub struct SignInBody {
    pub email: String,
    pub password: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/sign-up/email", post(sign_up))
        .route("/api/auth/sign-in/email", post(sign_in))
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/auth/get-session", get(get_session))
}

fn failure(status: StatusCode, message: &str, code: &str) -> Response {
    (status, Json(json!({ "message": message, "code": code }))).into_response()
}

fn envelope(token: &str, entry: &SessionEntry, user: &User) -> Value {
    json!({
        "session": {
            "token": token,
            "expiresAt": entry.expires_at,
            "userId": user.id,
        },
        "user": {
            "id": user.id,
            "email": user.email,
            "name": user.name,
            "emailVerified": false,
        },
    })
}

/// Open a session for `user` and answer with the cookie and envelope.
fn open_session(accounts: &mut Accounts, user: &User, status: StatusCode) -> Response {
    let token = Uuid::new_v4().simple().to_string();
    let entry = SessionEntry {
        email: user.email.clone(),
        expires_at: Utc::now() + Duration::days(SESSION_DAYS),
    };
    let body = envelope(&token, &entry, user);
    accounts.sessions.insert(token.clone(), entry);
    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    (status, [(header::SET_COOKIE, cookie)], Json(body)).into_response()
}

/// Extract the session token from the `Cookie` header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

async fn sign_up(State(state): State<AppState>, Json(body): Json<SignUpBody>) -> Response {
    if body.password.chars().count() < MIN_PASSWORD_LENGTH {
        return failure(StatusCode::BAD_REQUEST, "Password too short", "PASSWORD_TOO_SHORT");
    }
    let email = body.email.trim().to_lowercase();
    let mut accounts = state.auth.write().await;
    if accounts.users.contains_key(&email) {
        return failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            "User already exists",
            "USER_ALREADY_EXISTS",
        );
    }
    let user = User {
        id: Uuid::new_v4(),
        email: email.clone(),
        name: body.name,
        password: body.password,
    };
    accounts.users.insert(email, user.clone());
    log::info!("registered user {}", user.id);
    open_session(&mut accounts, &user, StatusCode::OK)
}

async fn sign_in(State(state): State<AppState>, Json(body): Json<SignInBody>) -> Response {
    let email = body.email.trim().to_lowercase();
    let mut accounts = state.auth.write().await;
    let user = match accounts.users.get(&email) {
        Some(user) if user.password == body.password => user.clone(),
        _ => {
            return failure(
                StatusCode::UNAUTHORIZED,
                "Invalid email or password",
                "INVALID_EMAIL_OR_PASSWORD",
            )
        }
    };
    open_session(&mut accounts, &user, StatusCode::OK)
}

async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.auth.write().await.sessions.remove(&token);
    }
    let cookie = format!("{SESSION_COOKIE}=; Path=/; Max-Age=0");
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true })),
    )
        .into_response()
}

async fn get_session(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let Some(token) = session_token(&headers) else {
        return Json(Value::Null);
    };
    let accounts = state.auth.read().await;
    let found = accounts
        .sessions
        .get(&token)
        .filter(|entry| entry.expires_at > Utc::now())
        .and_then(|entry| accounts.users.get(&entry.email).map(|user| (entry, user)));
    match found {
        Some((entry, user)) => Json(envelope(&token, entry, user)),
        None => Json(Value::Null),
    }
}
