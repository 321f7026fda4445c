//! The authentication collaborator.
//!
//! # Design
//! Authentication is owned by an external session library. This module only
//! speaks its contract: sign in, sign up, sign out and read the current
//! session. No token is stored here; the session cookie set by the server
//! lives in the transport's cookie jar, which is why `SessionAuthClient`
//! and `TaskClient` should share one transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::client::{RequestOptions, TaskClient};
use crate::config::ClientConfig;
use crate::error::{ApiError, EmptyMessage, NormalizedError, UNEXPECTED_ERROR};
use crate::http::{HttpMethod, HttpResponse};
use crate::transport::{Transport, UreqTransport};

/// Shortest password the auth provider accepts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const SIGN_IN_PATH: &str = "/api/auth/sign-in/email";
const SIGN_UP_PATH: &str = "/api/auth/sign-up/email";
const SIGN_OUT_PATH: &str = "/api/auth/sign-out";
const SESSION_PATH: &str = "/api/auth/get-session";

/// Stable contract of the authentication provider.
pub trait AuthProvider {
    fn sign_in(&self, credentials: &Credentials) -> Result<Session, ApiError>;
    fn sign_up(&self, sign_up: &SignUp) -> Result<Session, ApiError>;
    fn sign_out(&self) -> Result<(), ApiError>;
    /// `Ok(None)` when nobody is signed in.
    fn current_session(&self) -> Result<Option<Session>, ApiError>;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Validate)]
pub struct Credentials {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Validate locally, reporting the first failing field.
    pub fn check(&self) -> Result<(), ApiError> {
        self.validate()
            .map_err(|e| first_failure(&e, &["email", "password"]))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Validate)]
pub struct SignUp {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub name: String,
}

impl SignUp {
    pub fn check(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("Name is required".to_string()));
        }
        self.validate()
            .map_err(|e| first_failure(&e, &["email", "password"]))
    }
}

/// Turn `errors` into one message, looking at `fields` in order.
fn first_failure(errors: &ValidationErrors, fields: &[&'static str]) -> ApiError {
    let by_field = errors.field_errors();
    let message = fields
        .iter()
        .filter_map(|field| by_field.get(field))
        .flat_map(|errs| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string());
    ApiError::Validation(message)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// A signed-in session as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: AuthUser,
    pub expires_at: DateTime<Utc>,
}

/// Wire shape shared by sign-in, sign-up and get-session.
#[derive(Debug, Deserialize)]
struct SessionEnvelope {
    session: SessionRecord,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    token: String,
    expires_at: DateTime<Utc>,
}

impl From<SessionEnvelope> for Session {
    fn from(envelope: SessionEnvelope) -> Self {
        Session {
            token: envelope.session.token,
            user: envelope.user,
            expires_at: envelope.session.expires_at,
        }
    }
}

/// `AuthProvider` backed by the session library's HTTP endpoints.
#[derive(Debug, Clone)]
pub struct SessionAuthClient<T = UreqTransport> {
    http: TaskClient<T>,
}

impl SessionAuthClient<UreqTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> SessionAuthClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            http: TaskClient::with_transport(config, transport),
        }
    }

    fn call(
        &self,
        path: &str,
        options: RequestOptions,
        fallback: &str,
    ) -> Result<HttpResponse, ApiError> {
        let response = self.http.send(self.http.build_request(path, options))?;
        if response.is_ok() {
            return Ok(response);
        }
        Err(ApiError::Status(NormalizedError::normalize(
            response.status,
            &response.body,
            "message",
            UNEXPECTED_ERROR,
            fallback,
            EmptyMessage::Fallback,
        )))
    }
}

fn decode<R: serde::de::DeserializeOwned>(response: &HttpResponse) -> Result<R, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

impl<T: Transport> AuthProvider for SessionAuthClient<T> {
    fn sign_in(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        credentials.check()?;
        let options = RequestOptions::new(HttpMethod::Post).json(credentials)?;
        let response = self.call(SIGN_IN_PATH, options, "Sign-in failed")?;
        let envelope: SessionEnvelope = decode(&response)?;
        log::info!("signed in as {}", envelope.user.email);
        Ok(envelope.into())
    }

    fn sign_up(&self, sign_up: &SignUp) -> Result<Session, ApiError> {
        sign_up.check()?;
        let options = RequestOptions::new(HttpMethod::Post).json(sign_up)?;
        let response = self.call(SIGN_UP_PATH, options, "Registration failed")?;
        let envelope: SessionEnvelope = decode(&response)?;
        log::info!("registered {}", envelope.user.email);
        Ok(envelope.into())
    }

    fn sign_out(&self) -> Result<(), ApiError> {
        self.call(
            SIGN_OUT_PATH,
            RequestOptions::new(HttpMethod::Post),
            "Sign-out failed",
        )?;
        Ok(())
    }

    fn current_session(&self) -> Result<Option<Session>, ApiError> {
        let response = self.call(
            SESSION_PATH,
            RequestOptions::new(HttpMethod::Get),
            "Request failed",
        )?;
        let envelope: Option<SessionEnvelope> = decode(&response)?;
        Ok(envelope.map(Session::from))
    }
}
