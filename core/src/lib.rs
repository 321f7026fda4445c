//! Blocking API client for the task service.
//!
//! # Overview
//! `TaskClient` turns task operations into plain-data `HttpRequest` values,
//! sends each through a `Transport` exactly once, and decodes the
//! `HttpResponse`. Every non-2xx response is normalized into a single display
//! message whatever error body the backend produced.
//!
//! # Design
//! - `TaskClient` is stateless; it holds only the base URL and the transport.
//!   Build one at startup and pass it to consumers.
//! - Each operation has a `build_*` method so requests can be inspected
//!   without I/O, and a call method that dispatches it.
//! - `UreqTransport` is the default transport. Its cookie jar carries the
//!   session set by `SessionAuthClient`, so the two should share it.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use auth::{AuthProvider, AuthUser, Credentials, Session, SessionAuthClient, SignUp};
pub use client::{RequestOptions, TaskClient};
pub use config::ClientConfig;
pub use error::{ApiError, NormalizedError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{Task, TaskCreate, TaskList, TaskUpdate};
