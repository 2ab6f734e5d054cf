//! REST API client module for the reqres user-management API.
//!
//! This module provides the `ApiClient` for logging in and for listing,
//! reading, updating and deleting users.
//!
//! Login exchanges an email and password for an opaque token. The demo API
//! does not require the token on later calls; the client sends it as a
//! bearer token anyway once it is set.

pub mod client;
pub mod error;

pub use client::{user_message, ApiClient};
pub use error::ApiError;
