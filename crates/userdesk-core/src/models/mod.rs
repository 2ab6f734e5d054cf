//! Data models for the user-management API.
//!
//! - `User`, `UsersPage`, `UserEnvelope`: records returned by the API
//! - `UserUpdate`: edit form payload with validation
//! - `Credentials`: login request body

pub mod user;

pub use user::{Credentials, User, UserEnvelope, UserUpdate, UsersPage, ValidationError};
