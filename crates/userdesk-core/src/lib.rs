//! Core library for userdesk.
//!
//! Holds everything that does not depend on the terminal:
//!
//! - `auth`: session storage, token validation and the route guard
//! - `api`: client for the reqres user-management API
//! - `models`: user records and request payloads
//! - `config`: persisted application configuration
//! - `utils`: string helpers shared by the UI

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;
