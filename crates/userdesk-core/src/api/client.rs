//! API client for the reqres user-management REST API.
//!
//! Every call is made once. Failures are returned to the caller to surface;
//! nothing here retries.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, info};

use crate::models::{Credentials, User, UserEnvelope, UserUpdate, UsersPage};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Header carrying the optional API key
const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
    error: Option<String>,
}

/// API client for the user-management service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client for `base_url` (e.g. `https://reqres.in/api`)
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: Option<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json");
        if let Some(ref key) = self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        if let Some(ref token) = self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to {}", what))?;
        Self::check_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let response = self.send(self.request(Method::GET, path), what).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            .with_context(|| format!("Failed to parse response for {}", what))
    }

    // ===== Authentication =====

    /// Exchange credentials for a session token.
    pub async fn login(&self, credentials: &Credentials) -> Result<String> {
        info!(email = %credentials.email, "Logging in");

        let builder = self.request(Method::POST, "login").json(credentials);
        let response = self.send(builder, "send login request").await?;

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            .context("Failed to parse login response")?;

        match (body.token, body.error) {
            (Some(token), _) if !token.is_empty() => Ok(token),
            (_, Some(error)) => Err(ApiError::BadRequest(error).into()),
            _ => Err(ApiError::InvalidResponse("Login response had no token".to_string()).into()),
        }
    }

    // ===== Users =====

    /// Fetch one page of users (pages start at 1)
    pub async fn list_users(&self, page: u32) -> Result<UsersPage> {
        let page = page.max(1);
        debug!(page, "Fetching users");
        self.get(&format!("users?page={}", page), "fetch users").await
    }

    /// Fetch a single user
    pub async fn get_user(&self, id: u64) -> Result<User> {
        debug!(id, "Fetching user");
        let envelope: UserEnvelope = self.get(&format!("users/{}", id), "fetch user").await?;
        Ok(envelope.data)
    }

    /// Replace a user's name and email
    pub async fn update_user(&self, id: u64, update: &UserUpdate) -> Result<()> {
        debug!(id, "Updating user");
        let builder = self.request(Method::PUT, &format!("users/{}", id)).json(update);
        self.send(builder, "update user").await?;
        Ok(())
    }

    /// Delete a user
    pub async fn delete_user(&self, id: u64) -> Result<()> {
        debug!(id, "Deleting user");
        let builder = self.request(Method::DELETE, &format!("users/{}", id));
        self.send(builder, "delete user").await?;
        Ok(())
    }
}

/// Best user-facing message for an error returned by this client.
pub fn user_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<ApiError>() {
        Some(api) => api.user_message(),
        None => error.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
