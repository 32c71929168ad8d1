use tasarruf_types::{Admin, ForgetPasswordRequest, LoginRequest, LoginResponse};
use thiserror::Error;

use crate::api::{ApiClient, ApiRequest, ApiResult, FetchError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This account is not allowed to use the admin console")]
    NotAuthorized,
}

/// Login and identity for the operator console.
///
/// This struct handles:
/// - Email/password login, restricted to admin accounts
/// - Token lookup (memory first, then durable storage)
/// - Lazy fetch and caching of the admin profile
/// - Password recovery and logout
#[derive(Clone)]
pub struct AuthService {
    api_client: ApiClient,
}

impl AuthService {
    pub fn new(api_client: ApiClient) -> Self {
        Self { api_client }
    }

    /// Logs in with email and password.
    ///
    /// # Returns
    ///
    /// - `Ok(token)` for an admin account; the token is kept in memory and in
    ///   durable storage, and the returned profile is cached
    /// - `Err(AuthError::NotAuthorized)` if the server accepted the
    ///   credentials but the account is not an admin; nothing is stored
    /// - `Err(AuthError::InvalidCredentials)` for any other failure
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        log::info!("Logging in as {}", email);

        let request = ApiRequest::post("/public/email-login")
            .public()
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .map_err(|e| {
                log::error!("Failed to encode login request: {}", e);
                AuthError::InvalidCredentials
            })?;

        let envelope = self.api_client.execute(&request).await.map_err(|e| {
            log::warn!("Login failed: {}", e);
            AuthError::InvalidCredentials
        })?;

        let response: LoginResponse = serde_json::from_value(envelope).map_err(|e| {
            log::warn!("Login response could not be decoded: {}", e);
            AuthError::InvalidCredentials
        })?;

        if !response.user.account_type.is_admin() {
            log::warn!(
                "Rejected login for {}: account type is {}",
                email,
                response.user.account_type.as_str()
            );
            return Err(AuthError::NotAuthorized);
        }

        log::info!("Logged in as admin {}", response.user.email);
        let token = response.token;
        self.api_client
            .session()
            .establish(token.clone(), response.user);
        Ok(token)
    }

    /// The current session token, if any. Never performs a network call.
    pub fn get_token(&self) -> Option<String> {
        self.api_client.session().token()
    }

    pub fn is_logged_in(&self) -> bool {
        self.get_token().is_some()
    }

    /// Returns the logged in admin's profile, fetching it on first use.
    pub async fn get_user(&self) -> Result<Admin, FetchError> {
        let session = self.api_client.session();
        if let Some(admin) = session.admin() {
            return Ok(admin);
        }
        if !session.has_token() {
            return Err(FetchError::Unauthenticated);
        }

        let admin: Admin = self
            .api_client
            .fetch(ApiRequest::get("/user"), "user")
            .await
            .map_err(|e| {
                log::error!("Error getting admin profile: {}", e);
                FetchError::from(e)
            })?;
        session.cache_admin(admin.clone());
        Ok(admin)
    }

    /// Asks the backend to text a one-time password to `mobile`.
    ///
    /// Returns the server's confirmation message. Client state is untouched.
    pub async fn recover_password(&self, mobile: &str) -> ApiResult<String> {
        let request = ApiRequest::post("/public/admin/forget-password")
            .public()
            .json(&ForgetPasswordRequest {
                mobile: mobile.to_string(),
            })?
            .idempotent();
        self.api_client.fetch(request, "success").await
    }

    /// Forgets the session locally. The backend keeps no logout endpoint.
    pub fn logout(&self) {
        self.api_client.session().invalidate();
    }

    /// Gets a reference to the API client.
    pub fn api_client(&self) -> &ApiClient {
        &self.api_client
    }
}
