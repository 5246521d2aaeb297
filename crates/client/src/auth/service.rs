//! Login, 2FA verification, and logout against the ordering API.
//!
//! This service owns the credential lifecycle: it is the only code that
//! populates the [`CredentialStore`], and logout is the only operation
//! that clears it deliberately (the gateway clears it reactively on an
//! authoritative 401).

use std::sync::Arc;

use serde_json::{Value, json};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::api::{ApiClient, ApiError, RequestOptions};

use super::credentials::{CredentialStore, UserProfile};

/// Errors from the authentication flow.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A 2xx login/verify response did not carry a token.
    #[error("authentication response did not include a token")]
    MissingToken,
}

/// Result of a login attempt.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Token stored; the profile is cached when the server returned one.
    Authenticated {
        /// Profile echoed by the server, if any.
        user: Option<UserProfile>,
    },
    /// The account requires a 2FA code. Nothing was stored; an existing
    /// session (if any) is untouched.
    TwoFactorRequired,
}

/// Result of a logout.
///
/// Local state is always cleared; `server_acknowledged` records whether
/// the best-effort server call also succeeded.
#[derive(Debug, Clone, Copy)]
pub struct LogoutOutcome {
    /// Whether the server acknowledged the logout.
    pub server_acknowledged: bool,
}

/// Authentication service over the request gateway.
pub struct AuthService {
    api: ApiClient,
    credentials: Arc<CredentialStore>,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(api: ApiClient, credentials: Arc<CredentialStore>) -> Self {
        Self { api, credentials }
    }

    /// Login with email and password.
    ///
    /// A 401 here is the login failure itself, not a session expiry: the
    /// gateway never purges credentials on the login path, so a failed
    /// re-login cannot wipe an unrelated existing session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Api` with the server's specific reason on
    /// rejected credentials or an inactive account, and
    /// `AuthError::MissingToken` on a malformed success response.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let body = self
            .api
            .post(
                "/api/auth/login",
                json!({ "email": email, "password": password }),
            )
            .await?;

        if requires_two_factor(&body) {
            return Ok(LoginOutcome::TwoFactorRequired);
        }
        self.store_session(&body)
    }

    /// Submit the 2FA code for a pending login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Api` on a rejected or expired code, and
    /// `AuthError::MissingToken` on a malformed success response.
    #[instrument(skip(self, code), fields(email = %email))]
    pub async fn verify_2fa(&self, email: &str, code: &str) -> Result<LoginOutcome, AuthError> {
        let body = self
            .api
            .post(
                "/api/auth/verify-2fa",
                json!({ "email": email, "code": code }),
            )
            .await?;
        self.store_session(&body)
    }

    /// Refresh the cached profile from the server.
    ///
    /// Tolerated to fail: on any error the cached profile stays stale
    /// and `None` is returned.
    #[instrument(skip(self))]
    pub async fn refresh_profile(&self) -> Option<UserProfile> {
        let body = match self.api.get("/api/users/me").await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "profile refresh failed; keeping cached profile");
                return None;
            }
        };
        let profile = parse_profile(&body)?;
        self.credentials.set_user(&profile);
        Some(profile)
    }

    /// Logout: best-effort server call, unconditional local purge.
    ///
    /// The server call is a single bare attempt with no retry; its
    /// failure never fails the caller.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> LogoutOutcome {
        let server_acknowledged = match self
            .api
            .request(
                "/api/auth/logout",
                RequestOptions {
                    method: Some(reqwest::Method::POST),
                    skip_retry: true,
                    ..RequestOptions::default()
                },
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "server logout failed; clearing local session anyway");
                false
            }
        };

        self.credentials.logout_local();
        LogoutOutcome {
            server_acknowledged,
        }
    }

    fn store_session(&self, body: &Value) -> Result<LoginOutcome, AuthError> {
        let token = extract_token(body).ok_or(AuthError::MissingToken)?;
        self.credentials.set_token(token);

        let user = parse_profile(body);
        if let Some(profile) = &user {
            self.credentials.set_user(profile);
        }
        Ok(LoginOutcome::Authenticated { user })
    }
}

fn requires_two_factor(body: &Value) -> bool {
    body.get("requires_2fa")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn extract_token(body: &Value) -> Option<&str> {
    ["token", "access_token"]
        .iter()
        .find_map(|field| body.get(field))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
}

fn parse_profile(body: &Value) -> Option<UserProfile> {
    let raw = body.get("user").unwrap_or(body);
    serde_json::from_value(raw.clone()).ok()
}
