//! Wire types for the authentication and user endpoints

use haven_core::CredentialPair;
use serde::{Deserialize, Serialize};

/// Token issuance request
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Token issuance response
#[derive(Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl From<TokenPair> for CredentialPair {
    fn from(pair: TokenPair) -> Self {
        Self::new(pair.access, pair.refresh)
    }
}

/// Token refresh request
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Token refresh response
///
/// Only the access token is read; a rotated refresh token, if the backend
/// sends one, is ignored.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    pub access: String,
}

/// Account registration request
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Confirmation, must equal `password`
    pub password2: String,
}

/// User profile as returned by the registration and profile endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    /// Any additional profile fields the backend exposes
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Partial profile update
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Password reset email request
#[derive(Debug, Serialize)]
pub struct PasswordResetRequest<'a> {
    pub email: &'a str,
}

/// Password reset confirmation
#[derive(Debug, Serialize)]
pub struct PasswordResetConfirm<'a> {
    pub uid: &'a str,
    pub token: &'a str,
    pub password: &'a str,
}

/// Plain acknowledgement body
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// One page of a paginated list
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    /// Absolute URL of the next page
    pub next: Option<String>,
    /// Absolute URL of the previous page
    pub previous: Option<String>,
    pub results: Vec<T>,
}
