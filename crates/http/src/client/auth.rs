//! Authentication and account endpoints

use super::{ApiRequest, AuthenticatedClient, ClientError, PublicClient};
use crate::types::{
    LoginRequest, MessageResponse, PasswordResetConfirm, PasswordResetRequest, ProfileUpdate,
    RegisterRequest, TokenPair, UserProfile,
};
use haven_core::CredentialPair;
use tracing::info;

const TOKEN_PATH: &str = "/api/token/";
const USERS_PATH: &str = "/users/";
const PROFILE_PATH: &str = "/users/profile/";
const PASSWORD_RESET_PATH: &str = "/users/password_reset/";
const PASSWORD_RESET_VERIFY_PATH: &str = "/users/password_reset/verify/";
const PASSWORD_RESET_CONFIRM_PATH: &str = "/users/password_reset/confirm/";

fn require(value: &str, message: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        Err(ClientError::Validation(message.to_string()))
    } else {
        Ok(())
    }
}

/// Account endpoints that need no credentials
impl PublicClient {
    /// Exchange a username and password for a token pair
    pub async fn obtain_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenPair, ClientError> {
        if username.trim().is_empty() || password.trim().is_empty() {
            return Err(ClientError::Validation(
                "Please enter both username and password.".into(),
            ));
        }
        let request = ApiRequest::post(TOKEN_PATH).json(&LoginRequest { username, password })?;
        self.execute(&request).await
    }

    /// Create an account
    pub async fn register(&self, registration: &RegisterRequest) -> Result<UserProfile, ClientError> {
        require(&registration.username, "Username cannot be empty.")?;
        require(&registration.email, "Email cannot be empty.")?;
        require(&registration.password, "Password cannot be empty.")?;
        if registration.password != registration.password2 {
            return Err(ClientError::Validation("Passwords do not match.".into()));
        }
        let request = ApiRequest::post(USERS_PATH).json(registration)?;
        self.execute(&request).await
    }

    /// Ask for a password reset link to be mailed to `email`
    ///
    /// The backend answers the same way whether or not the address is known.
    pub async fn request_password_reset(&self, email: &str) -> Result<MessageResponse, ClientError> {
        require(email, "Email cannot be empty.")?;
        let request =
            ApiRequest::post(PASSWORD_RESET_PATH).json(&PasswordResetRequest { email })?;
        self.execute(&request).await
    }

    /// Check that a reset link is still valid
    pub async fn verify_password_reset(
        &self,
        uid: &str,
        token: &str,
    ) -> Result<MessageResponse, ClientError> {
        require(uid, "UID and token are required.")?;
        require(token, "UID and token are required.")?;
        let request = ApiRequest::post(PASSWORD_RESET_VERIFY_PATH)
            .query("uid", uid)
            .query("token", token);
        self.execute(&request).await
    }

    /// Set a new password using a reset link
    pub async fn confirm_password_reset(
        &self,
        uid: &str,
        token: &str,
        password: &str,
    ) -> Result<MessageResponse, ClientError> {
        require(uid, "UID and token are required.")?;
        require(token, "UID and token are required.")?;
        require(password, "Password cannot be empty.")?;
        let request = ApiRequest::post(PASSWORD_RESET_CONFIRM_PATH).json(&PasswordResetConfirm {
            uid,
            token,
            password,
        })?;
        self.execute(&request).await
    }
}

/// Session lifecycle and profile endpoints
impl AuthenticatedClient {
    /// Log in and persist the issued credential pair
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let pair: CredentialPair = self.public().obtain_token(username, password).await?.into();
        self.credentials().store_pair(&pair)?;
        info!(username, "Logged in");
        Ok(())
    }

    /// Forget both stored tokens
    pub fn logout(&self) -> Result<(), ClientError> {
        self.credentials().purge()?;
        info!("Logged out");
        Ok(())
    }

    /// Whether a complete credential pair is stored
    pub fn is_logged_in(&self) -> Result<bool, ClientError> {
        Ok(self.credentials().pair()?.is_some())
    }

    /// Fetch the current user's profile
    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        self.execute(&ApiRequest::get(PROFILE_PATH)).await
    }

    /// Update the current user's profile
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ClientError> {
        let request = ApiRequest::patch(PROFILE_PATH).json(update)?;
        self.execute(&request).await
    }
}
