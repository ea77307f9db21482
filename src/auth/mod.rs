//! Identity module
//!
//! Account registration, PIN login, PIN change and logout. Hands verified
//! account ids to the rest of the system; the ledger itself never sees PINs.

mod credentials;
mod session;

use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::{AccountId, NewAccount};
use crate::store::{SharedStore, StoreError};

pub use credentials::{hash_pin, is_valid_email, is_valid_phone, is_valid_pin};
pub use session::SessionManager;

/// Identity errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("Email or phone number already registered")]
    AlreadyRegistered,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid PIN")]
    InvalidPin,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Registration request
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub number: String,
    pub pin: String,
}

impl Registration {
    /// Check every field; the first failure is reported.
    pub fn validate(&self) -> Result<(), AuthError> {
        let fields = [
            ("name", &self.name),
            ("email", &self.email),
            ("number", &self.number),
            ("pin", &self.pin),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(AuthError::InvalidRegistration(format!("{field} is required")));
        }

        if !is_valid_email(&self.email) {
            return Err(AuthError::InvalidRegistration("malformed email".to_string()));
        }
        if !is_valid_phone(&self.number) {
            return Err(AuthError::InvalidRegistration(
                "phone number must be 10 to 15 digits".to_string(),
            ));
        }
        if !is_valid_pin(&self.pin) {
            return Err(AuthError::InvalidRegistration("PIN must be 4 digits".to_string()));
        }
        Ok(())
    }
}

/// Issued on successful login
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub account_id: AccountId,
    pub token: String,
}

/// Registration, login and PIN management over the account directory
#[derive(Clone)]
pub struct AuthService {
    store: SharedStore,
    sessions: Arc<SessionManager>,
}

impl AuthService {
    pub fn new(store: SharedStore, sessions: Arc<SessionManager>) -> Self {
        Self { store, sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub async fn register(&self, registration: Registration) -> Result<AccountId, AuthError> {
        registration.validate()?;

        let account = NewAccount {
            name: registration.name.trim().to_string(),
            email: registration.email,
            number: registration.number,
            pin_hash: hash_pin(&registration.pin),
        };

        match self.store.register_account(&account).await {
            Ok(account_id) => {
                tracing::info!(account_id, "Account registered");
                Ok(account_id)
            }
            Err(StoreError::Duplicate(_)) => Err(AuthError::AlreadyRegistered),
            Err(err) => {
                tracing::error!(error = %err, "Registration failed");
                Err(err.into())
            }
        }
    }

    /// Resolve email or phone number plus PIN, and open a session.
    pub async fn login(&self, identifier: &str, pin: &str) -> Result<LoginSession, AuthError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || !is_valid_pin(pin) {
            return Err(AuthError::InvalidCredentials);
        }

        let account_id = self
            .store
            .find_account_by_credentials(identifier, &hash_pin(pin))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let token = self
            .sessions
            .create(account_id)
            .ok_or(AuthError::InvalidCredentials)?;

        tracing::info!(account_id, "Login succeeded");
        Ok(LoginSession { account_id, token })
    }

    pub async fn change_pin(
        &self,
        account_id: AccountId,
        old_pin: &str,
        new_pin: &str,
    ) -> Result<(), AuthError> {
        if account_id <= 0 || !is_valid_pin(old_pin) || !is_valid_pin(new_pin) {
            return Err(AuthError::InvalidPin);
        }

        let changed = self
            .store
            .update_pin(account_id, &hash_pin(old_pin), &hash_pin(new_pin))
            .await?;
        if !changed {
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(account_id, "PIN changed");
        Ok(())
    }

    /// Returns whether a session was open.
    pub fn logout(&self, account_id: AccountId) -> bool {
        self.sessions.invalidate(account_id)
    }
}
