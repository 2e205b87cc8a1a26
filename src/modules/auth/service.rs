use std::time::Instant;

use serde::Serialize;

use super::error::{AuthError, Field};
use super::password::{hash_password, verify_password};
use super::store::{exists, find_by_username, CredentialStore, UserRecord};
use super::tokens::TokenService;
use super::validation::{validate_name, validate_password, validate_username};
use crate::modules::config::{AuthConfig, ConfigError};
use crate::modules::utils::logging::log_auth_event;
use crate::modules::utils::time::format_timestamp;

pub const SIGNUP_MESSAGE: &str = "SignUp success. Please proceed to Signin";
pub const SIGNIN_MESSAGE: &str = "Signin success";

/// Profile returned by `whoami`
///
/// Includes the stored password digest.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    #[serde(rename = "fname")]
    pub first_name: String,
    #[serde(rename = "lname")]
    pub last_name: String,
    #[serde(rename = "password")]
    pub password_hash: String,
}

impl From<&UserRecord> for Profile {
    fn from(user: &UserRecord) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            password_hash: user.password_hash.clone(),
        }
    }
}

/// Signup, signin and whoami over a credential store and a token service
pub struct AuthService {
    store: CredentialStore,
    tokens: TokenService,
}

impl AuthService {
    /// Build the service with the JSON file store named in `config`
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        Self::with_store(config, CredentialStore::json_file(&config.users_file))
    }

    /// Build the service over an explicit store
    pub fn with_store(config: &AuthConfig, store: CredentialStore) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store,
            tokens: TokenService::from_config(config)?,
        })
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register a new account
    ///
    /// Fields are checked in order username, password, first name, last name;
    /// the first failure is reported.
    pub fn signup(
        &self,
        username: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<&'static str, AuthError> {
        self.signup_before(username, password, first_name, last_name, None)
    }

    /// `signup` that fails with `AuthError::Timeout`, writing nothing, if
    /// `deadline` passes before the new record is saved
    pub fn signup_before(
        &self,
        username: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        deadline: Option<Instant>,
    ) -> Result<&'static str, AuthError> {
        let checks = [
            (Field::Username, validate_username(username)),
            (Field::Password, validate_password(password)),
            (Field::FirstName, validate_name(first_name)),
            (Field::LastName, validate_name(last_name)),
        ];
        if let Some((field, _)) = checks.iter().find(|(_, valid)| !valid) {
            log_auth_event("signup", username, false, Some(&format!("invalid {}", field)));
            return Err(AuthError::InvalidField(*field));
        }

        let result = self.store.update_before(deadline, |users| {
            if exists(users, username) {
                return Err(AuthError::UserExists);
            }
            users.push(UserRecord {
                username: username.to_string(),
                password_hash: hash_password(password),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            });
            Ok(())
        });

        match &result {
            Ok(()) => log_auth_event("signup", username, true, None),
            Err(e) => log_auth_event("signup", username, false, Some(e.kind())),
        }
        result.map(|()| SIGNUP_MESSAGE)
    }

    /// Check credentials and issue a session token
    ///
    /// Wrong username and wrong password fail identically.
    pub fn signin(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let users = self.store.load()?;

        let user = find_by_username(&users, username)
            .filter(|u| verify_password(password, &u.password_hash));

        match user {
            Some(user) => {
                let token = self.tokens.issue(&user.username, &user.first_name);
                log_auth_event("signin", username, true, None);
                Ok(token)
            }
            None => {
                log_auth_event("signin", username, false, Some("invalid credentials"));
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Resolve the account behind a credential header
    ///
    /// Accepts a raw token or `Bearer <token>`.
    pub fn whoami(&self, credential_header: Option<&str>) -> Result<Profile, AuthError> {
        let header = match credential_header {
            Some(value) if !value.trim().is_empty() => value,
            _ => return Err(AuthError::MissingToken),
        };

        let claims = self.tokens.verify(TokenService::strip_bearer(header))?;
        log::debug!(
            "Token for {} expires at {}",
            claims.subject,
            format_timestamp(claims.expires_at)
        );

        let users = self.store.load()?;
        match find_by_username(&users, &claims.subject) {
            Some(user) => {
                log_auth_event("whoami", &claims.subject, true, None);
                Ok(Profile::from(user))
            }
            None => {
                // Account removed after the token was issued
                log_auth_event("whoami", &claims.subject, false, Some("user not found"));
                Err(AuthError::UserNotFound)
            }
        }
    }
}
