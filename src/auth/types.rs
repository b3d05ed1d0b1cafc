//! Request and response types for auth API calls. Login and registration
//! payloads carry passwords and tokens, so their `Debug` output is redacted and
//! they must never be logged.

use crate::errors::AppError;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, sync::LazyLock};

/// Minimum password length accepted by registration.
pub const MIN_PASSWORD_CHARS: usize = 6;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Backend user identifier; numeric or string depending on the deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
    /// Any role this client does not know about; never admitted as admin.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("USER"),
            Self::Admin => f.write_str("ADMIN"),
            Self::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Opaque backend-issued credential.
#[derive(Clone)]
pub struct Token(SecretString);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Raw token value, for the `Authorization` header and the credential store only.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Token {}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// `GET /api/auth/me` answers with either a bare user or `{ "user": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum MeResponse {
    Wrapped { user: User },
    Bare(User),
}

impl From<MeResponse> for User {
    fn from(response: MeResponse) -> Self {
        match response {
            MeResponse::Wrapped { user } | MeResponse::Bare(user) => user,
        }
    }
}

#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    /// Copy with surrounding whitespace removed from the email.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }

    /// # Errors
    /// Returns `AppError::Validation` for a malformed email or an empty password.
    pub fn validate(&self) -> Result<(), AppError> {
        validate_email(&self.email)?;
        if self.password.trim().is_empty() {
            return Err(AppError::Validation(
                "Email and password are required.".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RegisterRequest {
    /// Copy with the email and display name trimmed.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            name: self.name.as_ref().map(|name| name.trim().to_string()),
        }
    }

    /// # Errors
    /// Returns `AppError::Validation` for a malformed email or a short password.
    pub fn validate(&self) -> Result<(), AppError> {
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_CHARS} characters."
            )));
        }
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            return Err(AppError::Validation("Name must not be blank.".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .field("name", &self.name)
            .finish()
    }
}

/// Successful login or registration.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: Token,
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required.".to_string(),
        ));
    }
    let valid = EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email));
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "'{email}' is not a valid email address."
        )))
    }
}
