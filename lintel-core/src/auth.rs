// Authentication collaborators consumed by the lifecycle

use crate::{Error, HttpRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who is making the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub subject: String,
    pub roles: Vec<String>,
    /// Headers to send back with the response, e.g. a refreshed token.
    #[serde(default)]
    pub response_headers: Vec<(String, String)>,
}

impl AuthInfo {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_response_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response_headers.push((name.into(), value.into()));
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Identity behind a validated API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyInfo {
    pub key_id: String,
    pub owner: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("authentication backend unavailable: {0}")]
    Unavailable(String),
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials(msg) => Error::Unauthorized(msg),
            AuthError::Unavailable(msg) => Error::AuthProvider(msg),
        }
    }
}

/// Resolves the caller's identity from the request.
///
/// `Ok(None)` means the request carries no credentials.
#[async_trait]
pub trait AuthenticationInfoProvider: Send + Sync {
    async fn get(&self, request: &HttpRequest) -> Result<Option<AuthInfo>, AuthError>;
}

/// Validates an API key. `Ok(None)` means the key is unknown.
#[async_trait]
pub trait ApiKeyInfoProvider: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<ApiKeyInfo>, AuthError>;
}

/// Roles a resource demands from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleRequirement {
    /// No role check.
    #[default]
    None,
    /// At least one of the roles.
    Any(Vec<String>),
    /// Every role.
    All(Vec<String>),
}

impl RoleRequirement {
    pub fn any<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RoleRequirement::Any(roles.into_iter().map(Into::into).collect())
    }

    pub fn all<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RoleRequirement::All(roles.into_iter().map(Into::into).collect())
    }

    pub fn is_required(&self) -> bool {
        match self {
            RoleRequirement::None => false,
            RoleRequirement::Any(roles) | RoleRequirement::All(roles) => !roles.is_empty(),
        }
    }

    pub fn is_satisfied_by(&self, auth: &AuthInfo) -> bool {
        match self {
            RoleRequirement::None => true,
            RoleRequirement::Any(roles) => {
                roles.is_empty() || roles.iter().any(|role| auth.has_role(role))
            }
            RoleRequirement::All(roles) => roles.iter().all(|role| auth.has_role(role)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RoleRequirement::None => String::new(),
            RoleRequirement::Any(roles) => format!("one of [{}]", roles.join(", ")),
            RoleRequirement::All(roles) => format!("all of [{}]", roles.join(", ")),
        }
    }
}
