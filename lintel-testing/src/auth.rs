// Fixed-table authentication providers

use async_trait::async_trait;
use lintel_core::{
    ApiKeyInfo, ApiKeyInfoProvider, AuthError, AuthInfo, AuthenticationInfoProvider, HttpRequest,
};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Resolves `Authorization: Bearer <token>` against a fixed table.
///
/// No header yields no caller; an unknown token is rejected.
#[derive(Default)]
pub struct StaticAuthProvider {
    tokens: RwLock<HashMap<String, AuthInfo>>,
    unavailable: RwLock<bool>,
}

impl StaticAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, token: &str, info: AuthInfo) -> Self {
        self.tokens.write().insert(token.to_string(), info);
        self
    }

    /// Register `token` for `subject` holding `roles`.
    pub fn with_user(self, token: &str, subject: &str, roles: &[&str]) -> Self {
        let info = AuthInfo::new(subject).with_roles(roles.iter().copied());
        self.with_token(token, info)
    }

    /// Simulate the backend being down.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write() = unavailable;
    }
}

#[async_trait]
impl AuthenticationInfoProvider for StaticAuthProvider {
    async fn get(&self, request: &HttpRequest) -> Result<Option<AuthInfo>, AuthError> {
        if *self.unavailable.read() {
            return Err(AuthError::Unavailable("static auth disabled".to_string()));
        }
        let Some(header) = request.header("authorization") else {
            return Ok(None);
        };
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AuthError::InvalidCredentials("expected a bearer token".to_string()))?;

        self.tokens
            .read()
            .get(token.trim())
            .cloned()
            .map(Some)
            .ok_or_else(|| AuthError::InvalidCredentials("unknown token".to_string()))
    }
}

/// Resolves API keys against a fixed table.
#[derive(Default)]
pub struct StaticApiKeyProvider {
    keys: RwLock<HashMap<String, ApiKeyInfo>>,
}

impl StaticApiKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(self, key: &str, owner: &str) -> Self {
        let info = ApiKeyInfo {
            key_id: format!("key-{}", self.keys.read().len() + 1),
            owner: owner.to_string(),
        };
        self.keys.write().insert(key.to_string(), info);
        self
    }

    pub fn revoke(&self, key: &str) {
        self.keys.write().remove(key);
    }
}

#[async_trait]
impl ApiKeyInfoProvider for StaticApiKeyProvider {
    async fn get(&self, key: &str) -> Result<Option<ApiKeyInfo>, AuthError> {
        Ok(self.keys.read().get(key).cloned())
    }
}
