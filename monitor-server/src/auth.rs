//! Credential validation for the monitoring API
//!
//! Callers present either an API key (`Authorization: ApiKey <key>`,
//! `Authorization: Bearer lm_...` or `X-API-Key`) or an HS256 JWT bearer
//! token. A principal is an administrator when one of its roles is listed in
//! [`AuthConfig::admin_roles`] or its token carries `is_staff = true`.

use crate::error::{ServerError, ServerResult};
use axum::http::HeaderMap;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;

/// Prefix that marks a bearer credential as an API key rather than a JWT
pub const API_KEY_PREFIX: &str = "lm_";

/// Authorization settings loaded from the `[auth]` section
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Roles that grant access to administrative endpoints
    pub admin_roles: Vec<String>,
    /// HS256 secret; JWT authentication is disabled when unset
    pub jwt_secret: Option<String>,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub api_keys: Vec<ApiKeyEntry>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_roles: vec![
                "super_admin".to_string(),
                "librarian".to_string(),
                "admin".to_string(),
            ],
            jwt_secret: None,
            jwt_issuer: "libris".to_string(),
            jwt_audience: "libris-monitor".to_string(),
            api_keys: Vec::new(),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("admin_roles", &self.admin_roles)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("api_keys", &self.api_keys.len())
            .finish()
    }
}

/// A configured API key and the principal it authenticates
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiKeyEntry {
    pub key: String,
    pub user: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Authenticated principal
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub user_id: String,
    pub roles: Vec<String>,
    pub is_staff: bool,
}

impl AuthContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: Vec::new(),
            is_staff: false,
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_staff(mut self, is_staff: bool) -> Self {
        self.is_staff = is_staff;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// JWT claims accepted by the monitoring API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,
    pub exp: u64,
    pub iat: u64,
    pub iss: String,
    pub aud: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub is_staff: bool,
}

impl JwtClaims {
    pub fn new(
        user_id: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        expires_in_seconds: u64,
    ) -> Self {
        let now = current_timestamp();
        Self {
            sub: user_id.into(),
            exp: now + expires_in_seconds,
            iat: now,
            iss: issuer.into(),
            aud: audience.into(),
            roles: Vec::new(),
            is_staff: false,
        }
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_staff(mut self, is_staff: bool) -> Self {
        self.is_staff = is_staff;
        self
    }
}

/// HS256 token validator with issuer and audience checks
pub struct TokenValidator {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    validation: Validation,
    expected_issuer: String,
    expected_audience: String,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("expected_issuer", &self.expected_issuer)
            .field("expected_audience", &self.expected_audience)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl TokenValidator {
    pub fn new(secret: &str, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            validation,
            expected_issuer: issuer.to_string(),
            expected_audience: audience.to_string(),
        }
    }

    /// Validate a JWT and return its claims
    pub fn validate_token(&self, token: &str) -> ServerResult<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| ServerError::forbidden(format!("invalid token: {e}")))
    }

    /// Sign claims into a JWT
    pub fn create_token(&self, claims: &JwtClaims) -> ServerResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| ServerError::forbidden(format!("cannot sign token: {e}")))
    }
}

struct StoredKey {
    hash: String,
    user: String,
    roles: Vec<String>,
}

/// Resolves request credentials to principals and checks admin access
pub struct Authenticator {
    admin_roles: HashSet<String>,
    api_keys: Vec<StoredKey>,
    token_validator: Option<TokenValidator>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("admin_roles", &self.admin_roles)
            .field("api_keys", &self.api_keys.len())
            .field("token_validator", &self.token_validator)
            .finish()
    }
}

impl Authenticator {
    pub fn new(config: &AuthConfig) -> Self {
        let api_keys = config
            .api_keys
            .iter()
            .map(|entry| StoredKey {
                hash: hash_api_key(&entry.key),
                user: entry.user.clone(),
                roles: entry.roles.clone(),
            })
            .collect();

        let token_validator = config
            .jwt_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .map(|secret| TokenValidator::new(secret, &config.jwt_issuer, &config.jwt_audience));

        Self {
            admin_roles: config.admin_roles.iter().cloned().collect(),
            api_keys,
            token_validator,
        }
    }

    pub fn token_validator(&self) -> Option<&TokenValidator> {
        self.token_validator.as_ref()
    }

    /// Resolve the caller, or `None` when no valid credential is present
    pub fn authenticate(&self, headers: &HeaderMap) -> Option<AuthContext> {
        if let Some(api_key) = extract_api_key(headers) {
            let hash = hash_api_key(&api_key);
            // every stored hash is compared so timing does not reveal position
            let mut found = None;
            for stored in &self.api_keys {
                if secure_compare(&hash, &stored.hash) && found.is_none() {
                    found = Some(stored);
                }
            }
            match found {
                Some(stored) => {
                    return Some(
                        AuthContext::new(stored.user.clone()).with_roles(stored.roles.clone()),
                    );
                }
                None => debug!("API key validation failed"),
            }
        }

        if let (Some(validator), Some(token)) =
            (&self.token_validator, extract_bearer_token(headers))
        {
            match validator.validate_token(&token) {
                Ok(claims) => {
                    return Some(
                        AuthContext::new(claims.sub)
                            .with_roles(claims.roles)
                            .with_staff(claims.is_staff),
                    );
                }
                Err(e) => debug!("JWT validation failed: {}", e),
            }
        }

        None
    }

    pub fn is_admin(&self, context: &AuthContext) -> bool {
        context.is_staff || context.roles.iter().any(|r| self.admin_roles.contains(r))
    }

    /// Authenticate and require an administrative principal
    pub fn authorize_admin(&self, headers: &HeaderMap) -> ServerResult<AuthContext> {
        let context = self
            .authenticate(headers)
            .ok_or_else(|| ServerError::forbidden("authentication required"))?;
        if !self.is_admin(&context) {
            return Err(ServerError::forbidden(format!(
                "user {} lacks an administrative role",
                context.user_id
            )));
        }
        Ok(context)
    }
}

/// Hex-encoded SHA-256 of an API key
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time string comparison
pub fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }

    result == 0
}

/// Extract an API key from request headers
pub fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_str) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(key) = auth_str.strip_prefix("ApiKey ") {
            return Some(key.trim().to_string());
        }
        if let Some(key) = auth_str.strip_prefix("Bearer ") {
            if key.starts_with(API_KEY_PREFIX) {
                return Some(key.trim().to_string());
            }
        }
    }

    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|key| key.trim().to_string())
}

/// Extract a JWT bearer token from request headers
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers.get("authorization")?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?;
    if token.starts_with(API_KEY_PREFIX) {
        return None;
    }
    Some(token.trim().to_string())
}

fn current_timestamp() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
