//! Identity resolution against the external identity provider.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The role label that unlocks the admin surface.
pub const ADMIN_ROLE: &str = "admin";

/// Audience carried by access tokens issued to signed-in users.
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// Identity
///
/// The authenticated principal of one request. Resolved fresh on every request
/// and never persisted by this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The identity provider's user id.
    pub id: Uuid,
    pub email: Option<String>,
    /// Coarse access-control label, taken from the user's metadata.
    pub role: Option<String>,
}

impl Identity {
    /// The only place a provider user is turned into an identity. The role is
    /// always read from `user_metadata.role`.
    pub fn from_metadata(id: Uuid, email: Option<String>, metadata: UserMetadata) -> Self {
        Self {
            id,
            email,
            role: metadata.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

/// User-editable metadata attached to a provider account. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// The raw tokens carried by the session cookies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SessionTokens {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// A successfully resolved session: who the caller is, plus the tokens to hand
/// back in refreshed cookies (rotated if the provider issued new ones).
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub identity: Identity,
    pub tokens: SessionTokens,
}

/// AuthError
///
/// Every way session resolution can fail. Callers treat all of them as "no
/// identity"; the variants only exist for logging.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no session tokens present")]
    MissingSession,

    #[error("identity provider rejected the session ({0})")]
    Rejected(StatusCode),

    #[error("access token failed verification: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// IdentityProvider
///
/// The "get current user from session" contract of the external identity
/// service. Implementations may rotate tokens while resolving.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, tokens: &SessionTokens) -> Result<ResolvedSession, AuthError>;
}

pub type IdentityState = Arc<dyn IdentityProvider>;

// --- Hosted provider (GoTrue REST API) ---

/// The user object returned by `/auth/v1/user` and embedded in token grants.
#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

impl ProviderUser {
    fn into_identity(self) -> Identity {
        Identity::from_metadata(self.id, self.email, self.user_metadata)
    }
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    refresh_token: String,
    user: ProviderUser,
}

/// SupabaseIdentityProvider
///
/// Resolves sessions by asking the hosted auth service who owns the access
/// token. When the access token is rejected and a refresh token is available,
/// the refresh grant is exchanged for a new token pair.
pub struct SupabaseIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseIdentityProvider {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn fetch_user(&self, access_token: &str) -> Result<ProviderUser, AuthError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected(response.status()));
        }
        Ok(response.json::<ProviderUser>().await?)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError> {
        let response = self
            .client
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected(response.status()));
        }
        Ok(response.json::<TokenGrant>().await?)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn resolve(&self, tokens: &SessionTokens) -> Result<ResolvedSession, AuthError> {
        if let Some(access_token) = tokens.access_token.as_deref() {
            match self.fetch_user(access_token).await {
                Ok(user) => {
                    return Ok(ResolvedSession {
                        identity: user.into_identity(),
                        tokens: tokens.clone(),
                    });
                }
                // Only an explicit rejection spends the refresh token; outages and
                // rate limits resolve to no identity.
                Err(AuthError::Rejected(status))
                    if tokens.refresh_token.is_some()
                        && (status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN) =>
                {
                    tracing::debug!(%status, "access token rejected, trying refresh grant");
                }
                Err(e) => return Err(e),
            }
        }

        let refresh_token = tokens
            .refresh_token
            .as_deref()
            .ok_or(AuthError::MissingSession)?;
        let grant = self.refresh(refresh_token).await?;

        Ok(ResolvedSession {
            identity: grant.user.into_identity(),
            tokens: SessionTokens {
                access_token: Some(grant.access_token),
                refresh_token: Some(grant.refresh_token),
            },
        })
    }
}

// --- Local verification ---

/// Claims
///
/// The payload of an access token issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// JwtIdentityProvider
///
/// Verifies access tokens locally with the project's signing secret (HS256,
/// expiry and audience enforced). No network round trip and no refresh; an
/// expired access token simply resolves to no identity.
pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve(&self, tokens: &SessionTokens) -> Result<ResolvedSession, AuthError> {
        let token = tokens
            .access_token
            .as_deref()
            .ok_or(AuthError::MissingSession)?;
        let claims = decode::<Claims>(token, &self.key, &self.validation)?.claims;

        Ok(ResolvedSession {
            identity: Identity::from_metadata(claims.sub, claims.email, claims.user_metadata),
            tokens: tokens.clone(),
        })
    }
}
