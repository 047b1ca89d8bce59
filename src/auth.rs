use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{error::ApiError, gate::GateIdentity, identity::Identity, session::SessionResolver};

/// AdminUser
///
/// Handler-level authorization. Extracting it re-checks the caller's identity
/// and role independently of the access gate and rejects with JSON errors
/// rather than redirects:
///
/// - no identity: [`ApiError::Unauthenticated`] (401)
/// - identity without the admin role: [`ApiError::Forbidden`] (403)
///
/// The identity recorded by the gate is reused when present. Without it (a
/// router assembled without the gate) the access token cookie is checked
/// here, without refreshing it.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Identity);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    SessionResolver: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = match parts.extensions.get::<GateIdentity>() {
            Some(GateIdentity(identity)) => identity.clone(),
            // No response cookies can be set from here, so tokens are never rotated.
            None => {
                let sessions = SessionResolver::from_ref(state);
                sessions.identify(&CookieJar::from_headers(&parts.headers)).await
            }
        };

        let identity = identity.ok_or(ApiError::Unauthenticated)?;
        if !identity.is_admin() {
            tracing::warn!(user_id = %identity.id, "non-admin identity on admin endpoint");
            return Err(ApiError::Forbidden);
        }

        Ok(AdminUser(identity))
    }
}
