use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{AppState, identity::Identity};

/// GateDecision
///
/// Outcome of the access gate for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectToLogin,
    RedirectToUnauthorized,
}

/// GatePolicy
///
/// Path rules of the access gate. Prefixes match whole path segments, so
/// `/admin` covers `/admin` and `/admin/polls` but not `/administrator`.
#[derive(Clone, Debug)]
pub struct GatePolicy {
    pub login_path: String,
    pub unauthorized_path: String,
    /// Reachable without a session.
    pub public_prefixes: Vec<String>,
    /// Requires an identity with the admin role.
    pub admin_prefix: String,
    /// JSON endpoints. They answer 401/403 themselves instead of being redirected.
    pub api_prefix: String,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            unauthorized_path: "/unauthorized".to_string(),
            public_prefixes: ["/login", "/auth", "/health", "/swagger-ui", "/api-docs"]
                .into_iter()
                .map(String::from)
                .collect(),
            admin_prefix: "/admin".to_string(),
            api_prefix: "/api".to_string(),
        }
    }
}

impl GatePolicy {
    pub fn decide(&self, identity: Option<&Identity>, path: &str) -> GateDecision {
        let exempt = under(path, &self.api_prefix)
            || self.public_prefixes.iter().any(|prefix| under(path, prefix));

        if identity.is_none() && !exempt {
            return GateDecision::RedirectToLogin;
        }

        if under(path, &self.admin_prefix) && !identity.is_some_and(Identity::is_admin) {
            return GateDecision::RedirectToUnauthorized;
        }

        GateDecision::Allow
    }
}

fn under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// The identity resolved by the gate, stored in the request extensions so the
/// handler-level check can reuse it without another provider round trip.
#[derive(Debug, Clone)]
pub struct GateIdentity(pub Option<Identity>);

/// access_gate
///
/// Middleware in front of every route: resolves the session, redirects browser
/// navigation that lacks a session (or the admin role on admin pages), and
/// attaches the refreshed session cookies to whatever response goes out.
pub async fn access_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let (identity, jar) = state.sessions.resolve(jar).await;

    let decision = state.config.gate.decide(identity.as_ref(), request.uri().path());
    let target = match decision {
        GateDecision::Allow => {
            request.extensions_mut().insert(GateIdentity(identity));
            return (jar, next.run(request).await).into_response();
        }
        GateDecision::RedirectToLogin => &state.config.gate.login_path,
        GateDecision::RedirectToUnauthorized => &state.config.gate.unauthorized_path,
    };

    tracing::debug!(path = %request.uri().path(), to = %target, "access gate redirect");

    let location = match request.uri().query() {
        Some(query) => format!("{target}?{query}"),
        None => target.clone(),
    };
    (jar, Redirect::temporary(&location)).into_response()
}
