use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::identity::{Identity, IdentityState, SessionTokens};

/// SessionCookies
///
/// Names of the cookies carrying the session tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCookies {
    pub access: String,
    pub refresh: String,
}

impl Default for SessionCookies {
    fn default() -> Self {
        Self {
            access: "sb-access-token".to_string(),
            refresh: "sb-refresh-token".to_string(),
        }
    }
}

impl SessionCookies {
    /// Pulls the session tokens out of the request cookies.
    pub fn read(&self, jar: &CookieJar) -> SessionTokens {
        SessionTokens {
            access_token: jar.get(&self.access).map(|c| c.value().to_string()),
            refresh_token: jar.get(&self.refresh).map(|c| c.value().to_string()),
        }
    }

    /// Re-issues a cookie for every token held, always with the hardened
    /// attributes. Only cookies added here end up as `Set-Cookie` headers.
    pub fn write(&self, mut jar: CookieJar, tokens: &SessionTokens) -> CookieJar {
        if let Some(token) = &tokens.access_token {
            jar = jar.add(hardened(&self.access, token));
        }
        if let Some(token) = &tokens.refresh_token {
            jar = jar.add(hardened(&self.refresh, token));
        }
        jar
    }
}

fn hardened(name: &str, value: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), value.to_string()))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/")
        .build()
}

/// SessionResolver
///
/// Turns request cookies into an [`Identity`] through the configured identity
/// provider, and hands back the cookie jar to attach to the response.
///
/// Resolution never fails from the caller's point of view: a missing cookie,
/// a rejected token and a provider outage all come back as `None`.
#[derive(Clone)]
pub struct SessionResolver {
    provider: IdentityState,
    cookies: SessionCookies,
}

impl SessionResolver {
    pub fn new(provider: IdentityState, cookies: SessionCookies) -> Self {
        Self { provider, cookies }
    }

    pub async fn resolve(&self, jar: CookieJar) -> (Option<Identity>, CookieJar) {
        let tokens = self.cookies.read(&jar);
        if tokens.is_empty() {
            return (None, jar);
        }

        match self.provider.resolve(&tokens).await {
            Ok(session) => {
                let jar = self.cookies.write(jar, &session.tokens);
                (Some(session.identity), jar)
            }
            Err(e) => {
                tracing::debug!(error = %e, "session did not resolve to an identity");
                (None, jar)
            }
        }
    }

    /// Resolves the caller from the access token alone. The refresh token is
    /// withheld from the provider so nothing is rotated; use this where no
    /// response cookies can be written back.
    pub async fn identify(&self, jar: &CookieJar) -> Option<Identity> {
        let tokens = SessionTokens {
            refresh_token: None,
            ..self.cookies.read(jar)
        };
        if tokens.is_empty() {
            return None;
        }

        match self.provider.resolve(&tokens).await {
            Ok(session) => Some(session.identity),
            Err(e) => {
                tracing::debug!(error = %e, "access token did not resolve to an identity");
                None
            }
        }
    }
}
