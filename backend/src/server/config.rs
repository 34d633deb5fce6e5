//! Settings the HTTP server needs beyond the domain wiring.

use std::net::SocketAddr;

use actix_session::config::{CookieContentSecurity, PersistentSession};
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Key, SameSite, time::Duration};
#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

const SESSION_COOKIE: &str = "session";
const SESSION_TTL_HOURS: i64 = 2;

/// Private cookie carrying the signed-in user id.
#[derive(Clone)]
pub(crate) struct SessionCookie {
    key: Key,
    secure: bool,
}

impl SessionCookie {
    /// Plain-HTTP deployments get `SameSite=Lax` so local browsers keep the
    /// cookie; TLS deployments use `Strict`.
    fn same_site(&self) -> SameSite {
        if self.secure {
            SameSite::Strict
        } else {
            SameSite::Lax
        }
    }

    pub(crate) fn middleware(&self) -> SessionMiddleware<CookieSessionStore> {
        SessionMiddleware::builder(CookieSessionStore::default(), self.key.clone())
            .cookie_name(SESSION_COOKIE.to_owned())
            .cookie_path("/".to_owned())
            .cookie_secure(self.secure)
            .cookie_http_only(true)
            .cookie_content_security(CookieContentSecurity::Private)
            .cookie_same_site(self.same_site())
            .session_lifecycle(
                PersistentSession::default().session_ttl(Duration::hours(SESSION_TTL_HOURS)),
            )
            .build()
    }
}

/// Listener address, session cookie and optional request metrics.
pub struct ServerConfig {
    pub(crate) session: SessionCookie,
    pub(crate) bind_addr: SocketAddr,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, bind_addr: SocketAddr) -> Self {
        Self {
            session: SessionCookie {
                key,
                secure: cookie_secure,
            },
            bind_addr,
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics(mut self, prometheus: PrometheusMetrics) -> Self {
        self.prometheus = Some(prometheus);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::tls(true, SameSite::Strict)]
    #[case::plain_http(false, SameSite::Lax)]
    fn same_site_follows_the_secure_flag(#[case] secure: bool, #[case] expected: SameSite) {
        let config = ServerConfig::new(Key::generate(), secure, "127.0.0.1:0".parse().expect("addr"));

        assert_eq!(config.session.same_site(), expected);
    }
}
