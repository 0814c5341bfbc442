//! Session middleware configuration.
//!
//! Server-side sessions via tower-sessions. Production uses the `PostgreSQL`
//! store; tests pass `tower_sessions::MemoryStore`.

use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use tower_sessions::cookie::{Key, SameSite, time::Duration};
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "aerox_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer over any store.
///
/// The cookie is signed with a 64-byte key derived from the configured
/// session secret.
#[must_use]
pub fn create_session_layer<S: SessionStore + Clone>(
    store: S,
    config: &StorefrontConfig,
) -> SessionManagerLayer<S, tower_sessions::service::SignedCookie> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            SESSION_EXPIRY_SECONDS,
        )))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(config.session_secret.expose_secret()))
}

fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_is_deterministic() {
        let a = signing_key("a-long-enough-session-secret-value-123");
        let b = signing_key("a-long-enough-session-secret-value-123");
        let c = signing_key("another-long-enough-session-secret-456");
        assert_eq!(a.master(), b.master());
        assert_ne!(a.master(), c.master());
    }
}
