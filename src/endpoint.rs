//! Endpoint addressing for the channel.
//!
//! An [`Endpoint`] is a scheme-relative WebSocket address: a host, a path
//! (default [`DEFAULT_PATH`]), and a scheme source. The scheme source either
//! pins the transport variant (`ws` / `wss`) or derives it from the hosting
//! context on every [`Endpoint::resolve`] call, so a change in the host
//! page's security context between connection attempts is respected.
//!
//! # Example
//!
//! ```
//! use ws_relay::{Endpoint, TransportScheme};
//!
//! let endpoint = Endpoint::mirroring("app.example.test", || {
//!     TransportScheme::mirroring_page("https")
//! });
//!
//! let url = endpoint.resolve().expect("valid endpoint");
//! assert_eq!(url.as_str(), "wss://app.example.test/__ws__");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Well-known path the push server mounts its WebSocket endpoint on.
pub const DEFAULT_PATH: &str = "/__ws__";

// ============================================================================
// TransportScheme
// ============================================================================

/// Transport variant of the WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportScheme {
    /// Plain TCP transport (`ws://`).
    Insecure,
    /// TLS transport (`wss://`).
    Secure,
}

impl TransportScheme {
    /// Returns the URL scheme string.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insecure => "ws",
            Self::Secure => "wss",
        }
    }

    /// Derives the transport scheme from a hosting page's own scheme.
    ///
    /// A secure page gets the secure transport variant; anything else
    /// (including `http` and non-web contexts) gets the insecure one.
    #[inline]
    #[must_use]
    pub fn mirroring_page(page_scheme: &str) -> Self {
        if page_scheme.eq_ignore_ascii_case("https") {
            Self::Secure
        } else {
            Self::Insecure
        }
    }
}

impl fmt::Display for TransportScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SchemeSource
// ============================================================================

/// Context probe returning the transport scheme for the next attempt.
pub type SchemeProbe = Arc<dyn Fn() -> TransportScheme + Send + Sync>;

/// Where an [`Endpoint`] gets its transport scheme from.
#[derive(Clone)]
pub enum SchemeSource {
    /// Scheme fixed at construction time.
    Fixed(TransportScheme),
    /// Scheme re-derived from the hosting context on every resolve.
    Derived(SchemeProbe),
}

impl SchemeSource {
    /// Evaluates the source to a concrete scheme.
    #[inline]
    #[must_use]
    pub fn current(&self) -> TransportScheme {
        match self {
            Self::Fixed(scheme) => *scheme,
            Self::Derived(probe) => probe(),
        }
    }
}

impl fmt::Debug for SchemeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(scheme) => f.debug_tuple("Fixed").field(scheme).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

// ============================================================================
// Endpoint
// ============================================================================

/// Scheme-relative address of the remote WebSocket endpoint.
///
/// # Example
///
/// ```
/// use ws_relay::Endpoint;
///
/// let endpoint = Endpoint::insecure("127.0.0.1:4680");
/// let url = endpoint.resolve().expect("valid endpoint");
/// assert_eq!(url.as_str(), "ws://127.0.0.1:4680/__ws__");
/// ```
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Host, with optional `:port`.
    host: String,
    /// URL path, `/`-prefixed.
    path: String,
    /// Scheme source evaluated once per connection attempt.
    scheme: SchemeSource,
}

impl Endpoint {
    /// Creates an endpoint with a fixed insecure (`ws://`) scheme.
    #[inline]
    #[must_use]
    pub fn insecure(host: impl Into<String>) -> Self {
        Self::with_scheme(host, SchemeSource::Fixed(TransportScheme::Insecure))
    }

    /// Creates an endpoint with a fixed secure (`wss://`) scheme.
    #[inline]
    #[must_use]
    pub fn secure(host: impl Into<String>) -> Self {
        Self::with_scheme(host, SchemeSource::Fixed(TransportScheme::Secure))
    }

    /// Creates an endpoint whose scheme mirrors the hosting context.
    ///
    /// The probe is re-evaluated once per connection attempt, so a change in
    /// the host's security context between attempts takes effect on the next
    /// reconnect.
    #[inline]
    #[must_use]
    pub fn mirroring(
        host: impl Into<String>,
        probe: impl Fn() -> TransportScheme + Send + Sync + 'static,
    ) -> Self {
        Self::with_scheme(host, SchemeSource::Derived(Arc::new(probe)))
    }

    /// Creates an endpoint from an explicit scheme source.
    #[inline]
    #[must_use]
    pub fn with_scheme(host: impl Into<String>, scheme: SchemeSource) -> Self {
        Self {
            host: host.into(),
            path: DEFAULT_PATH.to_string(),
            scheme,
        }
    }

    /// Parses a full `ws://` or `wss://` URL into an endpoint.
    ///
    /// The parsed scheme is pinned as a [`SchemeSource::Fixed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the input is not a valid
    /// WebSocket URL with a host.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|e| Error::invalid_endpoint(input, e.to_string()))?;

        let scheme = match url.scheme() {
            "ws" => TransportScheme::Insecure,
            "wss" => TransportScheme::Secure,
            other => {
                return Err(Error::invalid_endpoint(
                    input,
                    format!("expected ws or wss scheme, got {other}"),
                ));
            }
        };

        let host = url
            .host_str()
            .ok_or_else(|| Error::invalid_endpoint(input, "missing host"))?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            host,
            path: url.path().to_string(),
            scheme: SchemeSource::Fixed(scheme),
        })
    }

    /// Replaces the endpoint path.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Returns the host (with optional port).
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the endpoint path.
    #[inline]
    #[must_use]
    pub fn endpoint_path(&self) -> &str {
        &self.path
    }

    /// Returns the transport scheme the next attempt would use.
    #[inline]
    #[must_use]
    pub fn current_scheme(&self) -> TransportScheme {
        self.scheme.current()
    }

    /// Resolves the endpoint to a concrete URL for one connection attempt.
    ///
    /// The scheme source is evaluated here, once per attempt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the host/path combination does
    /// not form a valid URL.
    pub fn resolve(&self) -> Result<Url> {
        let scheme = self.scheme.current();
        let raw = format!("{}://{}{}", scheme, self.host, self.path);
        Url::parse(&raw).map_err(|e| Error::invalid_endpoint(raw.clone(), e.to_string()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme.current(), self.host, self.path)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_insecure_resolve() {
        let endpoint = Endpoint::insecure("127.0.0.1:4680");
        let url = endpoint.resolve().expect("resolve");
        assert_eq!(url.as_str(), "ws://127.0.0.1:4680/__ws__");
    }

    #[test]
    fn test_secure_resolve() {
        let endpoint = Endpoint::secure("example.test");
        let url = endpoint.resolve().expect("resolve");
        assert_eq!(url.as_str(), "wss://example.test/__ws__");
    }

    #[test]
    fn test_with_path_override() {
        let endpoint = Endpoint::insecure("localhost:9000").with_path("/updates");
        let url = endpoint.resolve().expect("resolve");
        assert_eq!(url.as_str(), "ws://localhost:9000/updates");
    }

    #[test]
    fn test_mirroring_scheme_reevaluated_per_resolve() {
        let secure = std::sync::Arc::new(AtomicBool::new(false));
        let probe_flag = std::sync::Arc::clone(&secure);

        let endpoint = Endpoint::mirroring("example.test", move || {
            if probe_flag.load(Ordering::SeqCst) {
                TransportScheme::Secure
            } else {
                TransportScheme::Insecure
            }
        });

        assert_eq!(
            endpoint.resolve().expect("resolve").scheme(),
            "ws",
            "page context insecure"
        );

        secure.store(true, Ordering::SeqCst);
        assert_eq!(
            endpoint.resolve().expect("resolve").scheme(),
            "wss",
            "page context flipped between attempts"
        );
    }

    #[test]
    fn test_mirroring_page_scheme() {
        assert_eq!(
            TransportScheme::mirroring_page("https"),
            TransportScheme::Secure
        );
        assert_eq!(
            TransportScheme::mirroring_page("HTTPS"),
            TransportScheme::Secure
        );
        assert_eq!(
            TransportScheme::mirroring_page("http"),
            TransportScheme::Insecure
        );
        assert_eq!(
            TransportScheme::mirroring_page("file"),
            TransportScheme::Insecure
        );
    }

    #[test]
    fn test_parse_ws_url() {
        let endpoint = Endpoint::parse("ws://127.0.0.1:4680/__ws__").expect("parse");
        assert_eq!(endpoint.host(), "127.0.0.1:4680");
        assert_eq!(endpoint.endpoint_path(), "/__ws__");
        assert_eq!(endpoint.current_scheme(), TransportScheme::Insecure);
    }

    #[test]
    fn test_parse_wss_url() {
        let endpoint = Endpoint::parse("wss://example.test/updates").expect("parse");
        assert_eq!(endpoint.current_scheme(), TransportScheme::Secure);
        assert_eq!(endpoint.endpoint_path(), "/updates");
    }

    #[test]
    fn test_parse_rejects_http() {
        let result = Endpoint::parse("http://example.test/");
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(err.to_string().contains("expected ws or wss"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Endpoint::parse("not a url").is_err());
    }

    #[test]
    fn test_display_matches_resolve() {
        let endpoint = Endpoint::insecure("localhost:1234");
        assert_eq!(
            endpoint.to_string(),
            endpoint.resolve().expect("resolve").as_str()
        );
    }

    #[test]
    fn test_scheme_source_debug() {
        let fixed = SchemeSource::Fixed(TransportScheme::Secure);
        assert!(format!("{fixed:?}").contains("Secure"));

        let derived = SchemeSource::Derived(Arc::new(|| TransportScheme::Insecure));
        assert_eq!(format!("{derived:?}"), "Derived(..)");
    }
}
