//! Session identifiers and the URLs derived from them.

use std::fmt;
use std::path::PathBuf;

use rand::Rng;

/// Symbols a generated identifier is drawn from.
const ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Default length of a generated identifier.
pub const DEFAULT_ID_LENGTH: usize = 8;

/// The subdomain token that scopes both the public catcher URL and the feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier of exactly `len` characters from `[a-z0-9]`.
    pub fn generate(len: usize) -> Self {
        let mut rng = rand::rng();
        let token = (0..len)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        Self(token)
    }

    /// Use a caller-supplied identifier. Blank input yields `None` so the
    /// caller falls back to [`SessionId::generate`].
    pub fn explicit(token: &str) -> Option<Self> {
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    /// Explicit identifier if given, otherwise a generated one of `len` chars.
    pub fn explicit_or_generate(token: Option<&str>, len: usize) -> Self {
        token
            .and_then(Self::explicit)
            .unwrap_or_else(|| Self::generate(len))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A session identifier bound to a catching-service domain.
#[derive(Debug, Clone)]
pub struct CatcherEndpoint {
    session: SessionId,
    domain: String,
}

impl CatcherEndpoint {
    pub fn new(session: SessionId, domain: impl Into<String>) -> Self {
        Self {
            session,
            domain: domain.into(),
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Websocket subscription for this session's request notifications.
    pub fn feed_url(&self) -> String {
        format!("wss://{}.{}/init-client", self.session, self.domain)
    }

    /// The address external clients send requests to. Never dereferenced here.
    pub fn public_url(&self) -> String {
        format!("https://{}.{}/", self.session, self.domain)
    }

    /// Log path used in background mode when none is given.
    pub fn default_log_path(&self) -> PathBuf {
        PathBuf::from(format!("rcw-{}.log", self.session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_length_and_alphabet() {
        for len in [1, 8, 32, 100] {
            let id = SessionId::generate(len);
            assert_eq!(id.as_str().len(), len);
            assert!(
                id.as_str()
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()),
                "unexpected symbol in {id}"
            );
        }
    }

    #[test]
    fn test_generate_zero_is_empty() {
        assert_eq!(SessionId::generate(0).as_str(), "");
    }

    #[test]
    fn test_generate_differs_between_calls() {
        // 36^16 possibilities; a collision here means the rng is not being used.
        let a = SessionId::generate(16);
        let b = SessionId::generate(16);
        assert_ne!(a, b);
    }

    #[test]
    fn test_explicit_blank_falls_back() {
        assert!(SessionId::explicit("").is_none());
        assert!(SessionId::explicit("   ").is_none());
        assert!(SessionId::explicit("\t\n").is_none());
        // A usable token is kept exactly as given.
        assert_eq!(SessionId::explicit(" abc ").unwrap().as_str(), " abc ");

        let id = SessionId::explicit_or_generate(Some(""), 5);
        assert_eq!(id.as_str().len(), 5);
        let id = SessionId::explicit_or_generate(Some("mine"), 5);
        assert_eq!(id.as_str(), "mine");
        let id = SessionId::explicit_or_generate(None, 12);
        assert_eq!(id.as_str().len(), 12);
    }

    #[test]
    fn test_endpoint_urls() {
        let ep = CatcherEndpoint::new(
            SessionId::explicit("abc123").unwrap(),
            "requestcatcher.com",
        );
        assert_eq!(ep.feed_url(), "wss://abc123.requestcatcher.com/init-client");
        assert_eq!(ep.public_url(), "https://abc123.requestcatcher.com/");
        assert_eq!(ep.default_log_path(), PathBuf::from("rcw-abc123.log"));
        assert_eq!(ep.session().as_str(), "abc123");
    }
}
