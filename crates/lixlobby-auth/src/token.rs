//! Session tokens: 256 random bits, hex on the wire.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

/// Length of a token in bytes.
pub const TOKEN_BYTES: usize = 32;

/// An opaque bearer credential proving a prior successful login.
///
/// Generated from the thread-local CSPRNG. `Display` gives the 64-char
/// lowercase hex form clients send back; `Debug` prints only a short
/// fingerprint so tokens never end up whole in logs.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken([u8; TOKEN_BYTES]);

impl SessionToken {
    /// Draws a fresh random token.
    pub fn generate() -> Self {
        Self(rand::rng().random())
    }

    /// Parses the hex form. Anything that is not exactly 64 hex digits is
    /// rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != TOKEN_BYTES * 2 {
            return None;
        }
        let mut bytes = [0u8; TOKEN_BYTES];
        hex::decode_to_slice(raw, &mut bytes).ok()?;
        Some(Self(bytes))
    }

    /// First four bytes in hex. Safe to log.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Which of `shards` buckets this token belongs in.
    pub(crate) fn shard(&self, shards: usize) -> usize {
        self.0[0] as usize % shards
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({}…)", self.fingerprint())
    }
}

/// Error returned by [`SessionToken::from_str`].
#[derive(Debug, thiserror::Error)]
#[error("malformed session token")]
pub struct MalformedToken;

impl FromStr for SessionToken {
    type Err = MalformedToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or(MalformedToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_renders_as_64_lowercase_hex_chars() {
        let text = SessionToken::generate().to_string();
        assert_eq!(text.len(), 64);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_parse_accepts_display_output() {
        let token = SessionToken::generate();
        assert_eq!(SessionToken::parse(&token.to_string()), Some(token));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let too_short = "ab".repeat(31);
        let too_long = "ab".repeat(33);
        let not_hex = "zz".repeat(32);
        let multibyte = "é".repeat(32);
        for raw in ["", "null", too_short.as_str(), too_long.as_str(), not_hex.as_str(), multibyte.as_str()] {
            assert!(SessionToken::parse(raw).is_none(), "{raw:?} should not parse");
        }
        assert!("garbage".parse::<SessionToken>().is_err());
    }

    #[test]
    fn test_debug_shows_fingerprint_only() {
        let token = SessionToken::generate();
        let printed = format!("{token:?}");
        assert!(printed.contains(&token.fingerprint()));
        assert!(!printed.contains(&token.to_string()));
    }

    #[test]
    fn test_shard_is_within_bounds() {
        for _ in 0..64 {
            assert!(SessionToken::generate().shard(16) < 16);
        }
    }
}
