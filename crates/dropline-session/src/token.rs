//! Capability tokens.

use std::borrow::Borrow;
use std::fmt;

use rand::Rng;

/// An unguessable capability string.
///
/// Whoever presents a token gets the access it stands for; there is no
/// other authentication. Tokens are 32 lowercase hex characters
/// (128 bits of randomness), so guessing one is infeasible.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Generates a fresh random token.
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Returns the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lets registries keyed by `Token` be queried with the `&str` a client sent.
impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}
