//! Exchange identity tag.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the ad exchange a request originated from.
///
/// The engine treats this as an opaque tag: it only needs equality and the
/// [`Exchange::none`] sentinel. Exchange adapters give it meaning (default
/// values, native message typing) outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Exchange(String);

const NONE: &str = "none";

impl Exchange {
    /// Creates an exchange tag with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The sentinel for "no exchange", used when a message is synthesized
    /// outside any exchange adapter (tests, load harnesses).
    #[must_use]
    pub fn none() -> Self {
        Self(NONE.to_owned())
    }

    /// Returns `true` if this is the [`Exchange::none`] sentinel.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.0 == NONE
    }

    /// Returns the exchange id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_and_sentinel() {
        assert_eq!(Exchange::new("adx"), Exchange::new("adx"));
        assert_ne!(Exchange::new("adx"), Exchange::new("mopub"));
        assert!(Exchange::none().is_none());
        assert!(!Exchange::new("adx").is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Exchange::new("adx").to_string(), "adx");
        assert_eq!(Exchange::none().to_string(), "none");
    }
}
