//! Side-channel metadata carried by responses.

use indexmap::IndexMap;
use std::any::Any;
use std::fmt;

/// String-keyed, insertion-ordered map of typed values.
///
/// Interceptors use this to pass computed values to interceptors later in
/// the chain without changing the public response shape (e.g. a weather
/// score consumed by a pricing interceptor). Values are type-erased; reads
/// specify the expected type and get `None` on a missing key or a type
/// mismatch.
///
/// The map lives and dies with one response; it is never shared across
/// requests.
#[derive(Default)]
pub struct Metadata {
    entries: IndexMap<String, Box<dyn Any + Send + Sync>>,
}

impl Metadata {
    /// Creates an empty metadata map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value under `key`, replacing any previous value.
    pub fn insert<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Box::new(value));
    }

    /// Returns the value stored under `key`, if present and of type `T`.
    #[must_use]
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|value| value.downcast_ref())
    }

    /// Returns the value stored under `key` mutably, if present and of type `T`.
    pub fn get_mut<T: 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.entries
            .get_mut(key)
            .and_then(|value| value.downcast_mut())
    }

    /// Removes and returns the value stored under `key`.
    ///
    /// On a type mismatch the entry is removed and `None` is returned.
    pub fn remove<T: 'static>(&mut self, key: &str) -> Option<T> {
        self.entries
            .shift_remove(key)
            .and_then(|value| value.downcast().ok())
            .map(|boxed| *boxed)
    }

    /// Returns `true` if `key` has a value of any type.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_round_trip() {
        let mut metadata = Metadata::new();
        metadata.insert("score", 0.75_f64);
        metadata.insert("campaign", "c-1".to_owned());

        assert_eq!(metadata.get::<f64>("score"), Some(&0.75));
        assert_eq!(metadata.get::<String>("campaign").map(String::as_str), Some("c-1"));
        assert!(metadata.get::<i32>("score").is_none(), "type mismatch yields None");
        assert!(metadata.get::<f64>("missing").is_none());
    }

    #[test]
    fn test_insertion_order() {
        let mut metadata = Metadata::new();
        metadata.insert("b", 1_u8);
        metadata.insert("a", 2_u8);
        metadata.insert("c", 3_u8);
        let keys: Vec<&str> = metadata.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_replace_and_remove() {
        let mut metadata = Metadata::new();
        metadata.insert("k", 1_u32);
        metadata.insert("k", 2_u32);
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.remove::<u32>("k"), Some(2));
        assert!(metadata.is_empty());
    }
}
