//! Opaque property identifiers for notification routing.

use core::fmt;

/// Identifies a named view-model property.
///
/// A `PropertyKey` is the token a binding holder uses to route a property
/// change to exactly the bindings observing that property. The only
/// operations the engine relies on are equality and hashing; the wrapped
/// name exists for diagnostics.
///
/// Keys with the same name compare equal, so two view models may share a
/// key constant:
///
/// ```
/// use tether_core::PropertyKey;
///
/// const NAME: PropertyKey = PropertyKey::new("name");
/// assert_eq!(NAME, PropertyKey::new("name"));
/// assert_ne!(NAME, PropertyKey::new("email"));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyKey(&'static str);

impl PropertyKey {
    /// Create a key from a property name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The property name this key was created from.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyKey({})", self.0)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn equality_is_by_name() {
        assert_eq!(PropertyKey::new("a"), PropertyKey::new("a"));
        assert_ne!(PropertyKey::new("a"), PropertyKey::new("b"));
    }

    #[test]
    fn usable_as_map_key() {
        let mut map = HashMap::new();
        map.insert(PropertyKey::new("count"), 1);
        map.insert(PropertyKey::new("count"), 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&PropertyKey::new("count")], 2);
    }

    #[test]
    fn display_shows_name() {
        assert_eq!(PropertyKey::new("title").to_string(), "title");
    }
}
