//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up the first route whose pattern matches a path
//! - Return the matched entry or an explicit no-match
//!
//! # Design Decisions
//! - First registered match wins; no longest or most-specific match
//! - Re-registering a pattern adds a shadowed entry, never replaces
//! - Immutable once the application is built (shared without locks)

use crate::routing::matcher::{RouteError, RoutePattern, UrlArgs};

/// A compiled pattern and what it routes to.
#[derive(Debug)]
pub struct RouteEntry<T> {
    pub pattern: RoutePattern,
    pub target: T,
}

/// Ordered table of routes.
#[derive(Debug)]
pub struct RouteTable<T> {
    entries: Vec<RouteEntry<T>>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> RouteTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `pattern` and append it to the table.
    pub fn add_rule(&mut self, pattern: &str, target: T) -> Result<(), RouteError> {
        let pattern = RoutePattern::new(pattern)?;
        tracing::debug!(pattern = %pattern.as_str(), position = self.entries.len(), "Route registered");
        self.entries.push(RouteEntry { pattern, target });
        Ok(())
    }

    /// Find the first entry matching `path`.
    pub fn match_path(&self, path: &str) -> Option<(&T, UrlArgs)> {
        self.entries
            .iter()
            .find_map(|entry| entry.pattern.captures(path).map(|args| (&entry.target, args)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry<T>> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_registered_wins() {
        let mut table = RouteTable::new();
        table.add_rule("^/$", "root").unwrap();
        table.add_rule("^/", "catch-all").unwrap();

        assert_eq!(table.match_path("/").map(|(t, _)| *t), Some("root"));
        assert_eq!(table.match_path("/brubeck").map(|(t, _)| *t), Some("catch-all"));
    }

    #[test]
    fn test_catch_all_first_shadows() {
        let mut table = RouteTable::new();
        table.add_rule("^/", "catch-all").unwrap();
        table.add_rule("^/$", "root").unwrap();

        assert_eq!(table.match_path("/").map(|(t, _)| *t), Some("catch-all"));
    }

    #[test]
    fn test_duplicate_pattern_is_shadowed() {
        let mut table = RouteTable::new();
        table.add_rule("^/a$", 1).unwrap();
        table.add_rule("^/a$", 2).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.match_path("/a").map(|(t, _)| *t), Some(1));
    }

    #[test]
    fn test_no_match() {
        let mut table = RouteTable::new();
        table.add_rule("^/greet", ()).unwrap();
        assert!(table.match_path("/missing").is_none());
        assert!(RouteTable::<()>::new().match_path("/").is_none());
    }

    #[test]
    fn test_bad_pattern_not_added() {
        let mut table = RouteTable::new();
        assert!(table.add_rule("(", ()).is_err());
        assert!(table.is_empty());
    }
}
