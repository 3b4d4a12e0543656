//! Route pattern matching.
//!
//! # Responsibilities
//! - Compile a route pattern as a Unicode, case-sensitive regex
//! - Match a path from its start (the end need not be anchored)
//! - Extract captured groups as named or positional URL arguments
//!
//! # Design Decisions
//! - Named groups take priority over positional groups
//! - Named groups that did not participate, or captured nothing, are
//!   dropped so handler defaults apply
//! - A pattern without groups yields `UrlArgs::Empty`

use std::collections::BTreeMap;

use regex::Regex;

/// Errors raised while registering routes.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Arguments captured from the path by a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UrlArgs {
    /// Named groups (`(?P<id>…)`), absent/empty values removed.
    Named(BTreeMap<String, String>),
    /// Unnamed groups in order; `None` where a group did not participate.
    Positional(Vec<Option<String>>),
    /// The pattern captured nothing.
    #[default]
    Empty,
}

impl UrlArgs {
    /// A named argument.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            UrlArgs::Named(map) => map.get(name).map(String::as_str),
            _ => None,
        }
    }

    /// A positional argument.
    pub fn positional(&self, index: usize) -> Option<&str> {
        match self {
            UrlArgs::Positional(values) => values.get(index).and_then(|v| v.as_deref()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            UrlArgs::Named(map) => map.len(),
            UrlArgs::Positional(values) => values.len(),
            UrlArgs::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
    named: bool,
}

impl RoutePattern {
    /// Compile `pattern`, anchoring it at the start of the path only.
    pub fn new(pattern: &str) -> Result<Self, RouteError> {
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
            RouteError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        let named = regex.capture_names().flatten().next().is_some();
        Ok(Self {
            source: pattern.to_string(),
            regex,
            named,
        })
    }

    /// The pattern as registered.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match `path`, returning the captured arguments on success.
    pub fn captures(&self, path: &str) -> Option<UrlArgs> {
        let caps = self.regex.captures(path)?;

        if self.named {
            let named = self
                .regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name)
                        .filter(|m| !m.as_str().is_empty())
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect();
            return Some(UrlArgs::Named(named));
        }

        let positional: Vec<Option<String>> = caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();
        if positional.is_empty() {
            Some(UrlArgs::Empty)
        } else {
            Some(UrlArgs::Positional(positional))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_capture() {
        let pattern = RoutePattern::new(r"^/item/(?P<id>\w+)$").unwrap();
        let args = pattern.captures("/item/42").unwrap();
        assert_eq!(args.get("id"), Some("42"));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_positional_capture() {
        let pattern = RoutePattern::new(r"^/item/(\w+)$").unwrap();
        let args = pattern.captures("/item/42").unwrap();
        assert_eq!(args, UrlArgs::Positional(vec![Some("42".to_string())]));
        assert_eq!(args.positional(0), Some("42"));
    }

    #[test]
    fn test_optional_named_dropped() {
        let pattern = RoutePattern::new(r"^/page(/(?P<num>\d+))?").unwrap();
        let args = pattern.captures("/page").unwrap();
        assert_eq!(args, UrlArgs::Named(BTreeMap::new()));
        assert_eq!(pattern.captures("/page/3").unwrap().get("num"), Some("3"));
    }

    #[test]
    fn test_match_from_start_only() {
        let pattern = RoutePattern::new("/brubeck").unwrap();
        assert!(pattern.is_match("/brubeck/extra"));
        assert!(!pattern.is_match("/x/brubeck"));
        assert_eq!(pattern.captures("/brubeck"), Some(UrlArgs::Empty));
    }

    #[test]
    fn test_unicode_and_case() {
        let pattern = RoutePattern::new(r"^/caf\w+$").unwrap();
        assert!(pattern.is_match("/café"));
        assert!(!RoutePattern::new("^/Home").unwrap().is_match("/home"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            RoutePattern::new("^/(unclosed"),
            Err(RouteError::InvalidPattern { .. })
        ));
    }
}
