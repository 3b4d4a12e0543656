//! Incoming cookie parsing and outgoing cookie assembly.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Parse a `Cookie` request header (`a=1; b="two"`) into name → value.
///
/// Malformed pairs are skipped; later duplicates win.
pub fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for pair in header.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() || name.starts_with('$') {
            continue;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        cookies.insert(name.to_string(), value.to_string());
    }
    cookies
}

/// A cookie queued for the response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub max_age: Option<i64>,
    /// Preformatted expiry (an HTTP date or `0` to expire immediately).
    pub expires: Option<String>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn expires(mut self, expires: impl Into<String>) -> Self {
        self.expires = Some(expires.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    /// Render as the value of a `Set-Cookie` header.
    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, quote_if_needed(&self.value));
        if let Some(domain) = &self.domain {
            let _ = write!(out, "; Domain={domain}");
        }
        if let Some(expires) = &self.expires {
            let _ = write!(out, "; expires={expires}");
        }
        if let Some(max_age) = self.max_age {
            let _ = write!(out, "; Max-Age={max_age}");
        }
        if let Some(path) = &self.path {
            let _ = write!(out, "; Path={path}");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        out
    }
}

fn quote_if_needed(value: &str) -> String {
    let plain = !value.is_empty()
        && value
        .bytes()
        .all(|b| b.is_ascii_graphic() && !matches!(b, b'"' | b',' | b';' | b'\\'));
    if plain {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// Outgoing cookies, one per name, in the order first set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    /// Add a cookie, replacing any earlier one with the same name.
    pub fn set(&mut self, cookie: Cookie) {
        match self.cookies.iter_mut().find(|c| c.name == cookie.name) {
            Some(existing) => *existing = cookie,
            None => self.cookies.push(cookie),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.iter()
    }

    /// Header values for every queued cookie.
    pub fn header_values(&self) -> Vec<String> {
        self.cookies.iter().map(Cookie::to_header_value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_header() {
        let cookies = parse_cookie_header(r#"key=value; session="a b"; junk; $Version=1"#);
        assert_eq!(cookies["key"], "value");
        assert_eq!(cookies["session"], "a b");
        assert_eq!(cookies.len(), 2);
    }

    #[test]
    fn test_cookie_header_value() {
        let cookie = Cookie::new("key", "value");
        assert_eq!(cookie.to_header_value(), "key=value");

        let cookie = Cookie::new("gone", "")
            .max_age(-1)
            .expires("0")
            .path("/")
            .http_only();
        assert_eq!(
            cookie.to_header_value(),
            "gone=\"\"; expires=0; Max-Age=-1; Path=/; HttpOnly"
        );
    }

    #[test]
    fn test_jar_replaces_by_name() {
        let mut jar = CookieJar::default();
        jar.set(Cookie::new("a", "1"));
        jar.set(Cookie::new("b", "2"));
        jar.set(Cookie::new("a", "3"));
        assert_eq!(jar.header_values(), vec!["a=3", "b=2"]);
    }
}
