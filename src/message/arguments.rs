//! Request argument parsing.
//!
//! # Responsibilities
//! - Decode query strings and url-encoded form bodies
//! - Split `multipart/form-data` bodies into named fields and file parts
//! - Parse `Content-Type`-style header parameters
//!
//! # Design Decisions
//! - Empty values are discarded, so a present key always has a value
//! - Invalid multipart input is logged and skipped, never fatal

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;

/// Argument name → every value seen, in arrival order.
pub type Arguments = BTreeMap<String, Vec<String>>;

/// A file uploaded through a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub filename: String,
    pub content_type: String,
    pub body: Bytes,
}

/// Uploaded files by form field name.
pub type Files = BTreeMap<String, Vec<FilePart>>;

/// Append the pairs of a url-encoded string to `arguments`.
pub fn parse_urlencoded_into(arguments: &mut Arguments, input: &[u8]) {
    for (name, value) in url::form_urlencoded::parse(input) {
        if value.is_empty() {
            continue;
        }
        arguments
            .entry(name.into_owned())
            .or_default()
            .push(value.into_owned());
    }
}

/// Parse a `Content-Type`-like header into its main value and lowercase
/// parameters, unquoting quoted values.
pub fn parse_header_params(line: &str) -> (String, HashMap<String, String>) {
    let mut parts = split_params(line).into_iter();
    let key = parts.next().unwrap_or_default();
    let mut params = HashMap::new();
    for part in parts {
        if let Some((name, value)) = part.split_once('=') {
            let mut value = value.trim().to_string();
            if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                value = value[1..value.len() - 1]
                    .replace("\\\\", "\\")
                    .replace("\\\"", "\"");
            }
            params.insert(name.trim().to_lowercase(), value);
        }
    }
    (key, params)
}

/// Split on `;` while respecting quoted sections.
fn split_params(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    for c in line.chars() {
        match c {
            '\\' if in_quotes && !escaped => {
                escaped = true;
                current.push(c);
                continue;
            }
            '"' if !escaped => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                out.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        escaped = false;
        current.push(c);
    }
    out.push(current.trim().to_string());
    out
}

/// Decode a `multipart/form-data` body delimited by `boundary`.
///
/// Named fields are appended to `arguments`; parts carrying a filename are
/// appended to `files`.
pub fn parse_multipart_into(
    boundary: &str,
    body: &[u8],
    arguments: &mut Arguments,
    files: &mut Files,
) {
    let boundary = boundary.trim_matches('"');
    let closing = format!("--{boundary}--");
    let Some(end) = find(body, closing.as_bytes()) else {
        tracing::warn!("multipart/form-data missing closing boundary");
        return;
    };

    let delimiter = format!("--{boundary}\r\n");
    for part in split(&body[..end], delimiter.as_bytes()) {
        if part.is_empty() {
            continue;
        }
        let Some(eoh) = find(part, b"\r\n\r\n") else {
            tracing::warn!("multipart/form-data part missing headers");
            continue;
        };
        let headers = parse_part_headers(&String::from_utf8_lossy(&part[..eoh]));

        let disposition = headers
            .get("content-disposition")
            .map(String::as_str)
            .unwrap_or_default();
        let (kind, params) = parse_header_params(disposition);
        if kind != "form-data" || !part.ends_with(b"\r\n") {
            tracing::warn!("invalid multipart/form-data part");
            continue;
        }
        let Some(name) = params.get("name").filter(|n| !n.is_empty()) else {
            tracing::warn!("multipart/form-data value missing name");
            continue;
        };

        let value = &part[eoh + 4..part.len() - 2];
        match params.get("filename") {
            Some(filename) if !filename.is_empty() => {
                let content_type = headers
                    .get("content-type")
                    .cloned()
                    .unwrap_or_else(|| "application/unknown".to_string());
                files.entry(name.clone()).or_default().push(FilePart {
                    filename: filename.clone(),
                    content_type,
                    body: Bytes::copy_from_slice(value),
                });
            }
            _ => arguments
                .entry(name.clone())
                .or_default()
                .push(String::from_utf8_lossy(value).into_owned()),
        }
    }
}

/// Part headers keyed by lowercase name; folded lines are joined with a space.
fn parse_part_headers(block: &str) -> HashMap<String, String> {
    let mut headers: HashMap<String, String> = HashMap::new();
    let mut last_key = String::new();
    for line in block.lines() {
        if line.starts_with(char::is_whitespace) {
            if let Some(value) = headers.get_mut(&last_key) {
                value.push(' ');
                value.push_str(line.trim_start());
            }
        } else if let Some((name, value)) = line.split_once(':') {
            last_key = name.trim().to_lowercase();
            headers.insert(last_key.clone(), value.trim().to_string());
        }
    }
    headers
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn split<'a>(mut haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut out = Vec::new();
    while let Some(at) = find(haystack, needle) {
        out.push(&haystack[..at]);
        haystack = &haystack[at + needle.len()..];
    }
    out.push(haystack);
    out
}
