//! Host and path normalization.
//!
//! # Responsibilities
//! - Reduce a Host header to the bare, lowercase host name
//! - Percent-decode and lexically clean request paths before prefix matching
//! - Match path prefixes (case-sensitive, literal)
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110)
//! - Path matching is a plain `starts_with`: "/api" also matches "/apix"

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Strip an optional `:port`, IPv6 brackets and case from a host.
///
/// `Example.COM:8080` → `example.com`, `[::1]:443` → `::1`.
/// A bare IPv6 address without brackets is kept whole.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();

    let bare = if let Some(rest) = host.strip_prefix('[') {
        match rest.find(']') {
            Some(end) => &rest[..end],
            None => host,
        }
    } else {
        match host.rsplit_once(':') {
            Some((name, port))
                if !name.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) =>
            {
                name
            }
            _ => host,
        }
    };

    bare.to_ascii_lowercase()
}

/// Percent-decode a raw request path so `/%61pi` matches `/api`.
///
/// Malformed escapes are kept as written; invalid UTF-8 is replaced.
pub fn decode_path(path: &str) -> Cow<'_, str> {
    percent_decode_str(path).decode_utf8_lossy()
}

/// Lexically clean a request path.
///
/// Collapses repeated slashes, drops `.` segments, resolves `..` without
/// climbing above the root and removes the trailing slash (except for `/`).
/// An empty path becomes `/`.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            s => segments.push(s),
        }
    }

    let joined = segments.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// True when the cleaned `path` starts with `prefix`.
pub fn matches_prefix(prefix: &str, path: &str) -> bool {
    path.starts_with(prefix)
}
