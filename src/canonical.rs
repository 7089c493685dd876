//! Canonical forms for schema definitions.
//!
//! Two definitions that differ only in whitespace describe the same schema
//! element, so equality checks against the directory go through [`normalize`].
//! The numeric object identifier returned by [`extract_oid`] is the semantic
//! key used to detect a stale definition that needs replacing.
//!
//! ```rust
//! use ldap_schema_sync::canonical::{extract_oid, normalize};
//!
//! let a = normalize(b"( 1.2.3  NAME 'foo'\n  DESC 'bar' )");
//! let b = normalize(b"  ( 1.2.3 NAME 'foo' DESC 'bar' )");
//! assert_eq!(a, b);
//!
//! assert_eq!(extract_oid("( 1.2.3 NAME 'foo' )").unwrap(), "1.2.3");
//! ```

use thiserror::Error;

/// Raised when a definition has no dotted-decimal identifier right after `(`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no numeric object identifier after '(' in definition: {definition}")]
pub struct OidParseError {
    /// The definition text that failed to parse
    pub definition: String,
}

/// Whitespace as understood by the canonical form.
///
/// Matches ASCII whitespace plus vertical tab, which `u8::is_ascii_whitespace`
/// leaves out.
fn is_space(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte == 0x0b
}

fn is_space_char(c: char) -> bool {
    c.is_ascii() && is_space(c as u8)
}

/// Collapse every whitespace run to a single space and trim both ends.
///
/// Non-whitespace bytes are copied through untouched, so the function is total
/// over arbitrary input (including invalid UTF-8) and idempotent.
pub fn normalize(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut pending_space = false;

    for &byte in text {
        if is_space(byte) {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(b' ');
            pending_space = false;
        }
        out.push(byte);
    }

    out
}

/// Extract the object identifier that opens a schema definition.
///
/// The identifier is the first token after the opening parenthesis and must be
/// one or more digit groups separated by dots, e.g. `1.3.6.1.4.1.99999.1`.
/// Only an `{n}` ordering prefix and whitespace may precede the parenthesis.
pub fn extract_oid(text: &str) -> Result<&str, OidParseError> {
    let parse_error = || OidParseError {
        definition: text.to_string(),
    };

    let prefix = ordering_prefix_len(text.as_bytes()).unwrap_or(0);
    let rest = text[prefix..]
        .trim_start_matches(is_space_char)
        .strip_prefix('(')
        .ok_or_else(parse_error)?
        .trim_start_matches(is_space_char);
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let candidate = &rest[..end];

    // The token must be terminated by whitespace or the closing parenthesis,
    // otherwise something like `1.2.3abc` would pass as `1.2.3`.
    let terminated = rest[end..]
        .chars()
        .next()
        .is_none_or(|c| c == ')' || is_space_char(c));

    if terminated && is_dotted_decimal(candidate) {
        Ok(candidate)
    } else {
        Err(parse_error())
    }
}

fn is_dotted_decimal(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .split('.')
            .all(|group| !group.is_empty() && group.bytes().all(|b| b.is_ascii_digit()))
}

/// Strip the `{n}` position prefix OpenLDAP adds to values of ordered
/// attributes such as `olcAttributeTypes`.
///
/// Values without a well-formed prefix are returned unchanged.
pub fn strip_ordering_prefix(value: &[u8]) -> &[u8] {
    match ordering_prefix_len(value) {
        Some(len) => &value[len..],
        None => value,
    }
}

/// The `{n}` prefix of an ordered value, if it has one.
pub fn ordering_prefix(value: &[u8]) -> Option<&[u8]> {
    ordering_prefix_len(value).map(|len| &value[..len])
}

fn ordering_prefix_len(value: &[u8]) -> Option<usize> {
    let rest = value.strip_prefix(b"{")?;
    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || rest.get(digits) != Some(&b'}') {
        return None;
    }
    Some(digits + 2)
}
