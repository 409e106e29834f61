//! HTTP methods routes are bucketed by
//!
//! Buckets are keyed by [`http::Method`] directly, so a request's method can
//! be passed straight from the server's request type.

use crate::{Error, Result};

pub use http::Method;

/// Every method a `*` registration applies to
pub const ALL_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::CONNECT,
    Method::TRACE,
];

/// Parse a method name, ignoring case
///
/// Only the standard methods in [`ALL_METHODS`] are routable; extension
/// methods such as `PURGE` are rejected.
///
/// ```
/// use arbor_core::{parse_method, Method};
///
/// assert_eq!(parse_method("post").unwrap(), Method::POST);
/// assert!(parse_method("PURGE").is_err());
/// ```
pub fn parse_method(name: &str) -> Result<Method> {
    let upper = name.trim().to_ascii_uppercase();
    ALL_METHODS
        .iter()
        .find(|m| m.as_str() == upper)
        .cloned()
        .ok_or_else(|| Error::InvalidMethod(name.to_string()))
}
