//! Shared-secret checks for the public endpoints.
//!
//! - `/inbox` requires `X-Secret: <INBOX_SECRET>`; with no secret configured
//!   every request is rejected.
//! - `/telegram` requires `X-Telegram-Bot-Api-Secret-Token` only when
//!   `WEBHOOK_SECRET` is configured.

use axum::http::HeaderMap;

pub const INBOX_SECRET_HEADER: &str = "x-secret";
pub const TELEGRAM_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    if a_bytes.len() != b_bytes.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a_bytes.iter().zip(b_bytes) {
        diff |= x ^ y;
    }
    diff == 0
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .unwrap_or("")
}

/// Inbox check (fails closed when no secret is configured).
pub fn inbox_authorized(headers: &HeaderMap, expected: Option<&str>) -> bool {
    match expected {
        Some(secret) if !secret.is_empty() => {
            constant_time_eq(header_value(headers, INBOX_SECRET_HEADER), secret)
        }
        _ => false,
    }
}

/// Telegram webhook check (open when no secret is configured).
pub fn webhook_authorized(headers: &HeaderMap, expected: Option<&str>) -> bool {
    match expected {
        Some(secret) if !secret.is_empty() => {
            constant_time_eq(header_value(headers, TELEGRAM_SECRET_HEADER), secret)
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: &'static str, value: &'static str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, HeaderValue::from_static(value));
        map
    }

    #[test]
    fn constant_time_eq_compares_contents() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(!constant_time_eq("", "a"));
    }

    #[test]
    fn inbox_fails_closed_without_secret() {
        assert!(!inbox_authorized(&HeaderMap::new(), None));
        assert!(!inbox_authorized(&headers("x-secret", ""), Some("")));
    }

    #[test]
    fn inbox_header_name_is_case_insensitive() {
        let map = headers("x-secret", "s3cret");
        assert!(inbox_authorized(&map, Some("s3cret")));
        assert!(!inbox_authorized(&map, Some("other")));
    }

    #[test]
    fn webhook_is_open_without_secret() {
        assert!(webhook_authorized(&HeaderMap::new(), None));
        let map = headers("x-telegram-bot-api-secret-token", "tok");
        assert!(webhook_authorized(&map, Some("tok")));
        assert!(!webhook_authorized(&HeaderMap::new(), Some("tok")));
    }
}
