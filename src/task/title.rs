//! Task titles and user display names.

use crate::telegram::User;

/// Prefix given to inbox tasks that don't already name themselves as orders.
pub const INBOX_PREFIX: &str = "ORDER: ";

/// Leading words that mark inbox text as already prefixed (case-insensitive).
pub const INBOX_KEYWORDS: &[&str] = &["order", "sipariş", "siparis"];

/// Title for a task created from chat: trimmed text plus creation time.
pub fn make_title<F>(raw: &str, now: F) -> String
where
    F: FnOnce() -> String,
{
    format!("{} — {}", raw.trim(), now())
}

/// Title for a task created through the inbox endpoint.
///
/// The order prefix is added unless the text already starts with one of the
/// [`INBOX_KEYWORDS`]; customer and phone are appended when given.
pub fn make_inbox_title<F>(raw: &str, customer: Option<&str>, phone: Option<&str>, now: F) -> String
where
    F: FnOnce() -> String,
{
    let text = raw.trim();
    let lowered = text.to_lowercase();
    let mut base = if INBOX_KEYWORDS.iter().any(|k| lowered.starts_with(k)) {
        text.to_string()
    } else {
        format!("{}{}", INBOX_PREFIX, text)
    };

    if let Some(customer) = customer.map(str::trim).filter(|s| !s.is_empty()) {
        base.push_str(" · 👤 ");
        base.push_str(customer);
    }
    if let Some(phone) = phone.map(str::trim).filter(|s| !s.is_empty()) {
        base.push_str(" · 📞 ");
        base.push_str(phone);
    }

    make_title(&base, now)
}

/// Name shown as the completer of a task.
pub fn display_name(user: &User) -> String {
    let full_name = match user.last_name.as_deref().filter(|s| !s.is_empty()) {
        Some(last) => format!("{} {}", user.first_name, last),
        None => user.first_name.clone(),
    };
    let full_name = full_name.trim();
    if !full_name.is_empty() {
        return full_name.to_string();
    }
    match user.username.as_deref().filter(|s| !s.is_empty()) {
        Some(username) => format!("@{}", username),
        None => "someone".to_string(),
    }
}
