/*!
Shape checks for email identifiers and notification text.

The same email pattern is used two ways: anchored, to decide whether an
identifier *is* an email address, and unanchored, to pull the addresses
out of a notification's `@`-prefixed mentions.
*/
use once_cell::sync::Lazy;
use regex::Regex;

/// The bare `local@domain.tld` shape, with no anchors.
pub const EMAIL_PATTERN: &str =
    r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";

/**
Plain words first, mentions last.

A word is `[a-zA-Z0-9_.,!?-]+` followed by at most one ASCII whitespace
character: tab, newline, form feed, carriage return or space. A mention
is a literal `@` directly followed by an email address. Once the first
mention appears, nothing but further mentions (and trailing whitespace)
may follow.
*/
pub const NOTIFICATION_PATTERN: &str =
    r"^([a-zA-Z0-9_.,!?-]+[\t\n\f\r ]?)*(@[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}[\t\n\f\r ]*)*$";

static EMAIL_EXACT: Lazy<Regex> = Lazy::new(||
    Regex::new(&format!("^{}$", EMAIL_PATTERN))
        .expect("email pattern is a valid regex")
);

static EMAIL_ANYWHERE: Lazy<Regex> = Lazy::new(||
    Regex::new(EMAIL_PATTERN)
        .expect("email pattern is a valid regex")
);

static NOTIFICATION: Lazy<Regex> = Lazy::new(||
    Regex::new(NOTIFICATION_PATTERN)
        .expect("notification pattern is a valid regex")
);

/// Whether the entirety of `s` is a single email address.
pub fn is_email(s: &str) -> bool {
    EMAIL_EXACT.is_match(s)
}

/// Whether `s` is well-formed notification text.
pub fn is_notification(s: &str) -> bool {
    NOTIFICATION.is_match(s)
}

/**
Every email address appearing in `text`, in order of appearance,
duplicates included.

Because the mention marker `@` isn't a legal local-part character, the
address of `@someone@example.com` comes out as `someone@example.com`.
*/
pub fn extract_mentions(text: &str) -> Vec<&str> {
    EMAIL_ANYWHERE.find_iter(text)
        .map(|m| m.as_str())
        .collect()
}
