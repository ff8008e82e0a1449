//! Identifier validation for magic-link and `WebAuthn` requests
//!
//! Passage accepts either an e-mail address or an E.164 phone number as a user
//! identifier. Anything else is rejected locally before a request is built.

use once_cell::sync::Lazy;
use regex::Regex;

/// E.164 phone numbers, optionally grouped with single spaces (`+1 555 0100`)
pub const E164_PATTERN: &str = r"^\+(?:[0-9] ?){6,14}[0-9]$";

static E164_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(E164_PATTERN).unwrap());

// One `@`, no whitespace, a dotted domain with a 2+ char TLD
static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]{2,}$").unwrap());

/// Check whether `value` looks like an e-mail address
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    value.len() <= 254 && EMAIL_REGEX.is_match(value)
}

/// Check whether `value` is an E.164 formatted phone number
#[must_use]
pub fn is_valid_e164(value: &str) -> bool {
    E164_REGEX.is_match(value)
}

/// Check whether `value` is usable as a Passage user identifier
#[must_use]
pub fn is_valid_identifier(value: &str) -> bool {
    is_valid_email(value) || is_valid_e164(value)
}
