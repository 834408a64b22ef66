//! Phone number canonicalization
//!
//! Every phone number stored by Corral (lead phones, owner mobiles,
//! conversation contacts) passes through [`normalize`] first, so the
//! `+91XXXXXXXXXX` form doubles as the dedup/lookup key.

/// Canonicalize a raw phone string to `+91XXXXXXXXXX` form.
///
/// Heuristic, assumes Indian 10-digit subscriber numbers:
/// - `"919876543210"` (12 digits, `91` prefix) -> `"+919876543210"`
/// - `"9876543210"` (bare 10 digits) -> `"+919876543210"`
/// - `"09876543210"` (trunk `0` prefix) -> `"+919876543210"`
/// - anything else with >= 10 digits keeps its last 10 digits
/// - fewer than 10 digits: returned unchanged (fail-open)
///
/// Never panics and never errors; this sits in the hot path of every
/// lead create/update and inbound message.
pub fn normalize(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 12 && digits.starts_with("91") {
        format!("+{}", digits)
    } else if digits.len() == 10 {
        format!("+91{}", digits)
    } else if digits.len() == 11 && digits.starts_with('0') {
        format!("+91{}", &digits[1..])
    } else if digits.len() >= 10 {
        // Lossy fallback: keep the last 10 digits. Intentional, callers
        // depend on this exact behavior for malformed input.
        format!("+91{}", &digits[digits.len() - 10..])
    } else {
        raw.to_string()
    }
}
