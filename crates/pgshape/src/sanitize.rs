//! Stripping of characters that must never reach interpolated SQL text.

/// Characters removed by [`remove_special_symbols`].
pub const SPECIAL_SYMBOLS: &[char] = &[
    '[', ']', '{', '}', '(', ')', '<', '>', '|', '\\', '/', '\'', '"', '`', '~', '!', '@', '#',
    '$', '%', '^', '&', '*', '+', '=', ';', ':', '?', ',', '-', '№',
];

/// Remove [`SPECIAL_SYMBOLS`] from `text` and trim surrounding whitespace.
///
/// Use this for text that is interpolated into SQL rather than bound, such as
/// an order-by field name.
pub fn remove_special_symbols(text: &str) -> String {
    let cleaned: String = text.chars().filter(|c| !SPECIAL_SYMBOLS.contains(c)).collect();
    cleaned.trim().to_string()
}
