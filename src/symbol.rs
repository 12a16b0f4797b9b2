//! Instrument symbol helpers

/// Normalize a client- or feed-supplied symbol to the cache/registry key form.
///
/// Matching is case-insensitive everywhere, so everything is keyed on the
/// upper-cased, trimmed symbol.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
