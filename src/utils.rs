//! Utility functions and macros shared across the crate

use lazy_static::lazy_static;
use regex::Regex;

// ============================================================================
// WASM Logging
// ============================================================================

#[cfg(target_arch = "wasm32")]
pub fn log(s: &str) {
    web_sys::console::log_1(&wasm_bindgen::JsValue::from_str(s));
}

// No console outside the browser; keeps native test runs quiet.
#[cfg(not(target_arch = "wasm32"))]
pub fn log(_s: &str) {}

#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => {
        $crate::utils::log(&format_args!($($t)*).to_string())
    }
}

// ============================================================================
// Text helpers
// ============================================================================

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("static whitespace regex");
}

/// Remove every whitespace character (spaces, tabs, line breaks)
pub fn strip_whitespace(input: &str) -> String {
    WHITESPACE.replace_all(input, "").into_owned()
}

/// Format an integer with `,` thousands separators, e.g. `12900` -> `12,900`
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_whitespace() {
        assert_eq!(strip_whitespace(" pk(\n\tA ) "), "pk(A)");
        assert_eq!(strip_whitespace(""), "");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(12900), "12,900");
        assert_eq!(group_thousands(840000), "840,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(group_thousands(-4200), "-4,200");
    }
}
