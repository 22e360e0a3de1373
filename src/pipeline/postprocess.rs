//! Response cleanup: deterministic fixes applied to raw model text before
//! JSON parsing.
//!
//! Gemini in JSON mode returns bare JSON. Chat providers driven by the
//! generic backend sometimes wrap it in a ```json fence, prefix a BOM, or
//! add a sentence before the object. These rules strip exactly that and
//! nothing else; anything still unparsable is a per-file failure.
//!
//! Rules run in order:
//! 1. Remove invisible Unicode (BOM, zero-width spaces)
//! 2. Strip an outer code fence
//! 3. Cut surrounding prose down to the outermost `{ … }`

use once_cell::sync::Lazy;
use regex::Regex;

pub fn clean_response(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = strip_code_fences(&s);
    isolate_json_object(&s)
}

// ── Rule 1: Invisible characters ─────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{FEFF}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}'))
        .collect()
}

// ── Rule 2: Outer code fence ─────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}

// ── Rule 3: Surrounding prose ────────────────────────────────────────────────

fn isolate_json_object(input: &str) -> String {
    if input.starts_with('{') || input.starts_with('[') {
        return input.to_string();
    }
    match (input.find('{'), input.rfind('}')) {
        (Some(start), Some(end)) if start < end => input[start..=end].to_string(),
        _ => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_json_is_untouched() {
        let s = r#"{"title":"t","items":[]}"#;
        assert_eq!(clean_response(s), s);
    }

    #[test]
    fn strips_json_fence() {
        let s = "```json\n{\"title\":\"t\"}\n```";
        assert_eq!(clean_response(s), "{\"title\":\"t\"}");
    }

    #[test]
    fn strips_plain_fence_with_crlf() {
        let s = "```\r\n{\"a\":1}\r\n```\r\n";
        assert_eq!(clean_response(s), "{\"a\":1}");
    }

    #[test]
    fn removes_bom_and_zero_width() {
        let s = "\u{FEFF}{\"a\":\u{200B}1}";
        assert_eq!(clean_response(s), "{\"a\":1}");
    }

    #[test]
    fn cuts_leading_prose() {
        let s = "Here is the result:\n{\"a\":1}\nLet me know!";
        assert_eq!(clean_response(s), "{\"a\":1}");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(clean_response("   \n"), "");
    }
}
