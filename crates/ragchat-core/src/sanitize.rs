//! Sanitization of text arriving from external services.
//!
//! Every string that flows from a remote service (or from user input)
//! into the display layer passes through [`sanitize`]. The function is
//! idempotent: sanitizing already-sanitized text is a no-op.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length, in characters, of any sanitized string.
pub const MAX_TEXT_CHARS: usize = 5000;

/// Denylist of markup patterns that are removed outright, in any casing.
static DANGEROUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)<script.*?</script>",
        r"(?i)javascript:",
        r"(?i)on\w+\s*=",
        r"(?is)<iframe.*?</iframe>",
        r"(?is)<object.*?</object>",
        r"(?is)<embed.*?</embed>",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("denylist pattern must compile"))
    .collect()
});

/// Entities produced by [`escape_html`]. An ampersand already starting
/// one of these is left alone so that repeated escaping is stable.
const KNOWN_ENTITIES: [&str; 5] = ["amp;", "lt;", "gt;", "quot;", "#x27;"];

/// HTML-escapes, strips dangerous markup, truncates to
/// [`MAX_TEXT_CHARS`] characters and trims the result.
pub fn sanitize(text: &str) -> String {
    let escaped = escape_html(text);
    let stripped = strip_dangerous(&escaped);
    let truncated = truncate_entity_safe(&stripped, MAX_TEXT_CHARS);
    truncated.trim().to_string()
}

/// Escapes HTML-significant characters without double-escaping
/// entities from a previous pass.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '&' => {
                let rest = &text[idx + 1..];
                if KNOWN_ENTITIES.iter().any(|entity| rest.starts_with(entity)) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Removes denylisted patterns until a fixpoint is reached.
///
/// Removal can splice surrounding text into a new match (for example a
/// stripped `on...=` fragment joining the halves of `javascript:`), so
/// a single pass is not enough to guarantee idempotence.
fn strip_dangerous(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let mut next = current.clone();
        for pattern in DANGEROUS_PATTERNS.iter() {
            next = pattern.replace_all(&next, "").into_owned();
        }
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Truncates to at most `max_chars` characters without leaving a
/// dangling partial entity at the cut point.
fn truncate_entity_safe(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    if let Some(amp) = truncated.rfind('&') {
        let tail = &truncated[amp..];
        if !tail.contains(';') {
            truncated.truncate(amp);
        }
    }
    truncated
}
