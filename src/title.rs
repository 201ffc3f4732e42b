//! Turning a model-generated title into a usable conversation id.

use time::macros::format_description;
use time::OffsetDateTime;

use crate::registry::NEW_CONVERSATION_ID;

pub const MAX_TITLE_CHARS: usize = 60;

/// Keeps alphanumerics and spaces, collapses runs of whitespace and caps the length.
#[must_use]
pub fn sanitize_title(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect();

    let collapsed = filtered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Placeholder for replies that sanitize to nothing: `Chat YYYY-MM-DD HH-MM-SS`.
#[must_use]
pub fn fallback_title(now: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]-[minute]-[second]");
    match now.format(&format) {
        Ok(stamp) => format!("Chat {stamp}"),
        Err(_) => format!("Chat {}", now.unix_timestamp()),
    }
}

/// Appends ` 2`, ` 3`, ... until `is_taken` accepts the id. The sentinel id is always taken.
#[must_use]
pub fn unique_title(candidate: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let taken = |id: &str| id == NEW_CONVERSATION_ID || is_taken(id);
    if !taken(candidate) {
        return candidate.to_string();
    }

    (2usize..)
        .map(|suffix| format!("{candidate} {suffix}"))
        .find(|id| !taken(id))
        .unwrap_or_else(|| candidate.to_string())
}

/// Sanitized, non-empty, collision-free title for a freshly named conversation.
#[must_use]
pub fn resolve_title(
    raw: &str,
    now: OffsetDateTime,
    is_taken: impl Fn(&str) -> bool,
) -> String {
    let sanitized = sanitize_title(raw);
    let candidate = if sanitized.is_empty() {
        fallback_title(now)
    } else {
        sanitized
    };
    unique_title(&candidate, is_taken)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn sanitize_keeps_alphanumerics_and_spaces() {
        assert_eq!(sanitize_title("\"Rust: lifetimes & borrows!\""), "Rust lifetimes borrows");
        assert_eq!(sanitize_title("  Line\nbreaks\tand   gaps "), "Line breaks and gaps");
        assert_eq!(sanitize_title("Café crème 2024"), "Café crème 2024");
    }

    #[test]
    fn sanitize_of_punctuation_only_is_empty() {
        assert_eq!(sanitize_title(""), "");
        assert_eq!(sanitize_title("?!... --- \"\""), "");
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "word ".repeat(40);
        let title = sanitize_title(&long);
        assert!(title.chars().count() <= MAX_TITLE_CHARS);
        assert!(!title.ends_with(' '));
    }

    #[test]
    fn fallback_is_timestamp_based() {
        assert_eq!(
            fallback_title(datetime!(2024-07-14 23:59:59 UTC)),
            "Chat 2024-07-14 23-59-59"
        );
    }

    #[test]
    fn unique_title_appends_numeric_suffix() {
        let existing = ["Trip plan", "Trip plan 2"];
        let title = unique_title("Trip plan", |id| existing.contains(&id));
        assert_eq!(title, "Trip plan 3");

        assert_eq!(unique_title("Fresh", |_| false), "Fresh");
    }

    #[test]
    fn sentinel_id_is_never_produced() {
        assert_eq!(unique_title(NEW_CONVERSATION_ID, |_| false), "new_chat 2");
    }

    #[test]
    fn resolve_falls_back_then_deduplicates() {
        let now = datetime!(2024-07-14 10:00:00 UTC);
        assert_eq!(resolve_title("!!!", now, |_| false), "Chat 2024-07-14 10-00-00");
        assert_eq!(
            resolve_title("!!!", now, |id| id == "Chat 2024-07-14 10-00-00"),
            "Chat 2024-07-14 10-00-00 2"
        );
        assert_eq!(resolve_title("Hello, world.", now, |_| false), "Hello world");
    }
}
