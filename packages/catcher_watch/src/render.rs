//! Text rendering of request events and console match highlighting.

use std::borrow::Cow;

use crate::event::RequestEvent;

/// Bodies longer than this many characters are cut for readability.
pub const MAX_BODY_CHARS: usize = 2000;

/// Appended to a body that was cut.
pub const TRUNCATION_MARKER: &str = "\n...[truncated]...";

/// Bold red, wrapped around each highlighted match.
pub const HIGHLIGHT_START: &str = "\x1b[1;31m";
pub const HIGHLIGHT_END: &str = "\x1b[0m";

/// Formats a [`RequestEvent`] as a multi-line block:
///
/// ```text
/// [2024-01-01T00:00:00+00:00] POST /hook (host=h, from=1.2.3.4, len=2)
/// Headers:
/// Accept: */*
/// Body:
/// {}
/// ```
///
/// The `Headers:` and `Body:` sections are omitted entirely when empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderer {
    max_body_chars: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(MAX_BODY_CHARS)
    }
}

impl Renderer {
    pub fn new(max_body_chars: usize) -> Self {
        Self { max_body_chars }
    }

    pub fn max_body_chars(&self) -> usize {
        self.max_body_chars
    }

    pub fn render(&self, event: &RequestEvent) -> String {
        let mut parts = vec![format!(
            "[{}] {} {} (host={}, from={}, len={})",
            event.display_time(),
            event.method,
            event.path,
            event.host,
            event.remote_addr,
            event.content_length,
        )];

        if !event.headers.is_empty() {
            parts.push("Headers:".to_string());
            parts.extend(
                event
                    .headers
                    .iter()
                    .map(|(name, value)| format!("{name}: {}", value.joined())),
            );
        }

        if !event.body.is_empty() {
            parts.push("Body:".to_string());
            parts.push(truncate_body(&event.body, self.max_body_chars).into_owned());
        }

        parts.join("\n")
    }
}

fn truncate_body(body: &str, max_chars: usize) -> Cow<'_, str> {
    match body.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(format!("{}{}", &body[..cut], TRUNCATION_MARKER)),
        None => Cow::Borrowed(body),
    }
}

/// Case-insensitive literal search term for console output.
///
/// Matching folds both sides per character with [`char::to_lowercase`];
/// the needle is never interpreted as a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlighter {
    needle: Vec<char>,
}

impl Highlighter {
    /// `None` for an empty needle, which highlights nothing.
    pub fn new(needle: &str) -> Option<Self> {
        if needle.is_empty() {
            return None;
        }
        Some(Self {
            needle: needle.chars().flat_map(char::to_lowercase).collect(),
        })
    }

    /// Wrap every non-overlapping match in `text`, scanning left to right.
    pub fn apply(&self, text: &str) -> String {
        // Folded haystack, plus the byte span in `text` each folded char came from.
        let mut folded = Vec::with_capacity(text.len());
        let mut spans = Vec::with_capacity(text.len());
        for (at, ch) in text.char_indices() {
            let span = (at, at + ch.len_utf8());
            for lower in ch.to_lowercase() {
                folded.push(lower);
                spans.push(span);
            }
        }

        let n = self.needle.len();
        let mut out = String::with_capacity(text.len());
        let mut copied = 0;
        let mut i = 0;
        while i + n <= folded.len() {
            if folded[i..i + n] != self.needle[..] {
                i += 1;
                continue;
            }
            let (start, _) = spans[i];
            let (_, end) = spans[i + n - 1];
            // A match can start inside the expansion of a char already emitted.
            if start >= copied {
                out.push_str(&text[copied..start]);
                out.push_str(HIGHLIGHT_START);
                out.push_str(&text[start..end]);
                out.push_str(HIGHLIGHT_END);
                copied = end;
            }
            i += n;
        }
        out.push_str(&text[copied..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::HeaderValue;

    fn strip(text: &str) -> String {
        text.replace(HIGHLIGHT_START, "").replace(HIGHLIGHT_END, "")
    }

    fn sample_event() -> RequestEvent {
        RequestEvent {
            time: Some("2024-01-01T00:00:00Z".into()),
            host: "abc.requestcatcher.com".into(),
            method: "POST".into(),
            path: "/hook".into(),
            remote_addr: "1.2.3.4".into(),
            content_length: 11,
            headers: vec![
                ("Accept".into(), HeaderValue::List(vec!["a".into(), "b".into()])),
                ("X-Token".into(), HeaderValue::Single("x".into())),
            ],
            body: "hello world".into(),
        }
    }

    #[test]
    fn test_header_line_only() {
        let event = RequestEvent {
            time: Some("2024-01-01T00:00:00Z".into()),
            host: "h".into(),
            method: "GET".into(),
            path: "/x".into(),
            remote_addr: "1.2.3.4".into(),
            ..Default::default()
        };
        assert_eq!(
            Renderer::default().render(&event),
            "[2024-01-01T00:00:00+00:00] GET /x (host=h, from=1.2.3.4, len=0)"
        );
    }

    #[test]
    fn test_all_sections() {
        let rendered = Renderer::default().render(&sample_event());
        assert_eq!(
            rendered,
            "[2024-01-01T00:00:00+00:00] POST /hook (host=abc.requestcatcher.com, from=1.2.3.4, len=11)\n\
             Headers:\n\
             Accept: a, b\n\
             X-Token: x\n\
             Body:\n\
             hello world"
        );
    }

    #[test]
    fn test_body_without_headers() {
        let event = RequestEvent {
            body: "payload".into(),
            ..Default::default()
        };
        assert_eq!(
            Renderer::default().render(&event),
            "[]   (host=, from=, len=0)\nBody:\npayload"
        );
    }

    #[test]
    fn test_unparseable_time_passes_through() {
        let event = RequestEvent {
            time: Some("sometime".into()),
            ..Default::default()
        };
        assert!(Renderer::default().render(&event).starts_with("[sometime] "));
    }

    #[test]
    fn test_body_at_limit_is_verbatim() {
        let event = RequestEvent {
            body: "a".repeat(MAX_BODY_CHARS),
            ..Default::default()
        };
        let rendered = Renderer::default().render(&event);
        assert!(rendered.ends_with(&format!("Body:\n{}", "a".repeat(MAX_BODY_CHARS))));
        assert!(!rendered.contains("[truncated]"));
    }

    #[test]
    fn test_body_over_limit_is_truncated() {
        let event = RequestEvent {
            body: format!("{}b", "a".repeat(MAX_BODY_CHARS)),
            ..Default::default()
        };
        let rendered = Renderer::default().render(&event);
        assert!(rendered.ends_with(&format!(
            "Body:\n{}\n...[truncated]...",
            "a".repeat(MAX_BODY_CHARS)
        )));
        assert!(!rendered.contains('b'));
    }

    #[test]
    fn test_truncation_counts_chars_not_bytes() {
        let body = "é".repeat(5);
        assert_eq!(truncate_body(&body, 5), body);
        assert_eq!(truncate_body(&body, 3), format!("ééé{TRUNCATION_MARKER}"));
        assert_eq!(Renderer::new(3).max_body_chars(), 3);
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = Renderer::default();
        let event = sample_event();
        assert_eq!(renderer.render(&event), renderer.render(&event));
    }

    // ── Highlighter ─────────────────────────────────────────────────────

    #[test]
    fn test_empty_needle_is_none() {
        assert!(Highlighter::new("").is_none());
    }

    #[test]
    fn test_highlight_case_insensitive() {
        let hl = Highlighter::new("token").unwrap();
        assert_eq!(
            hl.apply("X-Token: TOKEN"),
            format!(
                "X-{HIGHLIGHT_START}Token{HIGHLIGHT_END}: {HIGHLIGHT_START}TOKEN{HIGHLIGHT_END}"
            )
        );
    }

    #[test]
    fn test_highlight_metacharacters_are_literal() {
        let hl = Highlighter::new("a.b*").unwrap();
        assert_eq!(hl.apply("axbb"), "axbb");
        assert_eq!(
            hl.apply("see a.b* here"),
            format!("see {HIGHLIGHT_START}a.b*{HIGHLIGHT_END} here")
        );
    }

    #[test]
    fn test_highlight_non_overlapping() {
        let hl = Highlighter::new("aa").unwrap();
        assert_eq!(
            hl.apply("aaa"),
            format!("{HIGHLIGHT_START}aa{HIGHLIGHT_END}a")
        );
    }

    #[test]
    fn test_highlight_no_match_is_identity() {
        let hl = Highlighter::new("zzz").unwrap();
        assert_eq!(hl.apply("nothing here"), "nothing here");
    }

    #[test]
    fn test_highlight_multibyte() {
        let hl = Highlighter::new("ÉTÉ").unwrap();
        assert_eq!(
            hl.apply("un été chaud"),
            format!("un {HIGHLIGHT_START}été{HIGHLIGHT_END} chaud")
        );
    }

    #[test]
    fn test_highlight_strip_restores_block() {
        let block = Renderer::default().render(&sample_event());
        let hl = Highlighter::new("A").unwrap();
        let lit = hl.apply(&block);
        assert_ne!(lit, block);
        assert_eq!(strip(&lit), block);
        assert_eq!(lit.lines().count(), block.lines().count());
    }
}
