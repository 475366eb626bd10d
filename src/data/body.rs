//! Decoding of captured response bodies for the body viewer.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// How a decoded body should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Styled plain text.
    Plain,
    /// Structured text, pretty-printed when it parses.
    Json,
    /// Markup shown as pre-wrapped source text. Never interpreted.
    Html,
}

/// A response body ready to be displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyView {
    pub kind: BodyKind,
    pub text: String,
    /// Whether the text was reformatted (false when shown as received).
    pub formatted: bool,
}

impl BodyView {
    /// Decode a base64 body and prepare it for display based on its content type.
    ///
    /// A payload that is not valid base64 is shown as the raw string; invalid
    /// UTF-8 is replaced lossily; JSON that fails to parse is shown unformatted.
    pub fn decode(encoded: &str, content_type: &str) -> Self {
        let raw = match STANDARD.decode(encoded.trim()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => encoded.to_string(),
        };

        let kind = kind_for(content_type);
        match kind {
            BodyKind::Json => match pretty_json(&raw) {
                Some(text) => Self {
                    kind,
                    text,
                    formatted: true,
                },
                None => Self {
                    kind,
                    text: raw,
                    formatted: false,
                },
            },
            _ => Self {
                kind,
                text: raw,
                formatted: false,
            },
        }
    }

    pub fn line_count(&self) -> usize {
        self.text.lines().count().max(1)
    }

    /// Width of the widest line, in characters.
    pub fn max_line_width(&self) -> usize {
        self.text.lines().map(|l| l.chars().count()).max().unwrap_or(0)
    }
}

fn kind_for(content_type: &str) -> BodyKind {
    let mime = content_type.trim().to_ascii_lowercase();
    if mime.starts_with("application/json") {
        BodyKind::Json
    } else if mime.starts_with("text/html") {
        BodyKind::Html
    } else {
        BodyKind::Plain
    }
}

fn pretty_json(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(s: &str) -> String {
        STANDARD.encode(s)
    }

    #[test]
    fn test_json_is_pretty_printed() {
        let view = BodyView::decode(&encode(r#"{"ok":true}"#), "application/json; charset=utf-8");
        assert_eq!(view.kind, BodyKind::Json);
        assert!(view.formatted);
        assert_eq!(view.text, "{\n  \"ok\": true\n}");
    }

    #[test]
    fn test_malformed_json_falls_back_to_raw() {
        let view = BodyView::decode(&encode("{not json"), "application/json");
        assert_eq!(view.kind, BodyKind::Json);
        assert!(!view.formatted);
        assert_eq!(view.text, "{not json");
    }

    #[test]
    fn test_html_is_kept_as_text() {
        let view = BodyView::decode(&encode("<h1>Down</h1>"), "text/html");
        assert_eq!(view.kind, BodyKind::Html);
        assert_eq!(view.text, "<h1>Down</h1>");
    }

    #[test]
    fn test_plain_text_and_dimensions() {
        let view = BodyView::decode(&encode("line one\nline two!"), "text/plain");
        assert_eq!(view.kind, BodyKind::Plain);
        assert_eq!(view.line_count(), 2);
        assert_eq!(view.max_line_width(), 9);
    }

    #[test]
    fn test_invalid_base64_shows_raw_string() {
        let view = BodyView::decode("dial tcp: connection refused", "");
        assert_eq!(view.text, "dial tcp: connection refused");
    }
}
