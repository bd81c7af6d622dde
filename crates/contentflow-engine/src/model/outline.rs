//! Outline options and markdown heading extraction.

use serde::{Deserialize, Serialize};

/// Id reserved for the user-authored outline.
pub const CUSTOM_OUTLINE_ID: &str = "custom";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineHeading {
    /// 1 to 6
    pub level: u8,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedOutline {
    pub headings: Vec<OutlineHeading>,
}

impl ParsedOutline {
    /// Render the headings back to markdown, one per line.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        self.headings
            .iter()
            .map(|h| format!("{} {}", "#".repeat(usize::from(h.level)), h.title))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Extract `#`-style headings from markdown.
///
/// A heading is a line whose first non-blank characters are one to six `#`
/// followed by whitespace and a non-empty title. Everything else is body text.
///
/// ```rust
/// use contentflow_engine::model::parse_outline;
///
/// let parsed = parse_outline("# Intro\nsome text\n## Why compost\n####### too deep");
/// assert_eq!(parsed.headings.len(), 2);
/// assert_eq!(parsed.headings[1].level, 2);
/// ```
#[must_use]
pub fn parse_outline(content: &str) -> ParsedOutline {
    let headings = content
        .lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let level = line.chars().take_while(|c| *c == '#').count();
            if !(1..=6).contains(&level) {
                return None;
            }
            let rest = &line[level..];
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            let title = rest.trim();
            if title.is_empty() {
                return None;
            }
            Some(OutlineHeading {
                level: level as u8,
                title: title.to_string(),
            })
        })
        .collect();
    ParsedOutline { headings }
}

/// One outline candidate, generated or custom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineOption {
    pub id: String,
    pub content: String,
    pub parsed: ParsedOutline,
}

impl OutlineOption {
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let parsed = parse_outline(&content);
        Self {
            id: id.into(),
            content,
            parsed,
        }
    }

    /// User-authored outline.
    #[must_use]
    pub fn custom(content: impl Into<String>) -> Self {
        Self::new(CUSTOM_OUTLINE_ID, content)
    }

    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.id == CUSTOM_OUTLINE_ID
    }

    /// Replace the content; headings are re-derived.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.parsed = parse_outline(&self.content);
    }
}
