//! Shared types used across all pipeline stages.
//!
//! Pages come out of the dump reader as [`RawPage`]s, receive a slug in the
//! first pass, and are filled in with categories and redirect targets by the
//! conversion pass. Everything here is serializable so the pipeline summary
//! can be written as `manifest.json`.

use serde::{Deserialize, Serialize};

/// One revision of a page as it appears in the dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    /// Revision id (`<revision><id>`), `"0"` when the dump omits it.
    pub id: String,
    /// ISO8601 timestamp. Compared lexically, which matches chronological
    /// order for MediaWiki timestamps.
    pub timestamp: String,
    /// Raw wikitext body.
    pub text: String,
}

/// A page as produced by the dump reader: title plus revisions, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage {
    pub title: String,
    pub revisions: Vec<Revision>,
}

impl RawPage {
    /// Text of the newest revision, empty if there is none.
    pub fn latest_text(&self) -> &str {
        self.revisions.last().map(|r| r.text.as_str()).unwrap_or("")
    }
}

/// A page after slug assignment.
///
/// `categories` and `redirect_target` are populated by the conversion pass
/// and never change afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// Display title, verbatim from the dump
    pub title: String,
    /// Unique URL-safe identifier; also the output file stem
    pub slug: String,
    /// Latest revision body
    #[serde(skip)]
    pub text: String,
    /// Category names in first-seen order, deduplicated
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    /// Target of a `#REDIRECT` page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_target: Option<String>,
    /// All retained revisions, oldest first. The last one is the latest.
    #[serde(skip)]
    pub revisions: Vec<Revision>,
}

impl Page {
    pub fn new(raw: RawPage, slug: String) -> Self {
        Self {
            text: raw.latest_text().to_string(),
            title: raw.title,
            slug,
            categories: Vec::new(),
            redirect_target: None,
            revisions: raw.revisions,
        }
    }

    /// The newest revision, if any.
    pub fn latest_revision(&self) -> Option<&Revision> {
        self.revisions.last()
    }

    /// Revisions older than the latest one.
    pub fn older_revisions(&self) -> &[Revision] {
        match self.revisions.split_last() {
            Some((_, older)) => older,
            None => &[],
        }
    }
}

/// Output backend selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Html,
    Markdown,
}

impl OutputFormat {
    /// File extension of generated documents.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rev(id: &str, text: &str) -> Revision {
        Revision {
            id: id.to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn latest_text_is_last_revision() {
        let raw = RawPage {
            title: "A".to_string(),
            revisions: vec![rev("1", "old"), rev("2", "new")],
        };
        assert_eq!(raw.latest_text(), "new");
    }

    #[test]
    fn latest_text_empty_without_revisions() {
        let raw = RawPage {
            title: "A".to_string(),
            revisions: vec![],
        };
        assert_eq!(raw.latest_text(), "");
    }

    #[test]
    fn older_revisions_excludes_latest() {
        let raw = RawPage {
            title: "A".to_string(),
            revisions: vec![rev("1", "a"), rev("2", "b"), rev("3", "c")],
        };
        let page = Page::new(raw, "a".to_string());
        let ids: Vec<&str> = page.older_revisions().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
        assert_eq!(page.latest_revision().map(|r| r.id.as_str()), Some("3"));
        assert_eq!(page.text, "c");
    }

    #[test]
    fn format_extensions() {
        assert_eq!(OutputFormat::Html.extension(), "html");
        assert_eq!(OutputFormat::Markdown.extension(), "md");
    }
}
