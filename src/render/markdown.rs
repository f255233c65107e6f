//! Markdown backend.
//!
//! Inline markup arrives in Markdown syntax already, but wikitext is free to
//! carry raw HTML (`<b>`, `<br/>`, entity references), so every fragment goes
//! through [`cleanup`] before it is written.
//!
//! Documents open with YAML frontmatter:
//!
//! ```text
//! ---
//! title: "Main Page"
//! slug: "main-page"
//! latest_revision: "42"
//! latest_revision_timestamp: "2024-01-01T00:00:00Z"
//! categories:
//!   - "Birds"
//! ---
//! ```

use super::{CategoryRef, PageView, Renderer, revision_stem};
use crate::blocks::{ListEvent, ListKind};
use crate::table::{Cell, Table, TableLayout};
use crate::types::{OutputFormat, Page, Revision};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s+[^>]*href=["']([^"']+)["'][^>]*>(.*?)</a>"#).unwrap()
});
static STRONG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(?:strong|b)>(.*?)</(?:strong|b)>").unwrap());
static EM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(?:em|i)>(.*?)</(?:em|i)>").unwrap());
static ORPHAN_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+px\|link=(https?://[^\]]+)\]\]").unwrap());
static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Turn residual HTML in a fragment into Markdown text.
///
/// Anchors become links (internal `.html` targets are rewritten to `.md`),
/// `<strong>`/`<em>` become `**`/`*`, other tags are dropped, and entities
/// are decoded.
pub fn cleanup(text: &str) -> String {
    let text = ANCHOR_RE.replace_all(text, |caps: &Captures| {
        let href = &caps[1];
        let href = if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            href.replacen(".html", ".md", 1)
        };
        format!("[{}]({href})", &caps[2])
    });
    let text = STRONG_RE.replace_all(&text, "**$1**");
    let text = EM_RE.replace_all(&text, "*$1*");
    let text = ORPHAN_LINK_RE.replace_all(&text, |caps: &Captures| {
        let url = &caps[1];
        let label = if url.contains("youtube.com") || url.contains("youtu.be") {
            "YouTube"
        } else {
            "Link"
        };
        format!("[{label}]({url})")
    });
    let text = BREAK_RE.replace_all(&text, " ");
    let text = TAG_RE.replace_all(&text, "");
    html_escape::decode_html_entities(&text).replace('\u{a0}', " ")
}

/// Double-quoted YAML scalar.
pub fn yaml_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn frontmatter(fields: &[(&str, &str)], categories: &[CategoryRef]) -> String {
    let mut out = String::from("---\n");
    for (key, value) in fields {
        out.push_str(&format!("{key}: {}\n", yaml_quote(value)));
    }
    if !categories.is_empty() {
        out.push_str("categories:\n");
        for category in categories {
            out.push_str(&format!("  - {}\n", yaml_quote(&category.name)));
        }
    }
    out.push_str("---\n\n");
    out
}

/// Table cells cannot hold newlines or bare pipes.
fn table_cell(text: &str) -> String {
    cleanup(text)
        .replace('\n', " ")
        .replace('|', "\\|")
        .trim()
        .to_string()
}

fn pipe_row(cells: &[String]) -> String {
    format!("| {} |\n", cells.join(" | "))
}

fn cell_texts(row: &[Cell]) -> Vec<String> {
    row.iter().map(|c| table_cell(&c.text)).collect()
}

pub struct MarkdownRenderer;

impl MarkdownRenderer {
    fn grid_table(&self, out: &mut String, table: &Table) {
        let width = table.max_cols().max(1);
        let pad = |mut cells: Vec<String>| {
            cells.resize(width, String::new());
            cells
        };
        let (head, rest) = match table.rows.split_first() {
            Some((first, rest)) if table.has_header_row() => (pad(cell_texts(first)), rest),
            _ => (vec![String::new(); width], table.rows.as_slice()),
        };
        out.push_str(&pipe_row(&head));
        out.push_str(&pipe_row(&vec!["---".to_string(); width]));
        for row in rest {
            out.push_str(&pipe_row(&pad(cell_texts(row))));
        }
    }

    fn key_value_table(&self, out: &mut String, table: &Table) {
        out.push_str("| Key | Value |\n| --- | ----- |\n");
        for row in &table.rows {
            let cells = cell_texts(row);
            match cells.as_slice() {
                [key, value] => out.push_str(&format!("| {key} | {value} |\n")),
                others => out.push_str(&format!("| {} | |\n", others.join(" — "))),
            }
        }
    }
}

impl Renderer for MarkdownRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }

    fn heading(&self, out: &mut String, level: u8, text: &str, _anchor: &str) {
        out.push_str(&format!("{} {}\n\n", "#".repeat(level as usize), cleanup(text)));
    }

    fn paragraph(&self, out: &mut String, text: &str) {
        out.push_str(&cleanup(text));
        out.push_str("\n\n");
    }

    fn blank(&self, _out: &mut String) {}

    fn list_event(&self, out: &mut String, event: ListEvent) {
        if let ListEvent::CloseList { depth: 1, .. } = event {
            out.push('\n');
        }
    }

    fn list_item(&self, out: &mut String, kind: ListKind, depth: usize, text: &str) {
        let marker = match kind {
            ListKind::Unordered => "-",
            ListKind::Ordered => "1.",
        };
        out.push_str(&format!(
            "{}{marker} {}\n",
            "    ".repeat(depth.saturating_sub(1)),
            cleanup(text)
        ));
    }

    fn table(&self, out: &mut String, table: &Table) {
        if let Some(caption) = &table.caption {
            out.push_str(&format!("**{}**\n\n", cleanup(caption)));
        }
        match table.layout {
            TableLayout::KeyValue => self.key_value_table(out, table),
            TableLayout::Grid => self.grid_table(out, table),
        }
        out.push('\n');
    }

    fn collapsible(&self, out: &mut String, header: Option<&str>, inner: &str) {
        if let Some(header) = header {
            out.push_str(&format!("**{}**\n\n", cleanup(header)));
        }
        out.push_str(&cleanup(inner));
        out.push_str("\n\n");
    }

    fn redirect(&self, out: &mut String, link: &str) {
        out.push_str(&format!("Redirect to {}\n\n", cleanup(link)));
    }

    fn page_document(&self, view: &PageView<'_>) -> String {
        let page = view.page;
        let latest = page.latest_revision().filter(|_| view.revision_info);
        let mut fields = vec![("title", page.title.as_str()), ("slug", page.slug.as_str())];
        if let Some(rev) = latest {
            fields.push(("latest_revision", rev.id.as_str()));
            fields.push(("latest_revision_timestamp", rev.timestamp.as_str()));
        }
        let mut out = frontmatter(&fields, view.categories);
        out.push_str(&format!("# {}\n\n", page.title));
        if let Some(rev) = latest {
            out.push_str(&format!("_Latest revision {} @ {}_\n\n", rev.id, rev.timestamp));
            for older in page.older_revisions().iter().rev() {
                out.push_str(&format!(
                    "- [Revision {} @ {}]({}/{}.md)\n",
                    older.id,
                    older.timestamp,
                    page.slug,
                    revision_stem(older)
                ));
            }
            if !page.older_revisions().is_empty() {
                out.push('\n');
            }
        }
        out.push_str(view.body.trim_end());
        out.push('\n');
        if !view.categories.is_empty() {
            let links: Vec<String> = view
                .categories
                .iter()
                .map(|c| format!("[{}]({}.md)", c.name, c.slug))
                .collect();
            out.push_str(&format!("\n**Categories:** {}\n", links.join(", ")));
        }
        out
    }

    fn revision_document(&self, page: &Page, revision: &Revision, body: &str) -> String {
        let title = format!("{} (revision {})", page.title, revision.id);
        let mut out = frontmatter(
            &[
                ("title", title.as_str()),
                ("page", page.title.as_str()),
                ("slug", page.slug.as_str()),
                ("revision", revision.id.as_str()),
                ("revision_timestamp", revision.timestamp.as_str()),
            ],
            &[],
        );
        out.push_str(&format!("# {title}\n\n"));
        out.push_str(&format!(
            "[← Index](../index.md) · [Latest version](../{}.md)\n\n",
            page.slug
        ));
        out.push_str(&format!("_Revision {} @ {}_\n\n", revision.id, revision.timestamp));
        out.push_str(body.trim_end());
        out.push('\n');
        out
    }

    fn category_document(&self, category: &CategoryRef, members: &[&Page]) -> String {
        let title = format!("Category: {}", category.name);
        let mut out = frontmatter(
            &[
                ("title", title.as_str()),
                ("category", category.name.as_str()),
                ("slug", category.slug.as_str()),
            ],
            &[],
        );
        out.push_str(&format!("# {title}\n\n"));
        if members.is_empty() {
            out.push_str("No pages in this category.\n");
        }
        for page in members {
            out.push_str(&format!("- [{}]({}.md)\n", page.title, page.slug));
        }
        out
    }

    fn index_document(&self, pages: &[&Page], categories: &[CategoryRef]) -> String {
        let mut out = frontmatter(&[("title", "Pages Index")], &[]);
        out.push_str("# Pages\n\n");
        for page in pages {
            out.push_str(&format!("- [{}]({}.md)", page.title, page.slug));
            if let Some(target) = &page.redirect_target {
                out.push_str(&format!(" → {target}"));
            }
            out.push('\n');
        }
        if !categories.is_empty() {
            out.push_str("\n## Categories\n\n");
            for category in categories {
                out.push_str(&format!("- [{}]({}.md)\n", category.name, category.slug));
            }
        }
        out
    }
}
