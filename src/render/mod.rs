//! Output backends.
//!
//! Both backends consume the same [`Block`] sequence through [`walk`], which
//! owns list nesting, so a backend only decides how each piece looks:
//!
//! | Backend | Page body | Documents |
//! |---------|-----------|-----------|
//! | [`html::HtmlRenderer`] | nested `ul`/`ol`, `table.wikitable`, `aside` infoboxes | maud templates sharing one head and footer |
//! | [`markdown::MarkdownRenderer`] | ATX headings, indented items, pipe tables | YAML frontmatter + body |

pub mod html;
pub mod markdown;

use crate::blocks::{Block, ListEvent, ListKind, ListStack};
use crate::config::OutputConfig;
use crate::slug::predict_slug;
use crate::table::Table;
use crate::types::{OutputFormat, Page, Revision};

/// A category as the documents see it.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRef {
    pub name: String,
    pub slug: String,
}

/// Everything needed to render one page document.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    pub page: &'a Page,
    /// Rendered body from [`walk`].
    pub body: &'a str,
    /// Sorted for display.
    pub categories: &'a [CategoryRef],
    /// Mention the latest revision and where older ones live.
    pub revision_info: bool,
}

/// One backend. Block methods append to `out`; document methods return a
/// complete file.
pub trait Renderer: Send + Sync {
    fn format(&self) -> OutputFormat;

    fn heading(&self, out: &mut String, level: u8, text: &str, anchor: &str);
    fn paragraph(&self, out: &mut String, text: &str);
    fn blank(&self, out: &mut String);
    fn list_event(&self, out: &mut String, event: ListEvent);
    fn list_item(&self, out: &mut String, kind: ListKind, depth: usize, text: &str);
    fn table(&self, out: &mut String, table: &Table);
    fn collapsible(&self, out: &mut String, header: Option<&str>, inner: &str);
    fn redirect(&self, out: &mut String, link: &str);

    fn page_document(&self, view: &PageView<'_>) -> String;
    fn revision_document(&self, page: &Page, revision: &Revision, body: &str) -> String;
    fn category_document(&self, category: &CategoryRef, members: &[&Page]) -> String;
    fn index_document(&self, pages: &[&Page], categories: &[CategoryRef]) -> String;
}

/// Render a block sequence into a page body.
pub fn walk(renderer: &dyn Renderer, blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut lists = ListStack::default();
    for block in blocks {
        if let Block::ListItem { depth, kind, text } = block {
            for event in lists.item(*depth, *kind) {
                renderer.list_event(&mut out, event);
            }
            renderer.list_item(&mut out, *kind, lists.depth(), text);
            continue;
        }
        for event in lists.close_all() {
            renderer.list_event(&mut out, event);
        }
        match block {
            Block::Heading {
                level,
                text,
                anchor,
            } => renderer.heading(&mut out, *level, text, anchor),
            Block::Paragraph(text) => renderer.paragraph(&mut out, text),
            Block::Table(table) => renderer.table(&mut out, table),
            Block::Collapsible { header, inner } => {
                renderer.collapsible(&mut out, header.as_deref(), inner)
            }
            Block::Redirect { link } => renderer.redirect(&mut out, link),
            Block::Blank => renderer.blank(&mut out),
            Block::ListItem { .. } => {}
        }
    }
    for event in lists.close_all() {
        renderer.list_event(&mut out, event);
    }
    out
}

/// Backend for `format`.
pub fn renderer_for(format: OutputFormat, output: &OutputConfig) -> Box<dyn Renderer> {
    match format {
        OutputFormat::Html => Box::new(html::HtmlRenderer::new(output)),
        OutputFormat::Markdown => Box::new(markdown::MarkdownRenderer),
    }
}

/// File stem of an older revision inside its page's folder.
pub fn revision_stem(revision: &Revision) -> String {
    predict_slug(&revision.id)
}

/// Sort by title, ignoring case; ties keep their input order.
pub fn sort_pages_by_title(pages: &mut [&Page]) {
    pages.sort_by_cached_key(|p| p.title.to_lowercase());
}
