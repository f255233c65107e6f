//! HTML backend.
//!
//! Body fragments are plain strings (inline markup is already HTML); the
//! structured pieces and every document use [maud](https://maud.lambda.xyz/)
//! so titles and names are escaped automatically.
//!
//! ## Output Structure
//!
//! ```text
//! out/
//! ├── index.html               # pages + categories
//! ├── main-page.html           # one per page
//! ├── category-birds.html      # one per category
//! └── main-page/
//!     └── 41.html              # older revisions (--dump-old-revisions)
//! ```

use super::{CategoryRef, PageView, Renderer, revision_stem};
use crate::blocks::{ListEvent, ListKind};
use crate::config::OutputConfig;
use crate::table::{Cell, Table, TableLayout};
use crate::types::{OutputFormat, Page, Revision};
use html_escape::{encode_double_quoted_attribute, encode_text};
use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS_STATIC: &str = include_str!("../../static/wiki.css");

pub struct HtmlRenderer {
    stylesheet: String,
    footer: String,
}

impl HtmlRenderer {
    pub fn new(output: &OutputConfig) -> Self {
        Self {
            stylesheet: output.stylesheet.clone(),
            footer: output.footer.clone(),
        }
    }

    /// Shared head, container and footer.
    fn base_document(&self, title: &str, content: Markup) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="UTF-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    title { (title) }
                    link rel="stylesheet" href=(self.stylesheet);
                    style { (PreEscaped(CSS_STATIC)) }
                }
                body {
                    main.container {
                        (content)
                    }
                    footer.container {
                        small { (self.footer) }
                    }
                }
            }
        }
    }
}

fn breadcrumb(prefix: &str, extra: Option<(&str, &str)>) -> Markup {
    html! {
        nav.breadcrumb {
            a href={ (prefix) "index.html" } { "← Index" }
            @if let Some((href, label)) = extra {
                " · "
                a href=(href) { (label) }
            }
        }
    }
}

fn grid_table(table: &Table) -> Markup {
    let (head, rest) = match table.rows.split_first() {
        Some((first, rest)) if table.has_header_row() => (Some(first), rest),
        _ => (None, table.rows.as_slice()),
    };
    html! {
        table.wikitable {
            @if let Some(caption) = &table.caption {
                caption { (PreEscaped(caption)) }
            }
            @if let Some(head) = head {
                thead {
                    tr {
                        @for cell in head {
                            th { (PreEscaped(&cell.text)) }
                        }
                    }
                }
            }
            tbody {
                @for row in rest {
                    tr {
                        @for cell in row {
                            @if cell.header {
                                th { (PreEscaped(&cell.text)) }
                            } @else {
                                td { (PreEscaped(&cell.text)) }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn key_value_table(table: &Table) -> Markup {
    html! {
        aside.collapsible.infobox {
            @if let Some(caption) = &table.caption {
                header { strong { (PreEscaped(caption)) } }
            }
            dl {
                @for row in &table.rows {
                    @match row.as_slice() {
                        [key, value] => {
                            dt { (PreEscaped(&key.text)) }
                            dd { (PreEscaped(&value.text)) }
                        }
                        [single] => {
                            dt.section { (PreEscaped(&single.text)) }
                        }
                        cells => {
                            dd.wide {
                                (PreEscaped(join_cells(cells)))
                            }
                        }
                    }
                }
            }
        }
    }
}

fn join_cells(cells: &[Cell]) -> String {
    cells
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" — ")
}

fn category_footer(categories: &[CategoryRef], ext: &str) -> Markup {
    html! {
        @if !categories.is_empty() {
            section.categories {
                strong { "Categories:" }
                " "
                @for (i, category) in categories.iter().enumerate() {
                    @if i > 0 { " · " }
                    a href={ (category.slug) "." (ext) } { (category.name) }
                }
            }
        }
    }
}

impl Renderer for HtmlRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Html
    }

    fn heading(&self, out: &mut String, level: u8, text: &str, anchor: &str) {
        out.push_str(&format!(
            "<h{level} id=\"{}\">{}</h{level}>\n",
            encode_double_quoted_attribute(anchor),
            encode_text(text)
        ));
    }

    fn paragraph(&self, out: &mut String, text: &str) {
        out.push_str(&format!("<p>{text}</p>\n"));
    }

    fn blank(&self, out: &mut String) {
        out.push('\n');
    }

    fn list_event(&self, out: &mut String, event: ListEvent) {
        match event {
            ListEvent::OpenList { kind, .. } => out.push_str(match kind {
                ListKind::Unordered => "<ul>",
                ListKind::Ordered => "<ol>",
            }),
            ListEvent::CloseList { kind, depth } => {
                out.push_str(match kind {
                    ListKind::Unordered => "</ul>",
                    ListKind::Ordered => "</ol>",
                });
                if depth == 1 {
                    out.push('\n');
                }
            }
            ListEvent::OpenItem { .. } => out.push_str("<li>"),
            ListEvent::CloseItem { .. } => out.push_str("</li>"),
        }
    }

    fn list_item(&self, out: &mut String, _kind: ListKind, _depth: usize, text: &str) {
        out.push_str(text);
    }

    fn table(&self, out: &mut String, table: &Table) {
        let markup = match table.layout {
            TableLayout::KeyValue => key_value_table(table),
            TableLayout::Grid => grid_table(table),
        };
        out.push_str(&markup.into_string());
        out.push('\n');
    }

    fn collapsible(&self, out: &mut String, header: Option<&str>, inner: &str) {
        let markup = html! {
            aside.collapsible {
                @if let Some(header) = header {
                    header { strong { (PreEscaped(header)) } }
                }
                div.collapsible-body { (PreEscaped(inner)) }
            }
        };
        out.push_str(&markup.into_string());
        out.push('\n');
    }

    fn redirect(&self, out: &mut String, link: &str) {
        let markup = html! {
            div.redirectbox {
                "Redirect to " (PreEscaped(link))
            }
        };
        out.push_str(&markup.into_string());
        out.push('\n');
    }

    fn page_document(&self, view: &PageView<'_>) -> String {
        let page = view.page;
        let latest = page.latest_revision().filter(|_| view.revision_info);
        let content = html! {
            (breadcrumb("", None))
            h1 { (page.title) }
            @if let Some(rev) = latest {
                div.revinfo {
                    "Latest revision " (rev.id) " @ " (rev.timestamp)
                    @if !page.older_revisions().is_empty() {
                        ul {
                            @for older in page.older_revisions().iter().rev() {
                                li {
                                    a href={ (page.slug) "/" (revision_stem(older)) ".html" } {
                                        "Revision " (older.id) " @ " (older.timestamp)
                                    }
                                }
                            }
                        }
                    }
                }
            }
            article {
                (PreEscaped(view.body))
            }
            (category_footer(view.categories, "html"))
        };
        self.base_document(&page.title, content).into_string()
    }

    fn revision_document(&self, page: &Page, revision: &Revision, body: &str) -> String {
        let title = format!("{} (revision {})", page.title, revision.id);
        let latest_href = format!("../{}.html", page.slug);
        let content = html! {
            (breadcrumb("../", Some((&latest_href, "Latest version"))))
            h1 { (title) }
            div.revinfo { "Revision " (revision.id) " @ " (revision.timestamp) }
            article {
                (PreEscaped(body))
            }
        };
        self.base_document(&title, content).into_string()
    }

    fn category_document(&self, category: &CategoryRef, members: &[&Page]) -> String {
        let title = format!("Category: {}", category.name);
        let content = html! {
            (breadcrumb("", None))
            h1 { (title) }
            @if members.is_empty() {
                p { "No pages in this category." }
            } @else {
                ul {
                    @for page in members {
                        li { a href={ (page.slug) ".html" } { (page.title) } }
                    }
                }
            }
        };
        self.base_document(&title, content).into_string()
    }

    fn index_document(&self, pages: &[&Page], categories: &[CategoryRef]) -> String {
        let content = html! {
            h1 { "Pages" }
            ul {
                @for page in pages {
                    li {
                        a href={ (page.slug) ".html" } { (page.title) }
                        @if let Some(target) = &page.redirect_target {
                            " → " (target)
                        }
                    }
                }
            }
            @if !categories.is_empty() {
                h2 { "Categories" }
                ul {
                    @for category in categories {
                        li { a href={ (category.slug) ".html" } { (category.name) } }
                    }
                }
            }
        };
        self.base_document("Pages Index", content).into_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::walk;
    use crate::test_helpers::{convert_html, page_with_revisions};

    fn renderer() -> HtmlRenderer {
        HtmlRenderer::new(&OutputConfig::default())
    }

    fn cell(text: &str, header: bool) -> Cell {
        Cell {
            text: text.to_string(),
            header,
        }
    }

    #[test]
    fn heading_has_id_and_escaped_text() {
        let mut out = String::new();
        renderer().heading(&mut out, 2, "Fish & <Chips>", "fish-chips");
        assert_eq!(out, "<h2 id=\"fish-chips\">Fish &amp; &lt;Chips&gt;</h2>\n");
    }

    #[test]
    fn grid_table_with_header_row() {
        let table = Table {
            caption: Some("Scores".to_string()),
            rows: vec![
                vec![cell("Name", true), cell("Score", true)],
                vec![cell("A", false), cell("1", false)],
                vec![cell("B", false), cell("2", false), cell("x", false)],
            ],
            layout: TableLayout::Grid,
        };
        let mut out = String::new();
        renderer().table(&mut out, &table);
        assert!(out.starts_with("<table class=\"wikitable\"><caption>Scores</caption><thead>"));
        assert!(out.contains("<thead><tr><th>Name</th><th>Score</th></tr></thead>"));
        assert!(out.contains("<tr><td>A</td><td>1</td></tr>"));
    }

    #[test]
    fn grid_table_without_header_row() {
        let table = Table {
            caption: None,
            rows: vec![vec![cell("a", false), cell("b", false), cell("c", false)]],
            layout: TableLayout::Grid,
        };
        let mut out = String::new();
        renderer().table(&mut out, &table);
        assert!(!out.contains("<thead>"));
        assert!(out.contains("<tbody><tr><td>a</td><td>b</td><td>c</td></tr></tbody>"));
    }

    #[test]
    fn key_value_table_is_an_infobox() {
        let body = walk(
            &renderer(),
            &convert_html("{|\n|+ Facts\n| Born || 1900\n|-\n| Died || 1980\n|-\n| a || b || c\n|}").blocks,
        );
        assert!(body.starts_with("<aside class=\"collapsible infobox\"><header><strong>Facts</strong></header><dl>"));
        assert!(body.contains("<dt>Born</dt><dd>1900</dd>"));
        assert!(body.contains("<dd class=\"wide\">a — b — c</dd>"));
    }

    #[test]
    fn collapsible_and_redirect_blocks() {
        let body = walk(
            &renderer(),
            &convert_html("<div class=\"collapsible\">\n<b>More</b>\nHidden text\n</div>").blocks,
        );
        assert_eq!(
            body,
            "<aside class=\"collapsible\"><header><strong>More</strong></header><div class=\"collapsible-body\">Hidden text</div></aside>\n"
        );

        let body = walk(&renderer(), &convert_html("#REDIRECT [[Main Page]]").blocks);
        assert_eq!(
            body,
            "<div class=\"redirectbox\">Redirect to <a href=\"main-page.html\">Main Page</a></div>\n"
        );
    }

    #[test]
    fn page_document_structure() {
        let page = page_with_revisions("Main Page", &[("41", "old"), ("42", "new")]);
        let categories = vec![CategoryRef {
            name: "Birds".to_string(),
            slug: "category-birds".to_string(),
        }];
        let view = PageView {
            page: &page,
            body: "<p>Hello</p>",
            categories: &categories,
            revision_info: true,
        };
        let doc = renderer().page_document(&view);
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<meta charset=\"UTF-8\">"));
        assert!(doc.contains("<title>Main Page</title>"));
        assert!(doc.contains("pico"));
        assert!(doc.contains("<a href=\"index.html\">← Index</a>"));
        assert!(doc.contains("Latest revision 42 @ "));
        assert!(doc.contains("href=\"main-page/41.html\""));
        assert!(doc.contains("<article><p>Hello</p></article>"));
        assert!(doc.contains("<a href=\"category-birds.html\">Birds</a>"));
        assert!(doc.contains("Generated from MediaWiki dump."));
    }

    #[test]
    fn page_document_hides_revision_info_by_default() {
        let page = page_with_revisions("Solo", &[("1", "text")]);
        let view = PageView {
            page: &page,
            body: "",
            categories: &[],
            revision_info: false,
        };
        let doc = renderer().page_document(&view);
        assert!(!doc.contains("class=\"revinfo\""));
        assert!(!doc.contains("class=\"categories\""));
    }

    #[test]
    fn revision_document_links_up() {
        let page = page_with_revisions("Main Page", &[("41", "old"), ("42", "new")]);
        let doc = renderer().revision_document(&page, &page.revisions[0], "<p>old</p>");
        assert!(doc.contains("<title>Main Page (revision 41)</title>"));
        assert!(doc.contains("href=\"../index.html\""));
        assert!(doc.contains("href=\"../main-page.html\""));
    }

    #[test]
    fn category_and_index_documents() {
        let a = page_with_revisions("Alpha & Omega", &[("1", "")]);
        let category = CategoryRef {
            name: "Letters".to_string(),
            slug: "category-letters".to_string(),
        };
        let doc = renderer().category_document(&category, &[&a]);
        assert!(doc.contains("<h1>Category: Letters</h1>"));
        assert!(doc.contains("<a href=\"alpha-omega.html\">Alpha &amp; Omega</a>"));

        let doc = renderer().index_document(&[&a], &[category]);
        assert!(doc.contains("<h2>Categories</h2>"));
        assert!(doc.contains("<a href=\"category-letters.html\">Letters</a>"));
    }
}
