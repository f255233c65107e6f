//! Line-oriented block parsing.
//!
//! A page body is cut into [`Block`]s in a single forward pass. Tables and
//! collapsible `<div>`s are multi-line runs: once opened, lines accumulate
//! until the closing line and the run is then parsed as a whole. Everything
//! else is decided line by line:
//!
//! 1. category links are stripped and recorded
//! 2. blank line → [`Block::Blank`]
//! 3. `== Heading ==`
//! 4. `*` / `#` list items
//! 5. paragraph
//!
//! Before that, `#REDIRECT [[Target]]` short-circuits the whole page and
//! innermost `{{templates}}` are removed.

use crate::config::{ImagesConfig, SiteConfig};
use crate::inline::InlineTransformer;
use crate::slug::{SlugRegistry, heading_id, normalize_category_name};
use crate::table::{Table, parse_table};
use crate::types::OutputFormat;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::warn;

static REDIRECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*#redirect\s*:?\s*\[\[([^\]]+)\]\]").unwrap());
static TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{[^{}]*\}\}").unwrap());
static CATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[\[Category:([^|\]]+)(?:\|[^\]]*)?\]\]").unwrap()
});
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(=+)([^=].*?)(=+)\s*$").unwrap());
static LIST_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([*#]+)\s*(.*)$").unwrap());
static COLLAPSIBLE_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<div[^>]*class=["'][^"']*collapsible[^"']*["'][^>]*>"#).unwrap()
});
static DIV_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^<div[^>]*>").unwrap());
static DIV_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</div>\s*$").unwrap());
static COLLAPSIBLE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(strong|b|h[1-6])\b[^>]*>(.*?)</(strong|b|h[1-6])\s*>").unwrap()
});

/// Kind of list a `*` or `#` run opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn from_marker(marker: char) -> Self {
        if marker == '#' {
            ListKind::Ordered
        } else {
            ListKind::Unordered
        }
    }
}

/// One structural unit of a converted page. Text fields hold backend markup
/// already produced by the inline transform; heading text is raw.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        text: String,
        anchor: String,
    },
    Paragraph(String),
    ListItem {
        depth: usize,
        kind: ListKind,
        text: String,
    },
    Table(Table),
    Collapsible {
        header: Option<String>,
        inner: String,
    },
    /// Sole block of a redirect page: the link to its target.
    Redirect {
        link: String,
    },
    Blank,
}

/// Result of converting one page body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversion {
    pub blocks: Vec<Block>,
    /// First-seen order, deduplicated.
    pub categories: Vec<String>,
    pub redirect: Option<String>,
}

// =============================================================================
// Nested list bookkeeping
// =============================================================================

/// Structural list transition, consumed by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEvent {
    OpenList { kind: ListKind, depth: usize },
    CloseList { kind: ListKind, depth: usize },
    OpenItem { kind: ListKind, depth: usize },
    CloseItem { kind: ListKind, depth: usize },
}

#[derive(Debug, Clone, Copy)]
struct ListLevel {
    kind: ListKind,
    item_open: bool,
}

/// Stack of open list contexts.
///
/// Every item is preceded by exactly the events needed to reach its depth and
/// kind, so `* a\n** b\n* c` yields
/// `<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>`.
#[derive(Debug, Default)]
pub struct ListStack {
    levels: Vec<ListLevel>,
}

impl ListStack {
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    fn pop(&mut self, events: &mut Vec<ListEvent>) {
        let depth = self.levels.len();
        if let Some(level) = self.levels.pop() {
            if level.item_open {
                events.push(ListEvent::CloseItem {
                    kind: level.kind,
                    depth,
                });
            }
            events.push(ListEvent::CloseList {
                kind: level.kind,
                depth,
            });
        }
    }

    fn push(&mut self, kind: ListKind, events: &mut Vec<ListEvent>) {
        self.levels.push(ListLevel {
            kind,
            item_open: false,
        });
        events.push(ListEvent::OpenList {
            kind,
            depth: self.levels.len(),
        });
    }

    /// Events leading up to a new item at `depth` (minimum 1).
    pub fn item(&mut self, depth: usize, kind: ListKind) -> Vec<ListEvent> {
        let depth = depth.max(1);
        let mut events = Vec::new();
        while self.levels.len() > depth {
            self.pop(&mut events);
        }
        while self.levels.len() < depth {
            self.push(kind, &mut events);
        }
        if self.levels.last().is_some_and(|l| l.kind != kind) {
            self.pop(&mut events);
            self.push(kind, &mut events);
        }
        if let Some(level) = self.levels.last_mut() {
            if level.item_open {
                events.push(ListEvent::CloseItem { kind, depth });
            }
            level.item_open = true;
        }
        events.push(ListEvent::OpenItem { kind, depth });
        events
    }

    /// Events closing every open list.
    pub fn close_all(&mut self) -> Vec<ListEvent> {
        let mut events = Vec::new();
        while !self.levels.is_empty() {
            self.pop(&mut events);
        }
        events
    }
}

// =============================================================================
// Pre-passes
// =============================================================================

/// Remove innermost `{{…}}` spans, up to `passes` rounds.
pub fn strip_templates(text: &str, passes: usize) -> String {
    let mut text = text.to_string();
    for _ in 0..passes {
        let next = TEMPLATE_RE.replace_all(&text, "");
        if next == text {
            break;
        }
        text = next.into_owned();
    }
    text
}

/// Target of a `#REDIRECT [[…]]` page, without any `|label`.
pub fn redirect_target(text: &str) -> Option<String> {
    REDIRECT_RE.captures(text).map(|caps| {
        let target = &caps[1];
        target
            .split_once('|')
            .map_or(target, |(t, _)| t)
            .trim()
            .to_string()
    })
}

/// Ordered, deduplicated category names.
#[derive(Debug, Default)]
struct CategoryRecorder {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl CategoryRecorder {
    fn record(&mut self, raw: &str) {
        let name = normalize_category_name(raw);
        if !name.is_empty() && self.seen.insert(name.clone()) {
            self.names.push(name);
        }
    }

    /// Remove category links from `line`, recording their names.
    fn strip(&mut self, line: &str) -> String {
        CATEGORY_RE
            .replace_all(line, |caps: &regex::Captures| {
                self.record(&caps[1]);
                ""
            })
            .into_owned()
    }
}

/// Every category a page's conversion will record, in first-seen order.
/// Used to allocate category slugs before any page is converted, so it
/// skips what conversion skips: collapsibles, table captions and
/// unterminated runs.
pub fn scan_categories(text: &str, config: &ConvertConfig) -> Vec<String> {
    let text = text.replace('\r', "");
    if redirect_target(&text).is_some() {
        return Vec::new();
    }
    let text = strip_templates(&text, config.template_passes);
    let mut recorder = CategoryRecorder::default();
    let mut runs = RunSplitter::default();
    for line in text.split('\n') {
        match runs.feed(line) {
            Some(Segment::Line(line)) => {
                recorder.strip(&line);
            }
            Some(Segment::Table(lines)) => {
                let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
                let mut table = parse_table(&lines, config.key_value_ratio);
                table.caption = None;
                table.map_text(|cell| recorder.strip(cell));
            }
            Some(Segment::Collapsible(_)) | None => {}
        }
    }
    recorder.names
}

// =============================================================================
// Block parser
// =============================================================================

/// Parser settings derived from [`SiteConfig`].
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub template_passes: usize,
    pub key_value_ratio: f64,
    pub images: ImagesConfig,
}

impl ConvertConfig {
    pub fn from_site_config(config: &SiteConfig) -> Self {
        Self {
            template_passes: config.parsing.template_passes,
            key_value_ratio: config.parsing.key_value_ratio,
            images: config.images.clone(),
        }
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self::from_site_config(&SiteConfig::default())
    }
}

#[derive(Default)]
enum Run {
    #[default]
    Normal,
    Table(Vec<String>),
    Collapsible(Vec<String>),
}

/// A unit of page text: one normal line or a complete multi-line run.
enum Segment {
    Line(String),
    Table(Vec<String>),
    Collapsible(Vec<String>),
}

/// Groups lines into table and collapsible runs.
#[derive(Default)]
struct RunSplitter {
    run: Run,
}

impl RunSplitter {
    /// Feed one line; returns a segment once one is complete.
    fn feed(&mut self, line: &str) -> Option<Segment> {
        match &mut self.run {
            Run::Table(lines) => {
                lines.push(line.to_string());
                if !line.trim().starts_with("|}") {
                    return None;
                }
                return match std::mem::take(&mut self.run) {
                    Run::Table(lines) => Some(Segment::Table(lines)),
                    _ => None,
                };
            }
            Run::Collapsible(lines) => {
                lines.push(line.to_string());
                if !line.to_lowercase().contains("</div>") {
                    return None;
                }
                return match std::mem::take(&mut self.run) {
                    Run::Collapsible(lines) => Some(Segment::Collapsible(lines)),
                    _ => None,
                };
            }
            Run::Normal => {}
        }

        if line.trim_start().starts_with("{|") {
            self.run = Run::Table(vec![line.to_string()]);
            return None;
        }
        if let Some(open) = COLLAPSIBLE_OPEN_RE.find(line) {
            if line[open.end()..].to_lowercase().contains("</div>") {
                return Some(Segment::Collapsible(vec![line.to_string()]));
            }
            self.run = Run::Collapsible(vec![line.to_string()]);
            return None;
        }
        Some(Segment::Line(line.to_string()))
    }

    /// Log and drop a run the text never closed.
    fn finish(self) {
        match self.run {
            Run::Table(lines) => warn!(lines = lines.len(), "dropping unterminated table"),
            Run::Collapsible(lines) => {
                warn!(lines = lines.len(), "dropping unterminated collapsible block")
            }
            Run::Normal => {}
        }
    }
}

/// Converts page bodies against a finished registry. Cheap to copy; each
/// [`convert`](BlockParser::convert) call keeps its own state.
#[derive(Clone, Copy)]
pub struct BlockParser<'a> {
    inline: InlineTransformer<'a>,
    config: &'a ConvertConfig,
}

impl<'a> BlockParser<'a> {
    pub fn new(registry: &'a SlugRegistry, config: &'a ConvertConfig, format: OutputFormat) -> Self {
        Self {
            inline: InlineTransformer::new(registry, &config.images, format),
            config,
        }
    }

    /// Prefix every internal link (revision documents live one level down).
    pub fn with_link_prefix(self, prefix: &'a str) -> Self {
        Self {
            inline: self.inline.with_link_prefix(prefix),
            ..self
        }
    }

    pub fn convert(&self, text: &str) -> Conversion {
        let text = text.replace('\r', "");
        if let Some(target) = redirect_target(&text) {
            let link = self.inline.link(&target, None);
            return Conversion {
                blocks: vec![Block::Redirect { link }],
                categories: Vec::new(),
                redirect: Some(target),
            };
        }

        let text = strip_templates(&text, self.config.template_passes);
        let mut state = PageState {
            parser: self,
            blocks: Vec::new(),
            categories: CategoryRecorder::default(),
            runs: RunSplitter::default(),
        };
        for line in text.split('\n') {
            state.feed(line);
        }
        state.finish()
    }
}

struct PageState<'p, 'a> {
    parser: &'p BlockParser<'a>,
    blocks: Vec<Block>,
    categories: CategoryRecorder,
    runs: RunSplitter,
}

impl PageState<'_, '_> {
    fn feed(&mut self, line: &str) {
        match self.runs.feed(line) {
            Some(Segment::Line(line)) => self.line(&line),
            Some(Segment::Table(lines)) => self.emit_table(&lines),
            Some(Segment::Collapsible(lines)) => self.emit_collapsible(&lines),
            None => {}
        }
    }

    fn line(&mut self, line: &str) {
        let line = self.categories.strip(line);
        if line.trim().is_empty() {
            self.blocks.push(Block::Blank);
            return;
        }
        if let Some(caps) = HEADING_RE.captures(&line) {
            let (open, close) = (caps[1].len(), caps[3].len());
            let level = open.min(close);
            let text = format!(
                "{}{}{}",
                "=".repeat(open - level),
                &caps[2],
                "=".repeat(close - level)
            );
            let text = text.trim().to_string();
            self.blocks.push(Block::Heading {
                level: level.min(6) as u8,
                anchor: heading_id(&text),
                text,
            });
            return;
        }
        if let Some(caps) = LIST_RE.captures(&line) {
            let markers = &caps[1];
            let kind = ListKind::from_marker(markers.chars().last().unwrap_or('*'));
            self.blocks.push(Block::ListItem {
                depth: markers.chars().count(),
                kind,
                text: self.parser.inline.transform(caps[2].trim_end()),
            });
            return;
        }
        self.blocks
            .push(Block::Paragraph(self.parser.inline.transform(line.trim_end())));
    }

    fn emit_table(&mut self, lines: &[String]) {
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        let mut table = parse_table(&lines, self.parser.config.key_value_ratio);
        let inline = self.parser.inline;
        let caption = table.caption.take();
        let mut table = table.map_text(|cell| inline.transform(&self.categories.strip(cell)));
        table.caption = caption.map(|c| inline.transform(&c));
        self.blocks.push(Block::Table(table));
    }

    fn emit_collapsible(&mut self, lines: &[String]) {
        let joined = lines.join("\n");
        let body = DIV_OPEN_RE.replace(joined.trim(), "");
        let mut body = DIV_CLOSE_RE.replace(&body, "").into_owned();

        let header = COLLAPSIBLE_HEADER_RE
            .captures_iter(&body)
            .find(|caps| caps[1].eq_ignore_ascii_case(&caps[3]))
            .and_then(|caps| {
                let whole = caps.get(0)?;
                Some((whole.range(), caps[2].trim().to_string()))
            });
        let header = header.map(|(range, text)| {
            body.replace_range(range, "");
            self.parser.inline.transform(&text)
        });

        let inner = self.parser.inline.transform(body.trim());
        self.blocks.push(Block::Collapsible { header, inner });
    }

    fn finish(self) -> Conversion {
        self.runs.finish();
        Conversion {
            blocks: self.blocks,
            categories: self.categories.names,
            redirect: None,
        }
    }
}
