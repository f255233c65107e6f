//! Inline wikitext markup: links, file embeds, and emphasis.
//!
//! Stages run in a fixed order over each text fragment:
//!
//! 1. `[[File:…]]` / `[[Image:…]]` embeds
//! 2. `[[…]]` links (category, absolute URL, internal page, `#section`)
//! 3. `[url label]` external links
//! 4. `'''''bold italic'''''`, `'''bold'''`, `''italic''`
//!
//! Markup produced by a stage is parked behind a private-use token until the
//! end, so later stages never re-match or re-escape it. Emphasis captures are
//! escaped and not scanned again, so emphasis does not nest; an unterminated
//! run (`'''text`) stays literal.

use crate::config::ImagesConfig;
use crate::file_embed::{FileEmbedSpec, parse_file_embed, strip_file_namespace};
use crate::slug::{SlugRegistry, heading_id, normalize_category_name, normalize_title, predict_slug};
use crate::types::OutputFormat;
use html_escape::{encode_double_quoted_attribute, encode_text};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[\[((?:File|Image):[^\]]+)\]\]").unwrap());
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]|]+?)(?:\|([^\]]+))?\]\]").unwrap());
static EXTERNAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(https?://[^\s\]]+)(?:\s+([^\]]+))?\]").unwrap());
static BOLD_ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'''''(.*?)'''''").unwrap());
static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'''(.*?)'''").unwrap());
static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"''(.*?)''").unwrap());
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E000}([0-9]+)\u{E001}").unwrap());

const TOKEN_OPEN: char = '\u{E000}';
const TOKEN_CLOSE: char = '\u{E001}';

/// Generated fragments awaiting restoration.
#[derive(Default)]
struct Stash {
    fragments: Vec<String>,
}

impl Stash {
    fn keep(&mut self, fragment: String) -> String {
        self.fragments.push(fragment);
        format!("{TOKEN_OPEN}{}{TOKEN_CLOSE}", self.fragments.len() - 1)
    }

    /// Replace tokens until none remain; fragments may themselves contain
    /// tokens from earlier stages.
    fn restore(&self, text: &str) -> String {
        let mut out = text.to_string();
        for _ in 0..=self.fragments.len() {
            if !out.contains(TOKEN_OPEN) {
                break;
            }
            out = TOKEN_RE
                .replace_all(&out, |caps: &Captures| {
                    caps[1]
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| self.fragments.get(i))
                        .cloned()
                        .unwrap_or_default()
                })
                .into_owned();
        }
        out
    }
}

#[derive(Clone, Copy)]
enum Emphasis {
    BoldItalic,
    Bold,
    Italic,
}

/// Where a `[[…]]` link points once resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLink {
    pub href: String,
    /// False for targets with no page in the dump.
    pub exists: bool,
}

/// Per-backend inline converter bound to a finished slug registry.
#[derive(Clone, Copy)]
pub struct InlineTransformer<'a> {
    registry: &'a SlugRegistry,
    images: &'a ImagesConfig,
    format: OutputFormat,
    /// Prepended to every internal href (`"../"` inside revision folders).
    link_prefix: &'a str,
}

impl<'a> InlineTransformer<'a> {
    pub fn new(registry: &'a SlugRegistry, images: &'a ImagesConfig, format: OutputFormat) -> Self {
        Self {
            registry,
            images,
            format,
            link_prefix: "",
        }
    }

    pub fn with_link_prefix(self, link_prefix: &'a str) -> Self {
        Self {
            link_prefix,
            ..self
        }
    }

    /// Convert one fragment of wikitext.
    pub fn transform(&self, text: &str) -> String {
        let mut stash = Stash::default();
        let text = text.replace([TOKEN_OPEN, TOKEN_CLOSE], "");

        let text = FILE_RE.replace_all(&text, |caps: &Captures| {
            stash.keep(self.file_embed(&caps[1]))
        });
        let text = LINK_RE.replace_all(&text, |caps: &Captures| {
            stash.keep(self.wiki_link(&caps[1], caps.get(2).map(|m| m.as_str())))
        });
        let text = EXTERNAL_RE.replace_all(&text, |caps: &Captures| {
            let url = &caps[1];
            let label = caps.get(2).map_or(url, |m| m.as_str().trim());
            stash.keep(self.anchor(url, label, None))
        });

        let mut text = text.into_owned();
        for (re, kind) in [
            (&*BOLD_ITALIC_RE, Emphasis::BoldItalic),
            (&*BOLD_RE, Emphasis::Bold),
            (&*ITALIC_RE, Emphasis::Italic),
        ] {
            text = re
                .replace_all(&text, |caps: &Captures| {
                    stash.keep(self.emphasis(kind, &caps[1]))
                })
                .into_owned();
        }

        stash.restore(&text)
    }

    /// Resolve a page title (optionally with `#fragment`) to an href.
    pub fn resolve_page(&self, target: &str) -> ResolvedLink {
        let (base, fragment) = match target.split_once('#') {
            Some((base, frag)) => (base.trim(), Some(frag.trim())),
            None => (target.trim(), None),
        };
        let anchor = fragment
            .map(|f| format!("#{}", heading_id(f)))
            .unwrap_or_default();
        if base.is_empty() {
            return ResolvedLink {
                href: if anchor.is_empty() { "#".to_string() } else { anchor },
                exists: true,
            };
        }
        let (slug, exists) = match self.registry.resolve(base) {
            Some(slug) => (slug.to_string(), true),
            None => (predict_slug(&normalize_title(base)), false),
        };
        ResolvedLink {
            href: format!(
                "{}{slug}.{}{anchor}",
                self.link_prefix,
                self.format.extension()
            ),
            exists,
        }
    }

    /// Href of a category listing document.
    pub fn category_href(&self, name: &str) -> String {
        format!(
            "{}{}.{}",
            self.link_prefix,
            self.registry.category_slug(&normalize_category_name(name)),
            self.format.extension()
        )
    }

    /// Render a resolved link target as the backend's link syntax.
    pub fn link(&self, target: &str, label: Option<&str>) -> String {
        let label = label.unwrap_or(target);
        let resolved = self.resolve_page(target);
        let class = (!resolved.exists).then_some("missing");
        self.anchor(&resolved.href, label, class)
    }

    fn anchor(&self, href: &str, label: &str, class: Option<&str>) -> String {
        match self.format {
            OutputFormat::Html => {
                let class_attr = class
                    .map(|c| format!(" class=\"{c}\""))
                    .unwrap_or_default();
                format!(
                    "<a{class_attr} href=\"{}\">{}</a>",
                    encode_double_quoted_attribute(href),
                    encode_text(label)
                )
            }
            OutputFormat::Markdown => format!("[{}]({href})", encode_text(label)),
        }
    }

    fn wiki_link(&self, raw_target: &str, raw_label: Option<&str>) -> String {
        let (target, escaped) = match raw_target.trim().strip_prefix(':') {
            Some(rest) => (rest.trim(), true),
            None => (raw_target.trim(), false),
        };
        let label = raw_label.map(str::trim).unwrap_or(target);

        // A file reference that survived the embed stage shows as plain text.
        if !escaped && strip_file_namespace(target).is_some() {
            return encode_text(label).into_owned();
        }
        if target.starts_with("http://") || target.starts_with("https://") {
            return self.anchor(target, label, None);
        }
        if let Some((ns, name)) = target.split_once(':')
            && ns.trim().eq_ignore_ascii_case("category")
        {
            return self.anchor(&self.category_href(name), label, None);
        }
        self.link(target, Some(label))
    }

    fn file_embed(&self, inner: &str) -> String {
        let spec: FileEmbedSpec = parse_file_embed(inner, self.images);
        let href = spec.link.as_deref().map(|link| {
            if spec.has_external_link() {
                link.to_string()
            } else {
                self.resolve_page(link.trim_matches(['[', ']'])).href
            }
        });
        spec.render(self.format, href.as_deref(), self.images)
    }

    fn emphasis(&self, kind: Emphasis, captured: &str) -> String {
        let inner = encode_text(captured);
        match (self.format, kind) {
            (OutputFormat::Html, Emphasis::BoldItalic) => format!("<strong><em>{inner}</em></strong>"),
            (OutputFormat::Html, Emphasis::Bold) => format!("<strong>{inner}</strong>"),
            (OutputFormat::Html, Emphasis::Italic) => format!("<em>{inner}</em>"),
            (OutputFormat::Markdown, Emphasis::BoldItalic) => format!("***{inner}***"),
            (OutputFormat::Markdown, Emphasis::Bold) => format!("**{inner}**"),
            (OutputFormat::Markdown, Emphasis::Italic) => format!("*{inner}*"),
        }
    }
}
