//! `[[File:…]]` embed parsing and placeholder rendering.
//!
//! Media files are not part of a dump, so every embed becomes a placeholder
//! image sized the way the wiki would have sized the original:
//!
//! | Option | Effect |
//! |--------|--------|
//! | `alt=X` | image alt text |
//! | `link=X` | wrap the image in a link (URL or page title) |
//! | `300px`, `300x200px` | explicit size; height defaults to 3/4 of width |
//! | `upright`, `upright=0.5` | scaled default width, unless an explicit size came first |
//! | `left` `right` `center` `none` | `align-<x>` class |
//! | `thumb` `thumbnail` `frame` `frameless` | `mode-<x>` class |
//! | anything else | caption candidate; the last one wins |
//!
//! The final size is always clamped into the configured bounds.

use crate::config::ImagesConfig;
use crate::types::OutputFormat;
use html_escape::{encode_double_quoted_attribute, encode_text};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use std::sync::LazyLock;

static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)(?:x(\d+))?px$").unwrap());
static UPRIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^upright(?:\s*:?=\s*([0-9]*\.?[0-9]+))?$").unwrap());

const ALIGNMENTS: &[&str] = &["left", "right", "center", "none"];
const FRAME_MODES: &[&str] = &["thumb", "thumbnail", "frame", "frameless"];
const VIDEO_EXTENSIONS: &[&str] = &[".ogg", ".ogv", ".webm", ".mp4"];

/// Characters left unescaped in the placeholder label (mirrors URL path quoting).
const LABEL_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// Parsed form of one file embed.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEmbedSpec {
    pub filename: String,
    pub caption: Option<String>,
    pub alt: Option<String>,
    pub link: Option<String>,
    pub width: u32,
    pub height: u32,
    /// CSS classes in first-seen order, always starting with `file-ref`.
    pub classes: Vec<String>,
}

/// Strip an ASCII `prefix` from `s`, case-insensitively.
fn strip_prefix_ignore_case<'s>(s: &'s str, prefix: &str) -> Option<&'s str> {
    s.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .and_then(|_| s.get(prefix.len()..))
}

/// Strip a `File:` or `Image:` namespace prefix, case-insensitively.
pub fn strip_file_namespace(target: &str) -> Option<&str> {
    ["file:", "image:"]
        .iter()
        .find_map(|ns| strip_prefix_ignore_case(target, ns))
}

fn is_absolute_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Parse the inside of a `[[…]]` file span (`File:name|opt|opt…`).
pub fn parse_file_embed(inner: &str, images: &ImagesConfig) -> FileEmbedSpec {
    let mut parts = inner.split('|');
    let file_part = parts.next().unwrap_or_default();
    let filename = strip_file_namespace(file_part).unwrap_or(file_part);
    let filename = if filename.is_empty() { "File" } else { filename };

    let mut spec = FileEmbedSpec {
        filename: filename.to_string(),
        caption: None,
        alt: None,
        link: None,
        width: images.default_width,
        height: images.default_height,
        classes: vec!["file-ref".to_string()],
    };
    let mut explicit_size = false;

    for opt in parts {
        let o = opt.trim();
        if o.is_empty() {
            continue;
        }
        if let Some(alt) = strip_prefix_ignore_case(o, "alt=") {
            spec.alt = Some(alt.trim().to_string());
            continue;
        }
        if let Some(link) = strip_prefix_ignore_case(o, "link=") {
            spec.link = Some(link.trim().to_string());
            continue;
        }
        if let Some(caps) = SIZE_RE.captures(o) {
            let width = caps[1].parse::<u32>().ok();
            let height = match caps.get(2) {
                Some(h) => h.as_str().parse::<u32>().ok(),
                None => width.map(|w| (u64::from(w) * 3 / 4) as u32),
            };
            if let (Some(w), Some(h)) = (width, height) {
                spec.width = w;
                spec.height = h;
                explicit_size = true;
            }
            continue;
        }
        if let Some(caps) = UPRIGHT_RE.captures(o) {
            let factor = match caps.get(1) {
                Some(f) => f.as_str().parse::<f64>().ok(),
                None => Some(1.0),
            };
            if let Some(factor) = factor
                && !explicit_size
            {
                let width = (f64::from(images.default_width) * images.upright_scale * factor).round();
                spec.width = width as u32;
                spec.height = (width * 3.0 / 4.0).round() as u32;
            }
            continue;
        }
        let lower = o.to_ascii_lowercase();
        if ALIGNMENTS.contains(&lower.as_str()) {
            push_class(&mut spec.classes, format!("align-{lower}"));
            continue;
        }
        if FRAME_MODES.contains(&lower.as_str()) {
            push_class(&mut spec.classes, format!("mode-{lower}"));
            continue;
        }
        spec.caption = Some(o.to_string());
    }

    spec.width = spec.width.clamp(images.min_width, images.max_width);
    spec.height = spec.height.clamp(images.min_height, images.max_height);
    spec
}

fn push_class(classes: &mut Vec<String>, class: String) {
    if !classes.contains(&class) {
        classes.push(class);
    }
}

impl FileEmbedSpec {
    /// Whether the link target is external.
    pub fn has_external_link(&self) -> bool {
        self.link.as_deref().is_some_and(is_absolute_url)
    }

    /// A caption-less embed that only exists to link to YouTube: either a
    /// YouTube icon or a video file. Rendered as a plain text link.
    pub fn is_youtube_shortcut(&self) -> bool {
        let Some(link) = self.link.as_deref() else {
            return false;
        };
        let link = link.to_lowercase();
        let name = self.filename.to_lowercase();
        let youtube_link = link.contains("youtube.com") || link.contains("youtu.be");
        let icon_or_video =
            name.contains("youtube") || VIDEO_EXTENSIONS.iter().any(|ext| name.ends_with(ext));
        youtube_link && icon_or_video && self.caption.is_none()
    }

    /// Placeholder image URL carrying the clamped size and a filename excerpt.
    pub fn placeholder_url(&self, images: &ImagesConfig) -> String {
        let label: String = self.filename.chars().take(images.label_chars).collect();
        format!(
            "{}/{}x{}?text={}",
            images.placeholder_base.trim_end_matches('/'),
            self.width,
            self.height,
            utf8_percent_encode(&label, LABEL_SET)
        )
    }

    fn alt_text(&self) -> &str {
        self.alt.as_deref().unwrap_or(&self.filename)
    }

    /// Render for the given backend. `href` is the already-resolved link
    /// target, if the embed has one.
    pub fn render(&self, format: OutputFormat, href: Option<&str>, images: &ImagesConfig) -> String {
        match format {
            OutputFormat::Html => self.render_html(href, images),
            OutputFormat::Markdown => self.render_markdown(href, images),
        }
    }

    fn render_html(&self, href: Option<&str>, images: &ImagesConfig) -> String {
        if self.is_youtube_shortcut()
            && let Some(link) = href
        {
            return format!(
                "<a href=\"{}\">YouTube</a>",
                encode_double_quoted_attribute(link)
            );
        }
        let class_attr = self.classes.join(" ");
        let mut img = format!(
            "<img class=\"placeholder-img\" src=\"{}\" alt=\"{}\" loading=\"lazy\"/>",
            encode_double_quoted_attribute(&self.placeholder_url(images)),
            encode_double_quoted_attribute(self.alt_text())
        );
        if let Some(link) = href {
            img = format!("<a href=\"{}\">{img}</a>", encode_double_quoted_attribute(link));
        }
        match &self.caption {
            Some(caption) => format!(
                "<figure class=\"{}\">{img}<div class=\"file-name\">{}</div><figcaption>{}</figcaption></figure>",
                encode_double_quoted_attribute(&class_attr),
                encode_text(&self.filename),
                encode_text(caption)
            ),
            None => format!(
                "<span class=\"{}\">{img}</span>",
                encode_double_quoted_attribute(&class_attr)
            ),
        }
    }

    fn render_markdown(&self, href: Option<&str>, images: &ImagesConfig) -> String {
        if self.is_youtube_shortcut()
            && let Some(link) = href
        {
            return format!("[YouTube]({link})");
        }
        let mut md = format!(
            "![{}]({})",
            encode_text(self.alt_text()),
            self.placeholder_url(images)
        );
        if let Some(link) = href {
            md = format!("[{md}]({link})");
        }
        if let Some(caption) = &self.caption {
            md.push_str(&format!(" *{}*", encode_text(caption)));
        }
        md
    }
}
