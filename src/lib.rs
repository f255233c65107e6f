//! # wikidump
//!
//! Converts a MediaWiki XML export into a folder of static documents, either
//! HTML or Markdown. Every page becomes one file named after its slug, every
//! category gets a listing, and an index links them all. No server, no
//! database, no PHP: the output can be dropped on any file server or into a
//! Markdown-based notes tool.
//!
//! # Architecture: Two-Pass Pipeline
//!
//! ```text
//! 1. Read      dump.xml  →  RawPage*            (streaming XML)
//! 2. Slugs     RawPage*  →  SlugRegistry         (sequential, dump order)
//! 3. Convert   wikitext  →  Block*              (parallel, read-only registry)
//! 4. Render    Block*    →  out/*.html | *.md   (one Renderer per backend)
//! ```
//!
//! Slugs are assigned before any page is converted, because links may point
//! at pages later in the dump. Conversion then runs in parallel against the
//! frozen registry and results are collected in dump order, so the output is
//! identical regardless of thread count.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`dump`] | Streaming reader for `<page>`/`<revision>` elements of the XML export |
//! | [`slug`] | Slug derivation, collision suffixes, title normalization, link lookup |
//! | [`inline`] | Links, file embeds, external links and emphasis inside one line |
//! | [`file_embed`] | `[[File:…]]` option parsing and placeholder rendering |
//! | [`table`] | `{\| … \|}` table parsing and key/value vs. grid classification |
//! | [`blocks`] | Line-oriented block parser: headings, lists, tables, collapsibles |
//! | [`render`] | The [`render::Renderer`] trait with its HTML (Maud) and Markdown backends |
//! | [`generate`] | Both passes, document writing and `manifest.json` |
//! | [`config`] | `wikidump.toml` loading, validation and stock defaults |
//! | [`types`] | Pages, revisions and the output format shared by all stages |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Heuristic, Not a MediaWiki Parser
//!
//! Wikitext has no grammar; MediaWiki itself parses it with a pile of regular
//! expressions and a template engine. wikidump does not expand templates (they
//! are removed) and recognizes only the constructs that carry content: links,
//! emphasis, headings, lists, tables, file embeds and collapsible boxes. The
//! result reads well rather than looking identical to the wiki.
//!
//! ## One Block Model, Two Backends
//!
//! The block parser produces backend-neutral [`blocks::Block`]s whose inline
//! text is already in the target syntax. HTML and Markdown differ only in how
//! blocks and whole documents are emitted, which keeps the two outputs in
//! step: a construct supported in one is supported in the other.
//!
//! ## Placeholder Images
//!
//! A dump contains no media. Embeds become placeholder images of the size the
//! wiki would have shown, labelled with the file name, so page layout and
//! captions survive.

pub mod blocks;
pub mod config;
pub mod dump;
pub mod file_embed;
pub mod generate;
pub mod inline;
pub mod output;
pub mod render;
pub mod slug;
pub mod table;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
