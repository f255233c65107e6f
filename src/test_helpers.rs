//! Shared test utilities for the wikidump test suite.
//!
//! Builders for the pipeline's data structures (`SlugRegistry`, `RawPage`,
//! `Page`) and one-call conversions with stock settings.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let conv = convert_html("Go to [[Main Page]].");
//! assert!(conv.categories.is_empty());
//!
//! let page = page_with_revisions("Main Page", &[("41", "old"), ("42", "new")]);
//! assert_eq!(page.slug, "main-page");
//! ```

use std::path::PathBuf;

use crate::blocks::{BlockParser, Conversion, ConvertConfig};
use crate::slug::SlugRegistry;
use crate::types::{OutputFormat, Page, RawPage, Revision};

// =========================================================================
// Builders
// =========================================================================

/// Registry with a slug assigned to each title, in order.
pub fn registry_with(titles: &[&str]) -> SlugRegistry {
    let mut registry = SlugRegistry::new();
    for title in titles {
        registry.assign_page(title);
    }
    registry
}

fn revision(id: &str, text: &str) -> Revision {
    Revision {
        id: id.to_string(),
        timestamp: "2024-01-01T12:00:00Z".to_string(),
        text: text.to_string(),
    }
}

/// Dump page with a single revision (id `1`).
pub fn raw_page(title: &str, text: &str) -> RawPage {
    RawPage {
        title: title.to_string(),
        revisions: vec![revision("1", text)],
    }
}

/// Slugged page with the given `(id, text)` revisions, oldest first.
pub fn page_with_revisions(title: &str, revisions: &[(&str, &str)]) -> Page {
    let raw = RawPage {
        title: title.to_string(),
        revisions: revisions
            .iter()
            .map(|(id, text)| revision(id, text))
            .collect(),
    };
    let slug = SlugRegistry::new().assign_page(title);
    Page::new(raw, slug)
}

// =========================================================================
// Conversion shortcuts
// =========================================================================

fn convert(text: &str, format: OutputFormat) -> Conversion {
    let registry = registry_with(&["Main Page"]);
    let config = ConvertConfig::default();
    BlockParser::new(&registry, &config, format).convert(text)
}

/// Convert with stock settings against a registry holding `Main Page`.
pub fn convert_html(text: &str) -> Conversion {
    convert(text, OutputFormat::Html)
}

/// Markdown counterpart of [`convert_html`].
pub fn convert_markdown(text: &str) -> Conversion {
    convert(text, OutputFormat::Markdown)
}

// =========================================================================
// Fixtures
// =========================================================================

/// Path of the sample dump shipped in `fixtures/`.
pub fn fixture_dump_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample-dump.xml")
}
