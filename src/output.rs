//! CLI output formatting.
//!
//! Output is **information-centric, not file-centric**: every page is shown
//! by its position in the dump and its title, with the generated file as
//! secondary context after an arrow.
//!
//! # Output Format
//!
//! ```text
//! Pages
//! 001 Main Page → main-page.html
//!     Categories: Birds, Fish
//! 002 Old Name → old-name.html
//!     Redirect: Main Page
//!
//! Categories
//! 001 Birds (2 pages) → category-birds.html
//!
//! Generated 2 pages, 1 category, 0 revision documents
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::generate::{GenerateSummary, Site};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Pages and categories of a converted site.
pub fn format_site_output(site: &Site) -> Vec<String> {
    let ext = site.format.extension();
    let mut lines = Vec::new();

    lines.push("Pages".to_string());
    for (i, converted) in site.pages.iter().enumerate() {
        let page = &converted.page;
        lines.push(format!(
            "{} {} \u{2192} {}.{ext}",
            format_index(i + 1),
            page.title,
            page.slug
        ));
        if let Some(target) = &page.redirect_target {
            lines.push(format!("{}Redirect: {target}", indent(1)));
        }
        if !page.categories.is_empty() {
            lines.push(format!(
                "{}Categories: {}",
                indent(1),
                page.categories.join(", ")
            ));
        }
    }

    if !site.categories.is_empty() {
        lines.push(String::new());
        lines.push("Categories".to_string());
        for (i, category) in site.categories.iter().enumerate() {
            lines.push(format!(
                "{} {} ({}) \u{2192} {}.{ext}",
                format_index(i + 1),
                category.name,
                plural(category.members.len(), "page", "pages"),
                category.slug
            ));
        }
    }

    lines
}

/// Site listing followed by the totals line.
pub fn format_generate_output(site: &Site, summary: &GenerateSummary) -> Vec<String> {
    let mut lines = format_site_output(site);
    lines.push(String::new());
    lines.push(format!(
        "Generated {}, {}, {}",
        plural(summary.pages, "page", "pages"),
        plural(summary.categories, "category", "categories"),
        plural(summary.revisions, "revision document", "revision documents")
    ));
    if let Some(manifest) = &summary.manifest {
        lines.push(format!("Manifest: {}", manifest.display()));
    }
    lines
}

/// Print convert output to stdout.
pub fn print_generate_output(site: &Site, summary: &GenerateSummary) {
    for line in format_generate_output(site, summary) {
        println!("{}", line);
    }
}

/// Print check output to stdout.
pub fn print_check_output(site: &Site) {
    for line in format_site_output(site) {
        println!("{}", line);
    }
}
