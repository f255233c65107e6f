//! Dump-to-site pipeline.
//!
//! ```text
//! dump.xml ─read─→ RawPage* ─pass 1─→ slugs + category slugs
//!                               └─pass 2 (parallel)─→ blocks + categories
//!                                                       └─write─→ out/
//! ```
//!
//! ## Pass 1 (sequential, dump order)
//!
//! Every page gets its slug before anything is converted, because links may
//! point forward in the dump. Category slugs are allocated right after from a
//! cheap pre-scan, so links, footers and listing files all agree on them.
//!
//! ## Pass 2 (parallel)
//!
//! Pages convert independently against the now read-only registry. Results
//! are collected in dump order, so category membership is deterministic no
//! matter how many threads run.
//!
//! ## Output
//!
//! [`build_site`] is pure; [`write_site`] renders and writes every document,
//! optionally with a `manifest.json` summary.

use crate::blocks::{Block, BlockParser, ConvertConfig, scan_categories};
use crate::config::SiteConfig;
use crate::dump::{DumpError, DumpReader};
use crate::render::{CategoryRef, PageView, Renderer, renderer_for, revision_stem, sort_pages_by_title, walk};
use crate::slug::{INDEX_STEM, SlugRegistry};
use crate::types::{OutputFormat, Page, RawPage};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Dump error: {0}")]
    Dump(#[from] DumpError),
}

/// A page with its converted body.
#[derive(Debug, Clone)]
pub struct ConvertedPage {
    pub page: Page,
    pub blocks: Vec<Block>,
    /// Converted bodies of `page.older_revisions()`, same order.
    pub older: Vec<Vec<Block>>,
}

/// A category and its member pages.
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub slug: String,
    /// Indices into [`Site::pages`], dump order.
    pub members: Vec<usize>,
}

/// Fully converted dump, ready to render.
#[derive(Debug, Clone)]
pub struct Site {
    pub format: OutputFormat,
    pub pages: Vec<ConvertedPage>,
    /// Sorted by name, ignoring case.
    pub categories: Vec<Category>,
}

/// `manifest.json` contents.
#[derive(Debug, Serialize)]
pub struct SiteManifest {
    pub format: OutputFormat,
    pub pages: Vec<ManifestPage>,
    pub categories: Vec<ManifestCategory>,
}

#[derive(Debug, Serialize)]
pub struct ManifestPage {
    #[serde(flatten)]
    pub page: Page,
    pub revisions: usize,
}

#[derive(Debug, Serialize)]
pub struct ManifestCategory {
    pub name: String,
    pub slug: String,
    /// Member page slugs, sorted by title.
    pub pages: Vec<String>,
}

impl Site {
    /// Categories of a page as links, sorted by name ignoring case.
    pub fn category_refs(&self, page: &Page) -> Vec<CategoryRef> {
        let slugs: HashMap<&str, &str> = self
            .categories
            .iter()
            .map(|c| (c.name.as_str(), c.slug.as_str()))
            .collect();
        let mut refs: Vec<CategoryRef> = page
            .categories
            .iter()
            .filter_map(|name| {
                slugs.get(name.as_str()).map(|slug| CategoryRef {
                    name: name.clone(),
                    slug: slug.to_string(),
                })
            })
            .collect();
        refs.sort_by_cached_key(|c| c.name.to_lowercase());
        refs
    }

    /// Member pages of a category, sorted by title ignoring case.
    pub fn members(&self, category: &Category) -> Vec<&Page> {
        let mut pages: Vec<&Page> = category
            .members
            .iter()
            .filter_map(|&i| self.pages.get(i).map(|c| &c.page))
            .collect();
        sort_pages_by_title(&mut pages);
        pages
    }

    pub fn category_refs_all(&self) -> Vec<CategoryRef> {
        self.categories
            .iter()
            .map(|c| CategoryRef {
                name: c.name.clone(),
                slug: c.slug.clone(),
            })
            .collect()
    }

    /// Number of older-revision documents the site holds.
    pub fn revision_count(&self) -> usize {
        self.pages.iter().map(|p| p.older.len()).sum()
    }

    pub fn manifest(&self) -> SiteManifest {
        SiteManifest {
            format: self.format,
            pages: self
                .pages
                .iter()
                .map(|c| ManifestPage {
                    page: c.page.clone(),
                    revisions: c.page.revisions.len(),
                })
                .collect(),
            categories: self
                .categories
                .iter()
                .map(|c| ManifestCategory {
                    name: c.name.clone(),
                    slug: c.slug.clone(),
                    pages: self.members(c).iter().map(|p| p.slug.clone()).collect(),
                })
                .collect(),
        }
    }
}

/// Read pages from a dump, stopping after `limit` pages if given.
pub fn load_pages(
    dump: &Path,
    limit: Option<usize>,
    keep_revisions: bool,
) -> Result<Vec<RawPage>, DumpError> {
    let reader = DumpReader::open(dump, keep_revisions)?;
    match limit {
        Some(n) => reader.take(n).collect(),
        None => reader.collect(),
    }
}

/// Run both passes over the pages of a dump.
///
/// With `keep_revisions`, every older revision is converted too, with links
/// prefixed for its subdirectory.
pub fn build_site(
    raw_pages: Vec<RawPage>,
    config: &SiteConfig,
    format: OutputFormat,
    keep_revisions: bool,
) -> Site {
    let convert_config = ConvertConfig::from_site_config(config);

    // Pass 1: slugs, then category slugs.
    let mut registry = SlugRegistry::new();
    let pages: Vec<Page> = raw_pages
        .into_iter()
        .map(|raw| {
            let slug = registry.assign_page(&raw.title);
            Page::new(raw, slug)
        })
        .collect();
    for page in &pages {
        for name in scan_categories(&page.text, &convert_config) {
            registry.allocate_category(&name);
        }
    }
    info!(pages = pages.len(), "assigned slugs");

    // Pass 2: parallel conversion, collected in dump order.
    let parser = BlockParser::new(&registry, &convert_config, format);
    let revision_parser = parser.with_link_prefix("../");
    let converted: Vec<_> = pages
        .par_iter()
        .map(|page| {
            let conversion = parser.convert(&page.text);
            let older: Vec<Vec<Block>> = if keep_revisions {
                page.older_revisions()
                    .iter()
                    .map(|rev| revision_parser.convert(&rev.text).blocks)
                    .collect()
            } else {
                Vec::new()
            };
            (conversion, older)
        })
        .collect();

    let mut categories: Vec<Category> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();
    let mut site_pages = Vec::with_capacity(pages.len());
    for (index, (mut page, (conversion, older))) in pages.into_iter().zip(converted).enumerate() {
        for name in &conversion.categories {
            let slot = *by_name.entry(name.clone()).or_insert_with(|| {
                categories.push(Category {
                    name: name.clone(),
                    slug: registry.category_slug(name),
                    members: Vec::new(),
                });
                categories.len() - 1
            });
            categories[slot].members.push(index);
        }
        if let Some(target) = &conversion.redirect {
            debug!(title = %page.title, target = %target, "redirect");
        }
        page.categories = conversion.categories;
        page.redirect_target = conversion.redirect;
        site_pages.push(ConvertedPage {
            page,
            blocks: conversion.blocks,
            older,
        });
    }
    categories.sort_by_cached_key(|c| c.name.to_lowercase());
    info!(
        pages = site_pages.len(),
        categories = categories.len(),
        "converted pages"
    );

    Site {
        format,
        pages: site_pages,
        categories,
    }
}

/// What [`write_site`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateSummary {
    pub pages: usize,
    pub categories: usize,
    pub revisions: usize,
    pub output_dir: PathBuf,
    pub manifest: Option<PathBuf>,
}

/// Output choices for one run.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub format: OutputFormat,
    pub limit: Option<usize>,
    pub dump_old_revisions: bool,
    pub write_manifest: bool,
}

/// Render and write every document of `site` into `output_dir`.
pub fn write_site(
    site: &Site,
    renderer: &dyn Renderer,
    output_dir: &Path,
    options: &GenerateOptions,
) -> Result<GenerateSummary, GenerateError> {
    let ext = renderer.format().extension();
    fs::create_dir_all(output_dir)?;

    let mut revisions = 0;
    for converted in &site.pages {
        let page = &converted.page;
        let body = walk(renderer, &converted.blocks);
        let categories = site.category_refs(page);
        let view = PageView {
            page,
            body: &body,
            categories: &categories,
            revision_info: options.dump_old_revisions && page.revisions.len() > 1,
        };
        fs::write(
            output_dir.join(format!("{}.{ext}", page.slug)),
            renderer.page_document(&view),
        )?;

        if options.dump_old_revisions && !converted.older.is_empty() {
            let rev_dir = output_dir.join(&page.slug);
            fs::create_dir_all(&rev_dir)?;
            for (revision, blocks) in page.older_revisions().iter().zip(&converted.older) {
                let body = walk(renderer, blocks);
                fs::write(
                    rev_dir.join(format!("{}.{ext}", revision_stem(revision))),
                    renderer.revision_document(page, revision, &body),
                )?;
                revisions += 1;
            }
        }
    }

    for category in &site.categories {
        let members = site.members(category);
        let category_ref = CategoryRef {
            name: category.name.clone(),
            slug: category.slug.clone(),
        };
        fs::write(
            output_dir.join(format!("{}.{ext}", category.slug)),
            renderer.category_document(&category_ref, &members),
        )?;
    }

    let mut index_pages: Vec<&Page> = site.pages.iter().map(|c| &c.page).collect();
    sort_pages_by_title(&mut index_pages);
    fs::write(
        output_dir.join(format!("{INDEX_STEM}.{ext}")),
        renderer.index_document(&index_pages, &site.category_refs_all()),
    )?;

    let manifest = if options.write_manifest {
        let path = output_dir.join("manifest.json");
        fs::write(&path, serde_json::to_string_pretty(&site.manifest())?)?;
        Some(path)
    } else {
        None
    };

    info!(output = %output_dir.display(), "site written");
    Ok(GenerateSummary {
        pages: site.pages.len(),
        categories: site.categories.len(),
        revisions,
        output_dir: output_dir.to_path_buf(),
        manifest,
    })
}

/// Read, convert and write a dump in one go.
pub fn generate(
    dump: &Path,
    output_dir: &Path,
    config: &SiteConfig,
    options: &GenerateOptions,
) -> Result<(Site, GenerateSummary), GenerateError> {
    let raw_pages = load_pages(dump, options.limit, options.dump_old_revisions)?;
    info!(pages = raw_pages.len(), dump = %dump.display(), "read dump");
    let site = build_site(raw_pages, config, options.format, options.dump_old_revisions);
    let renderer = renderer_for(options.format, &config.output);
    let summary = write_site(&site, renderer.as_ref(), output_dir, options)?;
    Ok((site, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{fixture_dump_path, raw_page};
    use tempfile::TempDir;

    fn site(pages: Vec<RawPage>) -> Site {
        build_site(pages, &SiteConfig::default(), OutputFormat::Html, false)
    }

    #[test]
    fn slugs_follow_dump_order() {
        let s = site(vec![
            raw_page("Title", "a"),
            raw_page("Title", "b"),
            raw_page("title!", "c"),
        ]);
        let slugs: Vec<&str> = s.pages.iter().map(|c| c.page.slug.as_str()).collect();
        assert_eq!(slugs, ["title", "title-2", "title-3"]);
    }

    #[test]
    fn forward_links_resolve() {
        let s = site(vec![
            raw_page("First", "See [[Second]]."),
            raw_page("Second", "Back to [[First]]."),
        ]);
        assert_eq!(
            s.pages[0].blocks,
            [Block::Paragraph(
                "See <a href=\"second.html\">Second</a>.".to_string()
            )]
        );
    }

    #[test]
    fn category_membership_in_dump_order() {
        let s = site(vec![
            raw_page("B page", "[[Category:Birds]][[Category:Birds]]"),
            raw_page("A page", "[[Category:birds]] [[Category:Aardvarks]]"),
            raw_page("C page", "no categories"),
        ]);
        let names: Vec<&str> = s.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Aardvarks", "Birds"]);
        assert_eq!(s.categories[1].members, [0, 1]);
        let members: Vec<&str> = s.members(&s.categories[1]).iter().map(|p| p.title.as_str()).collect();
        assert_eq!(members, ["A page", "B page"]);
        assert_eq!(s.pages[0].page.categories, ["Birds"]);
    }

    #[test]
    fn category_slug_avoids_page_collision() {
        let s = site(vec![
            raw_page("Category:Birds", "listing page"),
            raw_page("Robin", "[[Category:Birds]] see [[:Category:Birds]]"),
        ]);
        assert_eq!(s.pages[0].page.slug, "category-birds");
        assert_eq!(s.categories[0].slug, "category-birds-2");
        assert_eq!(
            s.pages[1].blocks[0],
            Block::Paragraph(" see <a href=\"category-birds-2.html\">Category:Birds</a>".to_string())
        );
    }

    #[test]
    fn redirect_pages_have_no_categories() {
        let s = site(vec![raw_page("Old", "#REDIRECT [[New]] [[Category:X]]")]);
        assert_eq!(s.pages[0].page.redirect_target.as_deref(), Some("New"));
        assert!(s.pages[0].page.categories.is_empty());
        assert!(s.categories.is_empty());
    }

    #[test]
    fn older_revisions_use_prefixed_links() {
        let mut page = raw_page("Page", "latest [[Page]]");
        page.revisions.insert(
            0,
            crate::types::Revision {
                id: "7".to_string(),
                timestamp: "2020-01-01T00:00:00Z".to_string(),
                text: "old [[Page]]".to_string(),
            },
        );
        let s = build_site(vec![page], &SiteConfig::default(), OutputFormat::Html, true);
        assert_eq!(s.revision_count(), 1);
        assert_eq!(
            s.pages[0].older[0],
            [Block::Paragraph("old <a href=\"../page.html\">Page</a>".to_string())]
        );
    }

    #[test]
    fn write_site_produces_all_documents() {
        let tmp = TempDir::new().unwrap();
        let s = site(vec![
            raw_page("Main Page", "Hello [[Category:Greetings]]"),
            raw_page("Other", "x"),
        ]);
        let renderer = renderer_for(OutputFormat::Html, &SiteConfig::default().output);
        let options = GenerateOptions {
            write_manifest: true,
            ..Default::default()
        };
        let summary = write_site(&s, renderer.as_ref(), tmp.path(), &options).unwrap();
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.categories, 1);
        for file in ["main-page.html", "other.html", "category-greetings.html", "index.html"] {
            assert!(tmp.path().join(file).exists(), "missing {file}");
        }
        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(tmp.path().join("manifest.json")).unwrap()).unwrap();
        assert_eq!(manifest["format"], "html");
        assert_eq!(manifest["pages"][0]["slug"], "main-page");
        assert_eq!(manifest["pages"][0]["categories"][0], "Greetings");
        assert_eq!(manifest["categories"][0]["pages"][0], "main-page");
    }

    #[test]
    fn page_titled_index_keeps_its_own_document() {
        let tmp = TempDir::new().unwrap();
        let s = site(vec![raw_page("Index", "Unique index page body"), raw_page("Other", "see [[Index]]")]);
        assert_eq!(s.pages[0].page.slug, "index-2");
        let renderer = renderer_for(OutputFormat::Html, &SiteConfig::default().output);
        write_site(&s, renderer.as_ref(), tmp.path(), &GenerateOptions::default()).unwrap();
        let page = fs::read_to_string(tmp.path().join("index-2.html")).unwrap();
        assert!(page.contains("Unique index page body"));
        let other = fs::read_to_string(tmp.path().join("other.html")).unwrap();
        assert!(other.contains("<a href=\"index-2.html\">Index</a>"));
        let index = fs::read_to_string(tmp.path().join("index.html")).unwrap();
        assert!(!index.contains("Unique index page body"));
        assert!(index.contains("href=\"index-2.html\""));
    }

    #[test]
    fn thread_count_does_not_change_output() {
        let pages: Vec<RawPage> = (0..40)
            .map(|i| raw_page(&format!("Page {i}"), &format!("[[Category:C{}]] [[Page {}]]", i % 3, i + 1)))
            .collect();
        let pool = |n| rayon::ThreadPoolBuilder::new().num_threads(n).build().unwrap();
        let one = pool(1).install(|| site(pages.clone()));
        let many = pool(4).install(|| site(pages.clone()));
        let members = |s: &Site| -> Vec<Vec<usize>> { s.categories.iter().map(|c| c.members.clone()).collect() };
        assert_eq!(members(&one), members(&many));
        let blocks = |s: &Site| -> Vec<Vec<Block>> { s.pages.iter().map(|c| c.blocks.clone()).collect() };
        assert_eq!(blocks(&one), blocks(&many));
    }

    #[test]
    fn load_pages_respects_limit() {
        let pages = load_pages(&fixture_dump_path(), Some(2), false).unwrap();
        let titles: Vec<&str> = pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["Main Page", "Robin"]);
        assert_eq!(pages[0].revisions.len(), 1);
        assert_eq!(pages[0].revisions[0].id, "42");
    }

    #[test]
    fn generate_fixture_dump() {
        let tmp = TempDir::new().unwrap();
        let options = GenerateOptions {
            dump_old_revisions: true,
            ..Default::default()
        };
        let (site, summary) =
            generate(&fixture_dump_path(), tmp.path(), &SiteConfig::default(), &options).unwrap();
        assert_eq!(summary.pages, 4);
        assert_eq!(summary.revisions, 1);
        assert!(summary.manifest.is_none());
        let names: Vec<&str> = site.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Birds", "Featured", "Water birds"]);
        assert!(tmp.path().join("main-page/41.html").exists());
        assert!(tmp.path().join("category-water-birds.html").exists());
    }
}
