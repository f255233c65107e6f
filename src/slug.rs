//! Slug assignment and link-target resolution.
//!
//! Every page and every category gets one URL-safe identifier that doubles
//! as its output file stem. Slugs come from a single derivation:
//!
//! 1. NFKD-normalize and drop non-ASCII, which strips diacritics
//!    (`Café` → `Cafe`)
//! 2. lowercase
//! 3. collapse every run of characters outside `[a-z0-9]` into one `-`
//! 4. trim leading/trailing dashes
//!
//! Collisions get a numeric suffix (`-2`, `-3`, …). Category slugs live in
//! their own `category-` namespace but share the used set with pages, so a
//! page titled `Category:Birds` and the listing for category `Birds` never
//! land on the same file.
//!
//! ## Lifecycle
//!
//! The registry is filled in a first pass over all pages (input order) and is
//! read-only while pages are converted, since links may point at pages that
//! appear later in the dump.

use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;

/// Derive the collision-free core of a slug, or an empty string.
fn slug_core(text: &str) -> String {
    let ascii: String = text.nfkd().filter(char::is_ascii).collect();
    let mut out = String::with_capacity(ascii.len());
    let mut pending_dash = false;
    for c in ascii.chars().map(|c| c.to_ascii_lowercase()) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Append `-2`, `-3`, … to `base` until it is not in `used`, then claim it.
fn claim_unique(base: String, used: &mut HashSet<String>) -> String {
    let mut slug = base.clone();
    let mut i = 2;
    while used.contains(&slug) {
        slug = format!("{base}-{i}");
        i += 1;
    }
    used.insert(slug.clone());
    slug
}

/// Derive a unique slug for `title` and record it in `used`.
///
/// - `"Main Page"` → `main-page`
/// - `"Crème brûlée"` → `creme-brulee`
/// - `"!!!"` → `page`
pub fn slugify(title: &str, used: &mut HashSet<String>) -> String {
    claim_unique(predict_slug(title), used)
}

/// The slug `title` would get if nothing collided with it.
pub fn predict_slug(title: &str) -> String {
    let core = slug_core(title);
    if core.is_empty() {
        "page".to_string()
    } else {
        core
    }
}

/// Unsuffixed slug for a category listing: `category-<core>`.
pub fn predict_category_slug(name: &str) -> String {
    let core = slug_core(name);
    if core.is_empty() {
        "category-category".to_string()
    } else {
        format!("category-{core}")
    }
}

/// Anchor id for a heading or a `#fragment` link suffix.
pub fn heading_id(text: &str) -> String {
    let core = slug_core(text);
    if core.is_empty() {
        "section".to_string()
    } else {
        core
    }
}

/// Canonical form of a page title as MediaWiki compares them.
///
/// Underscores become spaces, surrounding whitespace is trimmed and the first
/// letter is uppercased; for namespaced titles (`ns:rest`) the first letter of
/// `rest` is uppercased instead.
pub fn normalize_title(title: &str) -> String {
    let t = title.replace('_', " ");
    let t = t.trim();
    match t.split_once(':') {
        Some((ns, rest)) => format!("{ns}:{}", upper_first(rest)),
        None => upper_first(t),
    }
}

/// Canonical category name: `birds_of_prey` and `Birds of prey` are the
/// same category.
pub fn normalize_category_name(name: &str) -> String {
    upper_first(name.replace('_', " ").trim())
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// File stem of the index document. Never handed out as a slug.
pub const INDEX_STEM: &str = "index";

/// Process-wide slug table for pages and categories.
#[derive(Debug, Clone)]
pub struct SlugRegistry {
    used: HashSet<String>,
    pages: HashMap<String, String>,
    categories: HashMap<String, String>,
}

impl Default for SlugRegistry {
    fn default() -> Self {
        Self {
            used: HashSet::from([INDEX_STEM.to_string()]),
            pages: HashMap::new(),
            categories: HashMap::new(),
        }
    }
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a fresh slug to a page title and register its lookup keys.
    ///
    /// Registering the same title twice yields two distinct slugs; lookups
    /// keep resolving to the first one.
    pub fn assign_page(&mut self, title: &str) -> String {
        let slug = slugify(title, &mut self.used);
        self.register(title, &slug);
        slug
    }

    /// Store `slug` under every lookup variant of `title`.
    pub fn register(&mut self, title: &str, slug: &str) {
        let normalized = normalize_title(title);
        let keys = [
            title.to_string(),
            normalized.clone(),
            title.replace(' ', "_"),
            normalized.replace(' ', "_"),
        ];
        for key in keys {
            self.pages.entry(key).or_insert_with(|| slug.to_string());
        }
    }

    /// Look up a page slug for a link target (without `#fragment`).
    pub fn resolve(&self, target: &str) -> Option<&str> {
        let normalized = normalize_title(target);
        let candidates = [
            target.to_string(),
            normalized.clone(),
            target.replace('_', " "),
            normalized.replace(' ', "_"),
        ];
        candidates
            .iter()
            .find_map(|key| self.pages.get(key).map(String::as_str))
    }

    /// Allocate the listing slug for a category, once per distinct name.
    pub fn allocate_category(&mut self, name: &str) -> String {
        if let Some(slug) = self.categories.get(name) {
            return slug.clone();
        }
        let slug = claim_unique(predict_category_slug(name), &mut self.used);
        self.categories.insert(name.to_string(), slug.clone());
        slug
    }

    /// Listing slug for a category; unallocated names get the unsuffixed
    /// prediction.
    pub fn category_slug(&self, name: &str) -> String {
        self.categories
            .get(name)
            .cloned()
            .unwrap_or_else(|| predict_category_slug(name))
    }
}
