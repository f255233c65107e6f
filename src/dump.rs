//! Streaming reader for MediaWiki XML exports.
//!
//! Yields one [`RawPage`] per `<page>` element without loading the whole
//! dump. Elements are matched by local name, so any export schema version
//! (`export-0.10`, `export-0.11`, …) works regardless of its namespace.
//!
//! ```text
//! <page>
//!   <title>Main Page</title>          → RawPage::title
//!   <id>1</id>                        (page id, ignored)
//!   <revision>
//!     <id>42</id>                     → Revision::id
//!     <timestamp>2024-…</timestamp>   → Revision::timestamp
//!     <contributor><id>7</id>…        (ignored)
//!     <text>…</text>                  → Revision::text
//!   </revision>
//! </page>
//! ```

use crate::types::{RawPage, Revision};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
}

/// Which text field the reader is currently collecting.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Title,
    RevisionId,
    Timestamp,
    Text,
}

fn field_for_path(path: &[Vec<u8>]) -> Option<Field> {
    let names: Vec<&[u8]> = path.iter().map(Vec::as_slice).collect();
    match names.as_slice() {
        [.., b"page", b"title"] => Some(Field::Title),
        [.., b"page", b"revision", b"id"] => Some(Field::RevisionId),
        [.., b"page", b"revision", b"timestamp"] => Some(Field::Timestamp),
        [.., b"page", b"revision", b"text"] => Some(Field::Text),
        _ => None,
    }
}

/// Iterator over the pages of a dump.
pub struct DumpReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    keep_revisions: bool,
    /// Local names of the currently open elements.
    path: Vec<Vec<u8>>,
    finished: bool,
}

impl DumpReader<BufReader<File>> {
    /// Open a dump file.
    pub fn open(path: &Path, keep_revisions: bool) -> Result<Self, DumpError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), keep_revisions))
    }
}

impl<R: BufRead> DumpReader<R> {
    /// Wrap any buffered source. With `keep_revisions` off, only the last
    /// revision of each page is retained.
    pub fn new(source: R, keep_revisions: bool) -> Self {
        Self {
            reader: Reader::from_reader(source),
            buf: Vec::new(),
            keep_revisions,
            path: Vec::new(),
            finished: false,
        }
    }

    /// Read events until the next complete `<page>`; `Ok(None)` at EOF.
    fn next_page(&mut self) -> Result<Option<RawPage>, DumpError> {
        let mut in_page = false;
        let mut title: Option<String> = None;
        let mut revisions: Vec<Revision> = Vec::new();
        let mut current: Option<Revision> = None;
        let mut field: Option<Field> = None;
        let mut text = String::new();

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => {
                    let name = e.local_name().as_ref().to_vec();
                    match name.as_slice() {
                        b"page" => {
                            in_page = true;
                            title = None;
                            revisions.clear();
                        }
                        b"revision" if in_page => {
                            current = Some(Revision {
                                id: "0".to_string(),
                                timestamp: String::new(),
                                text: String::new(),
                            });
                        }
                        _ => {}
                    }
                    self.path.push(name);
                    if in_page {
                        field = field_for_path(&self.path);
                        text.clear();
                    }
                }
                Event::Text(e) if field.is_some() => {
                    text.push_str(&e.unescape()?);
                }
                Event::CData(e) if field.is_some() => {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
                Event::End(e) => {
                    if let Some(done) = field.take() {
                        let value = std::mem::take(&mut text);
                        match (done, current.as_mut()) {
                            (Field::Title, _) => title = Some(value),
                            (Field::RevisionId, Some(rev)) if !value.trim().is_empty() => {
                                rev.id = value.trim().to_string();
                            }
                            (Field::Timestamp, Some(rev)) => rev.timestamp = value.trim().to_string(),
                            (Field::Text, Some(rev)) => rev.text = value,
                            _ => {}
                        }
                    }
                    self.path.pop();
                    match e.local_name().as_ref() {
                        b"revision" if in_page => {
                            if let Some(rev) = current.take() {
                                if !self.keep_revisions {
                                    revisions.clear();
                                }
                                revisions.push(rev);
                            }
                        }
                        b"page" if in_page => {
                            in_page = false;
                            match title.take() {
                                Some(t) if !t.is_empty() && !revisions.is_empty() => {
                                    return Ok(Some(RawPage {
                                        title: t,
                                        revisions: std::mem::take(&mut revisions),
                                    }));
                                }
                                _ => tracing::debug!("skipping page without title or revisions"),
                            }
                        }
                        _ => {}
                    }
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for DumpReader<R> {
    type Item = Result<RawPage, DumpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_page() {
            Ok(Some(page)) => Some(Ok(page)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"<mediawiki xmlns="http://www.mediawiki.org/xml/export-0.10/" version="0.10">
  <siteinfo><sitename>Test</sitename></siteinfo>
  <page>
    <title>First &amp; Foremost</title>
    <id>10</id>
    <revision>
      <id>100</id>
      <timestamp>2023-01-01T00:00:00Z</timestamp>
      <contributor><username>a</username><id>7</id></contributor>
      <text bytes="3">old</text>
    </revision>
    <revision>
      <id>101</id>
      <timestamp>2023-02-01T00:00:00Z</timestamp>
      <contributor><username>b</username><id>8</id></contributor>
      <text bytes="9">'''new''' &lt;br&gt;</text>
    </revision>
  </page>
  <page>
    <title>Second</title>
    <revision>
      <timestamp>2023-03-01T00:00:00Z</timestamp>
      <text><![CDATA[raw <b>cdata</b>]]></text>
    </revision>
  </page>
  <page>
    <title>Empty</title>
    <revision>
      <id>300</id>
      <text bytes="0" />
    </revision>
  </page>
  <page>
    <title>No revisions</title>
  </page>
</mediawiki>"#;

    fn read(keep: bool) -> Vec<RawPage> {
        DumpReader::new(DUMP.as_bytes(), keep)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn reads_titles_in_order() {
        let pages = read(false);
        let titles: Vec<&str> = pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["First & Foremost", "Second", "Empty"]);
    }

    #[test]
    fn keeps_only_latest_revision_by_default() {
        let pages = read(false);
        assert_eq!(pages[0].revisions.len(), 1);
        assert_eq!(pages[0].revisions[0].id, "101");
        assert_eq!(pages[0].latest_text(), "'''new''' <br>");
    }

    #[test]
    fn keeps_all_revisions_when_requested() {
        let pages = read(true);
        let ids: Vec<&str> = pages[0].revisions.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["100", "101"]);
        assert_eq!(pages[0].revisions[0].timestamp, "2023-01-01T00:00:00Z");
    }

    #[test]
    fn revision_id_ignores_contributor_id() {
        let pages = read(true);
        assert!(pages[0].revisions.iter().all(|r| r.id != "7" && r.id != "8"));
    }

    #[test]
    fn missing_id_defaults_to_zero_and_cdata_is_read() {
        let pages = read(false);
        assert_eq!(pages[1].revisions[0].id, "0");
        assert_eq!(pages[1].latest_text(), "raw <b>cdata</b>");
    }

    #[test]
    fn self_closing_text_is_empty() {
        let pages = read(false);
        assert_eq!(pages[2].revisions[0].id, "300");
        assert_eq!(pages[2].latest_text(), "");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let broken = "<mediawiki><page><title>x</title></revision></page></mediawiki>";
        let result: Result<Vec<_>, _> = DumpReader::new(broken.as_bytes(), false).collect();
        assert!(result.is_err());
    }
}
