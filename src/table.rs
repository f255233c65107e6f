//! `{| … |}` table parsing and layout classification.
//!
//! Lines arrive raw, from the opening `{|` through the closing `|}`:
//!
//! ```text
//! {| class="wikitable"        table attributes (ignored)
//! |+ Caption                  caption
//! |-                          row separator
//! ! Name !! Value             header cells
//! | style="x" | cell || cell  data cells; leading attributes dropped
//! free text                   merged into the next cell flush
//! |}
//! ```
//!
//! Cell text is returned raw; the block parser strips categories from it and
//! runs the inline transform.

/// One table cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub header: bool,
}

impl Cell {
    fn data(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            header: false,
        }
    }
}

/// How a table should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// Infobox: mostly two-cell rows rendered as key/value pairs.
    KeyValue,
    /// Everything else.
    Grid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub caption: Option<String>,
    pub rows: Vec<Vec<Cell>>,
    pub layout: TableLayout,
}

impl Table {
    pub fn max_cols(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Grid tables treat the first row as a header if any of its cells is one.
    pub fn has_header_row(&self) -> bool {
        self.rows
            .first()
            .is_some_and(|row| row.iter().any(|c| c.header))
    }

    /// Apply `f` to the caption and every cell's text.
    pub fn map_text(self, mut f: impl FnMut(&str) -> String) -> Table {
        Table {
            caption: self.caption.as_deref().map(&mut f),
            rows: self
                .rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|cell| Cell {
                            text: f(&cell.text),
                            header: cell.header,
                        })
                        .collect()
                })
                .collect(),
            layout: self.layout,
        }
    }
}

/// Decide the layout: key-value when at least `ceil(ratio × rows)` rows
/// (minimum one) have exactly two cells.
pub fn classify(rows: &[Vec<Cell>], key_value_ratio: f64) -> TableLayout {
    if rows.is_empty() {
        return TableLayout::Grid;
    }
    let two_cell = rows.iter().filter(|r| r.len() == 2).count();
    let needed = ((key_value_ratio * rows.len() as f64) - 1e-9).ceil().max(1.0) as usize;
    if two_cell >= needed {
        TableLayout::KeyValue
    } else {
        TableLayout::Grid
    }
}

/// Keep only the content of an `attributes | content` cell.
///
/// The separator is the first pipe outside `[[…]]` and `{{…}}`, and needs
/// something before it.
pub fn strip_cell_attributes(part: &str) -> &str {
    let bytes = part.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' | b'{' if bytes.get(i + 1) == Some(&bytes[i]) => {
                depth += 1;
                i += 2;
                continue;
            }
            b']' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                depth = depth.saturating_sub(1);
                i += 2;
                continue;
            }
            b'|' if depth == 0 => {
                return if part[..i].trim().is_empty() {
                    part
                } else {
                    &part[i + 1..]
                };
            }
            _ => {}
        }
        i += 1;
    }
    part
}

#[derive(Default)]
struct RowBuilder {
    rows: Vec<Vec<Cell>>,
    current: Vec<Cell>,
    pending: Vec<String>,
}

impl RowBuilder {
    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let text = self.pending.join(" ");
        self.pending.clear();
        self.current.push(Cell::data(text));
    }

    fn end_row(&mut self) {
        self.flush_pending();
        if !self.current.is_empty() {
            self.rows.push(std::mem::take(&mut self.current));
        }
    }
}

/// Parse the raw lines of one table run.
pub fn parse_table(lines: &[&str], key_value_ratio: f64) -> Table {
    let mut caption = None;
    let mut builder = RowBuilder::default();

    // The opening line only carries attributes.
    for raw in lines.iter().skip(1) {
        let line = raw.trim();
        if line.starts_with("|}") {
            break;
        }
        if let Some(text) = line.strip_prefix("|+") {
            caption = Some(text.trim().to_string());
        } else if line.starts_with("|-") {
            builder.end_row();
        } else if line.starts_with('!') || line.starts_with('|') {
            builder.flush_pending();
            let header = line.starts_with('!');
            let body = &line[1..];
            let parts: Vec<&str> = if header && body.contains("!!") {
                body.split("!!").collect()
            } else if body.contains("||") {
                body.split("||").collect()
            } else {
                vec![body]
            };
            for part in parts {
                builder.current.push(Cell {
                    text: strip_cell_attributes(part).trim().to_string(),
                    header,
                });
            }
        } else if !line.is_empty() {
            builder.pending.push(line.to_string());
        }
    }
    builder.end_row();

    let layout = classify(&builder.rows, key_value_ratio);
    Table {
        caption,
        rows: builder.rows,
        layout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Table {
        let lines: Vec<&str> = src.lines().collect();
        parse_table(&lines, 0.6)
    }

    fn texts(table: &Table) -> Vec<Vec<&str>> {
        table
            .rows
            .iter()
            .map(|r| r.iter().map(|c| c.text.as_str()).collect())
            .collect()
    }

    #[test]
    fn two_column_table_is_key_value() {
        let t = parse("{|\n|-\n| Born || 1900\n|-\n| Died || 1980\n|-\n| Home || Paris\n|}");
        assert_eq!(t.layout, TableLayout::KeyValue);
        assert_eq!(
            texts(&t),
            [["Born", "1900"], ["Died", "1980"], ["Home", "Paris"]]
        );
    }

    #[test]
    fn one_wide_row_keeps_key_value() {
        let t = parse(
            "{|\n|-\n| a || b\n|-\n| c || d\n|-\n| e || f\n|-\n| x || y || z\n|}",
        );
        assert_eq!(t.layout, TableLayout::KeyValue);
    }

    #[test]
    fn mostly_wide_rows_are_a_grid() {
        let t = parse("{|\n|-\n| a || b\n|-\n| c || d || e\n|-\n| f || g || h\n|}");
        assert_eq!(t.layout, TableLayout::Grid);
    }

    #[test]
    fn classify_boundaries() {
        let two = || vec![Cell::data("k"), Cell::data("v")];
        let three = || vec![Cell::data("a"), Cell::data("b"), Cell::data("c")];
        assert_eq!(classify(&[], 0.6), TableLayout::Grid);
        assert_eq!(classify(&[two()], 0.6), TableLayout::KeyValue);
        assert_eq!(classify(&[three()], 0.6), TableLayout::Grid);
        assert_eq!(classify(&[two(), two(), three()], 0.6), TableLayout::KeyValue);
        assert_eq!(classify(&[two(), three(), three()], 0.6), TableLayout::Grid);
        assert_eq!(
            classify(&[two(), two(), two(), three(), three()], 0.6),
            TableLayout::KeyValue
        );
        assert_eq!(
            classify(&[two(), two(), three(), three(), three()], 0.6),
            TableLayout::Grid
        );
    }

    #[test]
    fn header_cells_split_on_double_bang() {
        let t = parse("{| class=\"wikitable\"\n! Name !! Year !! Place\n|-\n| A || 1 || X\n|}");
        assert_eq!(t.layout, TableLayout::Grid);
        assert!(t.has_header_row());
        assert!(t.rows[0].iter().all(|c| c.header));
        assert_eq!(texts(&t)[0], ["Name", "Year", "Place"]);
        assert_eq!(t.max_cols(), 3);
    }

    #[test]
    fn caption_is_captured() {
        let t = parse("{|\n|+ Facts\n| a || b\n|}");
        assert_eq!(t.caption.as_deref(), Some("Facts"));
    }

    #[test]
    fn cell_attributes_are_dropped() {
        let t = parse("{|\n| style=\"color:red\" | red || plain\n|}");
        assert_eq!(texts(&t), [["red", "plain"]]);
    }

    #[test]
    fn pipe_inside_link_is_not_attribute_separator() {
        assert_eq!(strip_cell_attributes(" [[Main Page|home]] "), " [[Main Page|home]] ");
        assert_eq!(
            strip_cell_attributes(" align=left | [[Main Page|home]]"),
            " [[Main Page|home]]"
        );
        assert_eq!(strip_cell_attributes(" {{flag|fr}} "), " {{flag|fr}} ");
        assert_eq!(strip_cell_attributes("| leading"), "| leading");
    }

    #[test]
    fn free_text_becomes_a_cell() {
        let t = parse("{|\n| Key\ncontinued text\nmore\n|-\n| Next || Row\n|}");
        assert_eq!(
            texts(&t),
            vec![vec!["Key", "continued text more"], vec!["Next", "Row"]]
        );
    }

    #[test]
    fn empty_rows_are_skipped() {
        let t = parse("{|\n|-\n|-\n| a || b\n|-\n|}");
        assert_eq!(t.rows.len(), 1);
    }

    #[test]
    fn map_text_preserves_shape() {
        let t = parse("{|\n|+ cap\n! h !! i\n|}").map_text(str::to_uppercase);
        assert_eq!(t.caption.as_deref(), Some("CAP"));
        assert_eq!(texts(&t), [["H", "I"]]);
        assert!(t.rows[0][0].header);
    }
}
