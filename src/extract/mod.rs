// src/extract/mod.rs
//
// Reads a report file and turns its `<table>` elements into `HtmlTable`s.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::{fs, path::Path};
use tracing::{debug, warn};

use crate::process::{raw_table::HtmlTable, utils::clean_str};

static TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("CSS selector for tables should be valid"));
static ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("CSS selector for rows should be valid"));

/// Upper bound for `colspan`/`rowspan`; anything larger is treated as malformed.
const MAX_SPAN: usize = 1_000;

/// Everything pulled out of one report file.
pub struct ExtractedReport {
    pub text: String,
    pub tables: Vec<HtmlTable>,
    pub document: Html,
}

/// Read `path`, parse it, and extract its tables.
/// Only the read itself can fail; table problems degrade to an empty table list.
pub fn extract_report(path: &Path, display_name: &str) -> Result<ExtractedReport> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    let document = Html::parse_document(&text);
    let tables = read_tables(&document, display_name);
    Ok(ExtractedReport {
        text,
        tables,
        document,
    })
}

/// Extract every table in document order. Any failure is logged and yields no tables.
pub fn read_tables(document: &Html, display_name: &str) -> Vec<HtmlTable> {
    match try_read_tables(document, display_name) {
        Ok(tables) => {
            debug!(file = %display_name, tables = tables.len(), "extracted tables");
            tables
        }
        Err(e) => {
            warn!(file = %display_name, "error reading tables: {:#}", e);
            Vec::new()
        }
    }
}

fn try_read_tables(document: &Html, display_name: &str) -> Result<Vec<HtmlTable>> {
    let mut tables = Vec::new();
    for (i, table) in document.select(&TABLE).enumerate() {
        match parse_table(table).with_context(|| format!("table #{}", i))? {
            Some(t) => tables.push(t),
            None => warn!(file = %display_name, table = i, "skipping table without cells"),
        }
    }
    if tables.is_empty() {
        anyhow::bail!("no tables found");
    }
    Ok(tables)
}

#[derive(Debug, Clone, Default)]
struct Cell {
    text: String,
    is_header: bool,
}

struct RawCell {
    cell: Cell,
    colspan: usize,
    rowspan: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Head,
    Body,
    Foot,
}

/// `None` for a table with no cells at all.
fn parse_table(table: ElementRef<'_>) -> Result<Option<HtmlTable>> {
    let mut head = Vec::new();
    let mut body = Vec::new();
    let mut foot = Vec::new();

    for tr in table.select(&ROW).filter(|tr| belongs_to(*tr, table)) {
        let cells = row_cells(tr)?;
        match section_of(tr) {
            Section::Head => head.push(cells),
            Section::Body => body.push(cells),
            Section::Foot => foot.push(cells),
        }
    }

    // thead/tbody/tfoot are expanded as one grid so spans carry across sections
    let head_len = head.len();
    let body_len = body.len();
    let mut grid = expand_spans(head.into_iter().chain(body).chain(foot).collect());
    let mut body_rows = grid.split_off(head_len);
    let mut header_rows = grid;

    // without <thead>, leading all-<th> rows are the header
    if header_rows.is_empty() {
        let n = body_rows
            .iter()
            .take(body_len)
            .take_while(|r| !r.is_empty() && r.iter().all(|c| c.is_header))
            .count();
        header_rows = body_rows.drain(..n).collect();
    }

    let width = header_rows
        .iter()
        .chain(body_rows.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);
    if width == 0 {
        return Ok(None);
    }

    let columns = (1..width)
        .map(|j| {
            if header_rows.is_empty() {
                vec![j.to_string()]
            } else {
                header_rows.iter().map(|r| text_at(r, j)).collect()
            }
        })
        .collect();
    let index_name = header_rows.iter().map(|r| text_at(r, 0)).collect();
    let index = body_rows.iter().map(|r| text_at(r, 0)).collect();
    let rows = body_rows
        .iter()
        .map(|r| (1..width).map(|j| text_at(r, j)).collect())
        .collect();

    Ok(Some(HtmlTable {
        columns,
        index_name,
        index,
        rows,
    }))
}

fn text_at(row: &[Cell], j: usize) -> String {
    row.get(j).map(|c| c.text.clone()).unwrap_or_default()
}

/// True when `table` is the nearest enclosing `<table>`, so nested tables stay out of their parent.
fn belongs_to(tr: ElementRef<'_>, table: ElementRef<'_>) -> bool {
    tr.ancestors()
        .find(|n| n.value().as_element().map(|e| e.name()) == Some("table"))
        .map_or(false, |n| n.id() == table.id())
}

fn section_of(tr: ElementRef<'_>) -> Section {
    let parent = tr
        .parent()
        .and_then(|p| p.value().as_element().map(|e| e.name().to_string()));
    match parent.as_deref() {
        Some("thead") => Section::Head,
        Some("tfoot") => Section::Foot,
        _ => Section::Body,
    }
}

fn row_cells(tr: ElementRef<'_>) -> Result<Vec<RawCell>> {
    tr.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .map(|el| {
            let colspan = span_attr(el, "colspan")?;
            let rowspan = span_attr(el, "rowspan")?;
            Ok(RawCell {
                cell: Cell {
                    text: clean_str(&el.text().collect::<String>()),
                    is_header: el.value().name() == "th",
                },
                colspan,
                rowspan,
            })
        })
        .collect()
}

fn span_attr(el: ElementRef<'_>, name: &str) -> Result<usize> {
    let Some(raw) = el.value().attr(name) else {
        return Ok(1);
    };
    // browsers ignore junk spans rather than failing the table
    let span = raw.trim().parse::<usize>().unwrap_or(1).max(1);
    if span > MAX_SPAN {
        anyhow::bail!("{}={} exceeds {}", name, span, MAX_SPAN);
    }
    Ok(span)
}

/// Lay raw rows out on a grid, repeating spanned cells into every slot they cover.
fn expand_spans(rows: Vec<Vec<RawCell>>) -> Vec<Vec<Cell>> {
    // per column: (cell, rows still to fill)
    let mut carry: Vec<Option<(Cell, usize)>> = Vec::new();
    let mut out = Vec::with_capacity(rows.len());

    for raw in rows {
        let mut row: Vec<Cell> = Vec::new();
        let mut cells = raw.into_iter();
        let mut col = 0;
        loop {
            if let Some(cell) = take_carried(&mut carry, col) {
                row.push(cell);
                col += 1;
                continue;
            }
            let Some(rc) = cells.next() else { break };
            for _ in 0..rc.colspan {
                if rc.rowspan > 1 {
                    if carry.len() <= col {
                        carry.resize(col + 1, None);
                    }
                    carry[col] = Some((rc.cell.clone(), rc.rowspan - 1));
                }
                row.push(rc.cell.clone());
                col += 1;
            }
        }
        // spans still pending to the right of the last explicit cell
        if let Some(last) = carry.iter().rposition(Option::is_some) {
            while col <= last {
                let cell = take_carried(&mut carry, col).unwrap_or_default();
                row.push(cell);
                col += 1;
            }
        }
        out.push(row);
    }
    out
}

fn take_carried(carry: &mut [Option<(Cell, usize)>], col: usize) -> Option<Cell> {
    let slot = carry.get_mut(col)?;
    let (cell, remaining) = slot.as_mut()?;
    let cell = cell.clone();
    *remaining -= 1;
    if *remaining == 0 {
        *slot = None;
    }
    Some(cell)
}
