//! Minimal `.xlsx` reader.
//!
//! A workbook is a zip container of XML parts. Only what the code table
//! needs is read: sheet titles, their order, and cell values as strings.
//! Styling, formulas and dates are not interpreted.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{Error, Result};

/// A parsed workbook: sheets in workbook order.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

/// A worksheet and its non-empty rows.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub title: String,
    pub rows: Vec<Row>,
}

/// One sheet row. `cells[0]` is column A.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// 1-based row number in the sheet.
    pub number: u32,
    pub cells: Vec<Option<String>>,
}

impl Row {
    /// Value of a 1-based column, `None` for blank cells.
    pub fn cell(&self, column: usize) -> Option<&str> {
        column
            .checked_sub(1)
            .and_then(|idx| self.cells.get(idx))
            .and_then(|c| c.as_deref())
    }
}

impl Sheet {
    /// Rows at or below `min_row`.
    pub fn rows_from(&self, min_row: u32) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(move |r| r.number >= min_row)
    }
}

impl Workbook {
    /// Open a workbook file.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::WorkbookNotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Read a workbook from any seekable source.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?
            .ok_or_else(|| Error::Workbook("missing xl/workbook.xml".to_string()))?;
        let rels_xml = read_part(&mut archive, "xl/_rels/workbook.xml.rels")?
            .ok_or_else(|| Error::Workbook("missing workbook relationships".to_string()))?;
        let shared = match read_part(&mut archive, "xl/sharedStrings.xml")? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        let targets = parse_relationships(&rels_xml)?;
        let mut sheets = Vec::new();

        for (title, rel_id) in parse_sheet_list(&workbook_xml)? {
            let target = targets.get(&rel_id).ok_or_else(|| {
                Error::Workbook(format!("sheet '{}' has no relationship {}", title, rel_id))
            })?;
            let part = resolve_target(target);
            let xml = read_part(&mut archive, &part)?
                .ok_or_else(|| Error::Workbook(format!("missing sheet part {}", part)))?;
            let rows = parse_sheet(&xml, &shared)?;
            debug!("Read sheet '{}' with {} rows", title, rows.len());
            sheets.push(Sheet { title, rows });
        }

        Ok(Workbook { sheets })
    }

    pub fn sheet(&self, title: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.title == title)
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    match archive.by_name(name) {
        Ok(mut part) => {
            let mut contents = String::new();
            part.read_to_string(&mut contents)?;
            Ok(Some(contents))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn attr_value(e: &BytesStart, local: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::Workbook(e.to_string()))?;
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// (title, relationship id) for each sheet, in workbook order.
fn parse_sheet_list(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_value(&e, b"name")?.unwrap_or_default();
                if let Some(rel_id) = attr_value(&e, b"id")? {
                    sheets.push((name, rel_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sheets)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) =
                    (attr_value(&e, b"Id")?, attr_value(&e, b"Target")?)
                {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(targets)
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    // Phonetic runs repeat the text and must be skipped.
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::CData(c) if in_text => {
                current.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                b"si" => strings.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}

/// Columns a sheet can hold (`A` through `XFD`).
const MAX_COLUMNS: usize = 16_384;

/// Rows a sheet can hold.
const MAX_ROWS: u32 = 1_048_576;

/// Convert a cell reference such as `AB12` to a 0-based column index.
/// `Ok(None)` when the reference has no column letters.
fn column_index(reference: &str) -> Result<Option<usize>> {
    let letters: String = reference
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return Ok(None);
    }
    let mut index = 0usize;
    for c in letters.chars() {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .filter(|i| *i <= MAX_COLUMNS)
            .ok_or_else(|| {
                Error::Workbook(format!("cell reference {} is past column XFD", reference))
            })?;
    }
    Ok(Some(index - 1))
}

/// Column of a `<c>` element: its reference, else the one after the previous cell.
fn cell_column(reference: Option<String>, next_column: usize) -> Result<usize> {
    let column = match reference.as_deref() {
        Some(r) => column_index(r)?.unwrap_or(next_column),
        None => next_column,
    };
    if column >= MAX_COLUMNS {
        return Err(Error::Workbook(format!("column {} is past XFD", column + 1)));
    }
    Ok(column)
}

/// Number of a `<row>` element: its `r` attribute, else the one after the previous row.
fn row_number(reference: Option<String>, next_row: u32) -> Result<u32> {
    let number = reference
        .and_then(|r| r.trim().parse::<u32>().ok())
        .unwrap_or(next_row);
    if !(1..=MAX_ROWS).contains(&number) {
        return Err(Error::Workbook(format!("row number {} is out of range", number)));
    }
    Ok(number)
}

/// Render a numeric cell the way a spreadsheet user sees it.
fn format_number(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", n as i64),
        Ok(n) if n.is_finite() => format!("{}", n),
        _ => raw.to_string(),
    }
}

#[derive(Default)]
struct CellState {
    column: usize,
    kind: Option<String>,
    value: String,
    inline: String,
}

impl CellState {
    fn resolve(self, shared: &[String]) -> Option<String> {
        let value = match self.kind.as_deref() {
            Some("s") => self
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| shared.get(idx).cloned())
                .unwrap_or_default(),
            Some("inlineStr") => self.inline,
            Some("b") => {
                if self.value.trim() == "1" {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
            Some("str") | Some("e") | Some("d") => self.value,
            _ => format_number(&self.value),
        };
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

fn place(cells: &mut Vec<Option<String>>, column: usize, value: Option<String>) {
    if value.is_none() {
        return;
    }
    if cells.len() <= column {
        cells.resize(column + 1, None);
    }
    cells[column] = value;
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<Vec<Row>> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut row: Option<Row> = None;
    let mut cell: Option<CellState> = None;
    let mut next_row = 1u32;
    let mut next_column = 0usize;
    let mut in_value = false;
    let mut in_inline_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    let number = row_number(attr_value(&e, b"r")?, next_row)?;
                    next_row = number + 1;
                    next_column = 0;
                    row = Some(Row {
                        number,
                        cells: Vec::new(),
                    });
                }
                b"c" => {
                    let column = cell_column(attr_value(&e, b"r")?, next_column)?;
                    next_column = column + 1;
                    cell = Some(CellState {
                        column,
                        kind: attr_value(&e, b"t")?,
                        ..Default::default()
                    });
                }
                b"v" => in_value = true,
                b"t" if cell.is_some() => in_inline_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    next_row = row_number(attr_value(&e, b"r")?, next_row)? + 1;
                }
                b"c" => {
                    next_column = cell_column(attr_value(&e, b"r")?, next_column)? + 1;
                }
                _ => {}
            },
            Event::Text(t) => {
                if let Some(state) = cell.as_mut() {
                    if in_value {
                        state.value.push_str(&t.unescape()?);
                    } else if in_inline_text {
                        state.inline.push_str(&t.unescape()?);
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"c" => {
                    if let (Some(state), Some(current)) = (cell.take(), row.as_mut()) {
                        let column = state.column;
                        place(&mut current.cells, column, state.resolve(shared));
                    }
                }
                b"row" => {
                    if let Some(done) = row.take() {
                        if done.cells.iter().any(|c| c.is_some()) {
                            rows.push(done);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rows)
}
