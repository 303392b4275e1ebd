//! XLSX Worksheet Reader
//! Reads the cell text of the first worksheet in an `.xlsx` workbook.
//!
//! Only what the coverage sheets need is supported: shared strings, inline
//! strings, booleans and plain values. Styles, formulas and merged ranges are
//! ignored; a formula cell yields its cached value.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{self, Read, Seek};
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const WORKSHEET_PREFIX: &str = "xl/worksheets/sheet";

#[derive(Error, Debug)]
pub enum XlsxError {
    #[error("Failed to read workbook: {0}")]
    Io(#[from] io::Error),
    #[error("Not a valid xlsx archive: {0}")]
    Zip(#[from] ZipError),
    #[error("Malformed workbook XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Workbook contains no worksheet")]
    NoWorksheet,
    #[error("Invalid cell reference '{0}'")]
    InvalidCellRef(String),
    #[error("Shared string index {0} out of range")]
    SharedStringIndex(usize),
}

/// Read all rows of the first worksheet as text.
pub fn read_first_sheet_from<R: Read + Seek>(reader: R) -> Result<Vec<Vec<String>>, XlsxError> {
    let mut archive = ZipArchive::new(reader)?;

    let shared = match read_part(&mut archive, SHARED_STRINGS_PART) {
        Ok(xml) => parse_shared_strings(&xml)?,
        Err(XlsxError::Zip(ZipError::FileNotFound)) => Vec::new(),
        Err(e) => return Err(e),
    };

    let sheet_name = first_worksheet_name(&archive).ok_or(XlsxError::NoWorksheet)?;
    let sheet_xml = read_part(&mut archive, &sheet_name)?;
    parse_worksheet(&sheet_xml, &shared)
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String, XlsxError> {
    let mut entry = archive.by_name(name)?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

/// `sheet1.xml` when present, otherwise the lowest-numbered worksheet part.
fn first_worksheet_name<R: Read + Seek>(archive: &ZipArchive<R>) -> Option<String> {
    archive
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix(WORKSHEET_PREFIX)?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((number, name.to_string()))
        })
        .min_by_key(|(number, _)| *number)
        .map(|(_, name)| name)
}

/// Parse `xl/sharedStrings.xml` into its string table.
pub fn parse_shared_strings(xml: &str) -> Result<Vec<String>, XlsxError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    // Phonetic runs (<rPh>) repeat the text and must be skipped
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si && !in_phonetic => in_t = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_t => current.push_str(&String::from_utf8_lossy(&t)),
            Event::CData(t) if in_t => current.push_str(&String::from_utf8_lossy(&t)),
            Event::GeneralRef(r) if in_t => push_entity(&mut current, &r),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"t" => in_t = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}

/// Cell being assembled while walking `<c>` children.
#[derive(Default)]
struct PendingCell {
    row: usize,
    col: usize,
    kind: String,
    text: String,
}

/// Parse a worksheet part into dense rows of cell text.
pub fn parse_worksheet(xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>, XlsxError> {
    let mut reader = Reader::from_str(xml);
    let mut rows: Vec<Vec<String>> = Vec::new();

    let mut row_idx: usize = 0;
    let mut next_col: usize = 0;
    let mut cell: Option<PendingCell> = None;
    let mut capture = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row_idx = row_number(&e)?.unwrap_or(rows.len());
                    next_col = 0;
                }
                b"c" => {
                    let pending = open_cell(&e, row_idx, next_col)?;
                    next_col = pending.col + 1;
                    cell = Some(pending);
                }
                b"v" | b"t" if cell.is_some() => capture = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    row_idx = row_number(&e)?.unwrap_or(rows.len());
                    next_col = 0;
                }
                b"c" => {
                    let pending = open_cell(&e, row_idx, next_col)?;
                    next_col = pending.col + 1;
                }
                _ => {}
            },
            Event::Text(t) if capture => {
                if let Some(c) = cell.as_mut() {
                    c.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::CData(t) if capture => {
                if let Some(c) = cell.as_mut() {
                    c.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::GeneralRef(r) if capture => {
                if let Some(c) = cell.as_mut() {
                    push_entity(&mut c.text, &r);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    if let Some(c) = cell.take() {
                        let value = resolve_cell(&c, shared)?;
                        store(&mut rows, c.row, c.col, value);
                    }
                }
                b"row" => row_idx += 1,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, String::new());
    }
    Ok(rows)
}

fn row_number(e: &BytesStart) -> Result<Option<usize>, XlsxError> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"r" {
            let raw = String::from_utf8_lossy(&attr.value).to_string();
            let n = raw
                .parse::<usize>()
                .map_err(|_| XlsxError::InvalidCellRef(raw.clone()))?;
            return Ok(Some(n.saturating_sub(1)));
        }
    }
    Ok(None)
}

fn open_cell(e: &BytesStart, row: usize, next_col: usize) -> Result<PendingCell, XlsxError> {
    let mut pending = PendingCell {
        row,
        col: next_col,
        ..Default::default()
    };
    for attr in e.attributes().flatten() {
        match attr.key.local_name().as_ref() {
            b"r" => {
                let (r, c) = parse_cell_ref(&String::from_utf8_lossy(&attr.value))?;
                pending.row = r;
                pending.col = c;
            }
            b"t" => pending.kind = String::from_utf8_lossy(&attr.value).to_string(),
            _ => {}
        }
    }
    Ok(pending)
}

fn resolve_cell(cell: &PendingCell, shared: &[String]) -> Result<String, XlsxError> {
    match cell.kind.as_str() {
        "s" => {
            let idx = cell
                .text
                .trim()
                .parse::<usize>()
                .map_err(|_| XlsxError::InvalidCellRef(cell.text.clone()))?;
            shared
                .get(idx)
                .cloned()
                .ok_or(XlsxError::SharedStringIndex(idx))
        }
        "b" => Ok(if cell.text.trim() == "1" { "TRUE" } else { "FALSE" }.to_string()),
        _ => Ok(cell.text.clone()),
    }
}

fn store(rows: &mut Vec<Vec<String>>, row: usize, col: usize, value: String) {
    if rows.len() <= row {
        rows.resize_with(row + 1, Vec::new);
    }
    let cells = &mut rows[row];
    if cells.len() <= col {
        cells.resize(col + 1, String::new());
    }
    cells[col] = value;
}

/// Convert an A1-style reference into zero-based (row, column).
pub fn parse_cell_ref(reference: &str) -> Result<(usize, usize), XlsxError> {
    let invalid = || XlsxError::InvalidCellRef(reference.to_string());
    let split = reference
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }

    let col = letters
        .chars()
        .fold(0usize, |acc, c| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1));
    let row = digits.parse::<usize>().map_err(|_| invalid())?;
    if row == 0 {
        return Err(invalid());
    }
    Ok((row - 1, col - 1))
}

/// Append the text of an entity reference (`amp`, `#38`, `#x26`).
fn push_entity(out: &mut String, name: &[u8]) {
    let name = String::from_utf8_lossy(name);
    let decoded = match name.as_ref() {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        other => other.strip_prefix('#').and_then(|code| {
            let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => code.parse::<u32>().ok(),
            };
            value.and_then(char::from_u32)
        }),
    };
    match decoded {
        Some(c) => out.push(c),
        None => {
            out.push('&');
            out.push_str(&name);
            out.push(';');
        }
    }
}
