// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Tabular import: rows keyed by column name become entries.
//!
//! Rows are processed one at a time and each one stands alone. A bad row
//! is recorded in the report and never stops the rest of the batch.

use crate::error::TrackerResult;
use crate::models::{Category, CategoryKind, NewEntry, Owner, UserId};
use crate::store;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;

pub const IMPORTED_CATEGORY: &str = "Imported";
pub const MAX_REPORTED_ERRORS: usize = 20;
pub const PREVIEW_ROWS: usize = 5;

/// One parsed CSV record, keyed by header.
pub type ImportRow = HashMap<String, String>;

static DAY_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[./](\d{1,2})[./]?(\d{2,4})$").expect("day-first date regex"));
static YEAR_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-./](\d{1,2})[-./](\d{1,2})$").expect("year-first date regex"));

/// Which source column feeds which entry field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub date: String,
    pub amount: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewRow {
    pub row: usize,
    pub date: String,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    pub value: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewError {
    pub row: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Preview {
    pub rows: Vec<PreviewRow>,
    pub errors: Vec<PreviewError>,
}

fn lossy(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

/// Reads a headed CSV document. Blank lines are skipped and ragged rows are
/// tolerated; a missing cell reads as an empty string. Bytes that are not
/// valid UTF-8 (Latin-1 bank exports) decode to U+FFFD instead of failing
/// the read.
pub fn read_csv_rows<R: Read>(reader: R, delimiter: u8) -> TrackerResult<Vec<ImportRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);
    let headers: Vec<String> = rdr.byte_headers()?.iter().map(lossy).collect();
    let mut rows = Vec::new();
    for record in rdr.byte_records() {
        let record = record?;
        let row: ImportRow = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), record.get(i).map(lossy).unwrap_or_default()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Keeps digits, `.` and `-`. A single comma with no dot is read as the
/// decimal separator first, so `-45,00 PLN` becomes `-45.00`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    let s = if s.matches(',').count() == 1 && !s.contains('.') {
        s.replace(',', ".")
    } else {
        s.to_string()
    };
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<Decimal>().ok()
}

fn parse_native_date(s: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc2822(s).ok().map(|dt| dt.date_naive())
}

fn capture_ymd(re: &Regex, s: &str, order: [usize; 3]) -> Option<NaiveDate> {
    let caps = re.captures(s)?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let (y, m, d) = (num(order[0])?, num(order[1])?, num(order[2])?);
    let y = if y < 100 { y + 2000 } else { y };
    NaiveDate::from_ymd_opt(i32::try_from(y).ok()?, m, d)
}

/// ISO/RFC forms first, then `D.M.Y` / `D/M/Y`, then `Y-M-D` with any of
/// `-`, `.` or `/`. Impossible calendar dates are rejected, not rolled over.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    parse_native_date(s)
        .or_else(|| capture_ymd(&DAY_FIRST, s, [3, 2, 1]))
        .or_else(|| capture_ymd(&YEAR_FIRST, s, [1, 2, 3]))
}

fn cell<'a>(row: &'a ImportRow, column: Option<&str>) -> Option<&'a str> {
    column
        .and_then(|c| row.get(c))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

struct ParsedRow<'a> {
    raw_date: &'a str,
    raw_amount: &'a str,
    description: Option<&'a str>,
    category: Option<&'a str>,
    amount: Option<Decimal>,
    date: Option<NaiveDate>,
}

impl<'a> ParsedRow<'a> {
    fn parse(row: &'a ImportRow, mapping: &ColumnMapping) -> Self {
        let raw_date = cell(row, Some(mapping.date.as_str())).unwrap_or("");
        let raw_amount = cell(row, Some(mapping.amount.as_str())).unwrap_or("");
        ParsedRow {
            raw_date,
            raw_amount,
            description: cell(row, mapping.description.as_deref()),
            category: cell(row, mapping.category.as_deref()),
            amount: parse_amount(raw_amount),
            date: parse_date(raw_date),
        }
    }

    fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.amount.is_none() {
            out.push("Invalid amount".to_string());
        }
        if self.date.is_none() {
            out.push("Invalid date".to_string());
        }
        out
    }
}

/// The per-user "Imported" bucket, created with the first row's inferred
/// type and reused whatever its type is afterwards.
fn imported_category(conn: &Connection, user_id: UserId, inferred: CategoryKind) -> TrackerResult<Category> {
    let existing = store::list_visible_categories(conn, user_id)?
        .into_iter()
        .find(|c| c.owner == Owner::User(user_id) && c.name == IMPORTED_CATEGORY);
    match existing {
        Some(c) => Ok(c),
        None => store::find_or_create_category(conn, IMPORTED_CATEGORY, inferred, Owner::User(user_id)),
    }
}

/// Existing categories keep their stored type; new ones take the type
/// inferred from the amount's sign.
fn resolve_category(
    conn: &Connection,
    user_id: UserId,
    name: Option<&str>,
    inferred: CategoryKind,
) -> TrackerResult<Category> {
    match name {
        Some(name) => match store::find_visible_category_by_name(conn, user_id, name)? {
            Some(c) => Ok(c),
            None => store::find_or_create_category(conn, name, inferred, Owner::User(user_id)),
        },
        None => imported_category(conn, user_id, inferred),
    }
}

/// One row in its own transaction, so a category created for a row whose
/// insert then fails is rolled back with it.
fn import_row(
    conn: &Connection,
    user_id: UserId,
    row: &ImportRow,
    mapping: &ColumnMapping,
) -> Result<(), String> {
    let parsed = ParsedRow::parse(row, mapping);
    let (amount, date) = match (parsed.amount, parsed.date) {
        (Some(a), Some(d)) => (a, d),
        _ => return Err(parsed.problems().join("; ")),
    };
    let persist = || -> TrackerResult<()> {
        let tx = conn.unchecked_transaction()?;
        let inferred = CategoryKind::from_sign(&amount);
        let category = resolve_category(&tx, user_id, parsed.category, inferred)?;
        let new = NewEntry {
            amount: amount.abs(),
            date,
            description: parsed.description.map(str::to_string),
            category_id: category.id,
        };
        store::create_entry(&tx, user_id, &new)?;
        tx.commit()?;
        Ok(())
    };
    persist().map_err(|e| e.to_string())
}

/// Imports every row for `user_id`. Row numbers in the report start at 1.
pub fn import_rows(
    conn: &Connection,
    user_id: UserId,
    rows: &[ImportRow],
    mapping: &ColumnMapping,
) -> ImportReport {
    let mut report = ImportReport::default();
    for (i, row) in rows.iter().enumerate() {
        let row_no = i + 1;
        match import_row(conn, user_id, row, mapping) {
            Ok(()) => report.imported += 1,
            Err(reason) => {
                tracing::warn!(row = row_no, %reason, "import row failed");
                report.failed += 1;
                if report.errors.len() < MAX_REPORTED_ERRORS {
                    report.errors.push(RowError { row: row_no, reason });
                }
            }
        }
    }
    tracing::info!(
        user = user_id,
        imported = report.imported,
        failed = report.failed,
        "import finished"
    );
    report
}

/// Dry run over the first few rows: parses and classifies without writing
/// anything. Category lookups are best effort and never create.
pub fn preview_rows(
    conn: &Connection,
    user_id: UserId,
    rows: &[ImportRow],
    mapping: &ColumnMapping,
) -> Preview {
    let mut preview = Preview::default();
    for (i, row) in rows.iter().take(PREVIEW_ROWS).enumerate() {
        let row_no = i + 1;
        let parsed = ParsedRow::parse(row, mapping);

        let known = match parsed.category {
            Some(name) => match store::find_visible_category_by_name(conn, user_id, name) {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(error = %e, "category lookup failed during preview");
                    None
                }
            },
            None => None,
        };
        let kind = match (known, parsed.amount) {
            (Some(c), _) => c.kind,
            (None, Some(a)) => CategoryKind::from_sign(&a),
            (None, None) => CategoryKind::Income,
        };

        let problems = parsed.problems();
        if !problems.is_empty() {
            preview.errors.push(PreviewError {
                row: row_no,
                errors: problems,
            });
        }
        preview.rows.push(PreviewRow {
            row: row_no,
            date: parsed
                .date
                .map(|d| d.to_string())
                .unwrap_or_else(|| parsed.raw_date.to_string()),
            category: parsed.category.map(str::to_string),
            kind,
            value: parsed.raw_amount.to_string(),
            description: parsed.description.map(str::to_string),
        });
    }
    preview
}
