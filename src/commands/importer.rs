// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::import::{self, ColumnMapping, Preview};
use crate::models::UserId;
use crate::utils::{pretty_table, required_arg};
use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use std::fs::File;

pub fn handle(conn: &Connection, user_id: UserId, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("csv", sub)) => import_csv(conn, user_id, sub),
        _ => Ok(()),
    }
}

/// Accepts a single ASCII character, or `tab` / `\t`.
pub fn parse_delimiter(raw: &str) -> Result<u8> {
    if matches!(raw, "tab" | "\\t" | "\t") {
        return Ok(b'\t');
    }
    match raw.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => bail!("Invalid delimiter '{}', expected a single character", raw),
    }
}

pub fn mapping_from_args(sub: &clap::ArgMatches) -> Result<ColumnMapping> {
    Ok(ColumnMapping {
        date: required_arg(sub, "date_col")?.to_string(),
        amount: required_arg(sub, "amount_col")?.to_string(),
        description: sub.get_one::<String>("description_col").cloned(),
        category: sub.get_one::<String>("category_col").cloned(),
    })
}

fn import_csv(conn: &Connection, user_id: UserId, sub: &clap::ArgMatches) -> Result<()> {
    let path = required_arg(sub, "path")?.trim();
    let delimiter = parse_delimiter(sub.get_one::<String>("delimiter").map_or(",", String::as_str))?;
    let mapping = mapping_from_args(sub)?;
    let file = File::open(path).with_context(|| format!("Open CSV {}", path))?;
    let rows = import::read_csv_rows(file, delimiter).with_context(|| format!("Read CSV {}", path))?;
    let json = sub.get_flag("json");

    if sub.get_flag("preview") {
        let preview = import::preview_rows(conn, user_id, &rows, &mapping);
        if json {
            println!("{}", serde_json::to_string_pretty(&preview)?);
        } else {
            print_preview(&preview, rows.len());
        }
        return Ok(());
    }

    let report = import::import_rows(conn, user_id, &rows, &mapping);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!(
        "Imported {} rows from {} ({} failed)",
        report.imported, path, report.failed
    );
    if !report.errors.is_empty() {
        let data = report
            .errors
            .iter()
            .map(|e| vec![e.row.to_string(), e.reason.clone()])
            .collect();
        println!("{}", pretty_table(&["Row", "Error"], data));
        if report.failed > report.errors.len() {
            println!("... and {} more", report.failed - report.errors.len());
        }
    }
    Ok(())
}

fn print_preview(preview: &Preview, total_rows: usize) {
    println!(
        "Previewing {} of {} rows; nothing was saved",
        preview.rows.len(),
        total_rows
    );
    let data = preview
        .rows
        .iter()
        .map(|r| {
            vec![
                r.row.to_string(),
                r.date.clone(),
                r.category.clone().unwrap_or_default(),
                r.kind.to_string(),
                r.value.clone(),
                r.description.clone().unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Row", "Date", "Category", "Type", "Value", "Description"],
            data
        )
    );
    for e in &preview.errors {
        println!("Row {}: {}", e.row, e.errors.join("; "));
    }
}
