// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::TrackerError;
use crate::models::{CategoryId, CategoryKind, EntryUpdate, EntryView, NewEntry, UserId};
use crate::store;
use crate::utils::{
    fmt_money, maybe_print_json, parse_date, parse_decimal, parse_id, pretty_table, required_arg,
};
use anyhow::{Result, bail};
use rust_decimal::Decimal;
use rusqlite::Connection;
use serde::Serialize;
use std::cmp::Reverse;

pub fn handle(conn: &Connection, user_id: UserId, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, user_id, sub)?,
        Some(("list", sub)) => list(conn, user_id, sub)?,
        Some(("edit", sub)) => edit(conn, user_id, sub)?,
        Some(("rm", sub)) => {
            let id = parse_id(required_arg(sub, "id")?)?;
            store::delete_entry(conn, user_id, id)?;
            println!("Removed entry {}", id);
        }
        _ => {}
    }
    Ok(())
}

fn category_id_by_name(conn: &Connection, user_id: UserId, name: &str) -> Result<CategoryId> {
    match store::find_visible_category_by_name(conn, user_id, name)? {
        Some(c) => Ok(c.id),
        None => Err(TrackerError::category_not_found(name.trim()).into()),
    }
}

fn add(conn: &Connection, user_id: UserId, sub: &clap::ArgMatches) -> Result<()> {
    let date = parse_date(required_arg(sub, "date")?)?;
    let amount = parse_decimal(required_arg(sub, "amount")?)?;
    let category_id = category_id_by_name(conn, user_id, required_arg(sub, "category")?)?;
    let new = NewEntry {
        amount,
        date,
        description: sub.get_one::<String>("description").cloned(),
        category_id,
    };
    let entry = store::create_entry(conn, user_id, &new)?;
    println!(
        "Recorded {} {} on {} (id {})",
        entry.kind().map(|k| k.as_str()).unwrap_or("entry"),
        fmt_money(&entry.amount),
        date,
        entry.id
    );
    Ok(())
}

fn edit(conn: &Connection, user_id: UserId, sub: &clap::ArgMatches) -> Result<()> {
    let id = parse_id(required_arg(sub, "id")?)?;
    let update = EntryUpdate {
        amount: sub
            .get_one::<String>("amount")
            .map(|s| parse_decimal(s))
            .transpose()?,
        date: sub
            .get_one::<String>("date")
            .map(|s| parse_date(s))
            .transpose()?,
        description: sub.get_one::<String>("description").cloned(),
        category_id: sub
            .get_one::<String>("category")
            .map(|name| category_id_by_name(conn, user_id, name))
            .transpose()?,
    };
    let entry = store::update_entry(conn, user_id, id, &update)?;
    println!("Updated entry {}", entry.id);
    Ok(())
}

fn list(conn: &Connection, user_id: UserId, sub: &clap::ArgMatches) -> Result<()> {
    let data = query_rows(conn, user_id, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.kind.to_string(),
                    r.category.clone(),
                    fmt_money(&r.amount),
                    r.description.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Type", "Category", "Amount", "Description"],
                rows
            )
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    All,
    Only(CategoryKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntrySort {
    #[default]
    DateDesc,
    DateAsc,
    AmountAsc,
    AmountDesc,
}

impl EntrySort {
    fn parse(s: &str) -> Result<Self> {
        Ok(match s {
            "date-desc" => EntrySort::DateDesc,
            "date-asc" => EntrySort::DateAsc,
            "amount-asc" => EntrySort::AmountAsc,
            "amount-desc" => EntrySort::AmountDesc,
            other => bail!("Unknown sort '{}'", other),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub kind: KindFilter,
    pub search: Option<String>,
    pub sort: EntrySort,
    pub limit: Option<usize>,
}

/// Entries without a resolvable category list as expenses.
fn listed_kind(e: &EntryView) -> CategoryKind {
    e.kind().unwrap_or(CategoryKind::Expense)
}

/// Amount with expenses negated, the key amount sorting uses.
pub fn signed_amount(e: &EntryView) -> Decimal {
    match listed_kind(e) {
        CategoryKind::Income => e.amount,
        CategoryKind::Expense => -e.amount,
    }
}

fn matches_search(e: &EntryView, needle: &str) -> bool {
    let hit = |s: &str| s.to_lowercase().contains(needle);
    e.description.as_deref().is_some_and(hit)
        || e.category.as_ref().is_some_and(|c| hit(c.name.as_str()))
}

pub fn filter_entries(entries: Vec<EntryView>, filter: &EntryFilter) -> Vec<EntryView> {
    let needle = filter
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let mut out: Vec<EntryView> = entries
        .into_iter()
        .filter(|e| match filter.kind {
            KindFilter::All => true,
            KindFilter::Only(k) => listed_kind(e) == k,
        })
        .filter(|e| needle.as_deref().is_none_or(|n| matches_search(e, n)))
        .collect();

    match filter.sort {
        EntrySort::DateDesc => out.sort_by_key(|e| Reverse((e.date, e.id))),
        EntrySort::DateAsc => out.sort_by_key(|e| (e.date, e.id)),
        EntrySort::AmountAsc => out.sort_by_key(|e| (signed_amount(e), e.id)),
        EntrySort::AmountDesc => out.sort_by_key(|e| Reverse((signed_amount(e), e.id))),
    }
    if let Some(limit) = filter.limit {
        out.truncate(limit);
    }
    out
}

pub fn filter_from_args(sub: &clap::ArgMatches) -> Result<EntryFilter> {
    let kind = match sub.get_one::<String>("type").map(String::as_str) {
        None | Some("all") => KindFilter::All,
        Some(t) => KindFilter::Only(t.parse()?),
    };
    let sort = match sub.get_one::<String>("sort") {
        Some(s) => EntrySort::parse(s)?,
        None => EntrySort::default(),
    };
    Ok(EntryFilter {
        kind,
        search: sub.get_one::<String>("search").cloned(),
        sort,
        limit: sub.get_one::<usize>("limit").copied(),
    })
}

#[derive(Debug, Serialize)]
pub struct EntryRow {
    pub id: i64,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    pub category: String,
    pub amount: Decimal,
    pub description: String,
}

pub fn query_rows(conn: &Connection, user_id: UserId, sub: &clap::ArgMatches) -> Result<Vec<EntryRow>> {
    let filter = filter_from_args(sub)?;
    let entries = store::entries_for_user(conn, user_id)?;
    Ok(filter_entries(entries, &filter)
        .into_iter()
        .map(|e| EntryRow {
            id: e.id,
            date: e.date.map(|d| d.to_string()).unwrap_or_default(),
            kind: listed_kind(&e),
            category: e.category.map(|c| c.name).unwrap_or_default(),
            amount: e.amount,
            description: e.description.unwrap_or_default(),
        })
        .collect())
}
