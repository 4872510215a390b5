// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Income/expense aggregation over one user's entries.
//!
//! Everything here is pure: callers load entries (already normalized into
//! [`EntryView`]) and hand them over. Dirty data never fails an aggregate.
//! An entry with no date matches no window, and an entry with no category
//! is left out of the income/expense sums while still being returned in the
//! filtered subset.

use crate::error::{TrackerError, TrackerResult};
use crate::models::{CategoryKind, EntryView};
use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

pub const MONTH_ABBREVS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Totals {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub balance: Decimal,
}

/// Aggregates for a calendar year, or one month of it.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodStats {
    pub year: i32,
    pub month: Option<u32>,
    #[serde(flatten)]
    pub totals: Totals,
    pub entries: Vec<EntryView>,
}

/// Aggregates for an inclusive date interval.
#[derive(Debug, Clone, Serialize)]
pub struct RangeStats {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(flatten)]
    pub totals: Totals,
    pub entries: Vec<EntryView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStat {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    pub value: Decimal,
}

/// One point of a monthly trend series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendRow {
    pub name: String,
    pub income: Decimal,
    pub expense: Decimal,
}

fn sum_totals<'a>(entries: impl IntoIterator<Item = &'a EntryView>) -> Totals {
    let mut income = Decimal::ZERO;
    let mut expense = Decimal::ZERO;
    for e in entries {
        match e.kind() {
            Some(CategoryKind::Income) => income += e.amount,
            Some(CategoryKind::Expense) => expense += e.amount,
            None => {}
        }
    }
    Totals {
        total_income: income,
        total_expense: expense,
        balance: income - expense,
    }
}

fn in_month(e: &EntryView, year: i32, month: u32) -> bool {
    e.date
        .is_some_and(|d| d.year() == year && d.month() == month)
}

fn month_label(month: u32) -> &'static str {
    MONTH_ABBREVS[(month as usize).saturating_sub(1) % 12]
}

fn month_row<'a>(entries: impl IntoIterator<Item = &'a EntryView>, name: String) -> TrendRow {
    let t = sum_totals(entries);
    TrendRow {
        name,
        income: t.total_income,
        expense: t.total_expense,
    }
}

/// Totals for `year`, narrowed to `month` (1-indexed) when given.
pub fn monthly_stats(entries: &[EntryView], year: i32, month: Option<u32>) -> PeriodStats {
    let filtered: Vec<EntryView> = entries
        .iter()
        .filter(|e| {
            e.date
                .is_some_and(|d| d.year() == year && month.is_none_or(|m| d.month() == m))
        })
        .cloned()
        .collect();
    PeriodStats {
        year,
        month,
        totals: sum_totals(&filtered),
        entries: filtered,
    }
}

/// Sums amounts per category name, in order of first appearance.
pub fn category_stats(entries: &[EntryView]) -> Vec<CategoryStat> {
    let mut out: Vec<CategoryStat> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for e in entries {
        let Some(cat) = e.category.as_ref() else {
            continue;
        };
        match index.get(cat.name.as_str()) {
            Some(&i) => out[i].value += e.amount,
            None => {
                index.insert(cat.name.as_str(), out.len());
                out.push(CategoryStat {
                    name: cat.name.clone(),
                    kind: cat.kind,
                    value: e.amount,
                });
            }
        }
    }
    out
}

/// Twelve rows, Jan through Dec, for the given year.
pub fn yearly_breakdown(entries: &[EntryView], year: i32) -> Vec<TrendRow> {
    (1..=12u32)
        .map(|m| {
            month_row(
                entries.iter().filter(|e| in_month(e, year, m)),
                month_label(m).to_string(),
            )
        })
        .collect()
}

/// Totals for `start..=end`.
pub fn stats_for_range(entries: &[EntryView], start: NaiveDate, end: NaiveDate) -> RangeStats {
    let filtered: Vec<EntryView> = entries
        .iter()
        .filter(|e| e.date.is_some_and(|d| start <= d && d <= end))
        .cloned()
        .collect();
    RangeStats {
        start,
        end,
        totals: sum_totals(&filtered),
        entries: filtered,
    }
}

/// One row per calendar month touched by `start..=end`, labelled
/// `"Mon YYYY"`. Each row covers its whole month, not just the part inside
/// the range.
pub fn trend_for_range(entries: &[EntryView], start: NaiveDate, end: NaiveDate) -> Vec<TrendRow> {
    let mut rows = Vec::new();
    if start > end {
        return rows;
    }
    let mut cursor = start.with_day(1).unwrap_or(start);
    let last = end.with_day(1).unwrap_or(end);
    while cursor <= last {
        let (y, m) = (cursor.year(), cursor.month());
        rows.push(month_row(
            entries.iter().filter(|e| in_month(e, y, m)),
            format!("{} {}", month_label(m), y),
        ));
        cursor = match cursor.checked_add_months(Months::new(1)) {
            Some(next) => next,
            None => break,
        };
    }
    rows
}

/// Named look-back windows ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeRange {
    Last1m,
    Last3m,
    Last6m,
    Last12m,
}

impl RelativeRange {
    pub fn months(self) -> u32 {
        match self {
            RelativeRange::Last1m => 1,
            RelativeRange::Last3m => 3,
            RelativeRange::Last6m => 6,
            RelativeRange::Last12m => 12,
        }
    }

    /// `(today - N months, today)`; both ends are whole days.
    pub fn resolve(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = today
            .checked_sub_months(Months::new(self.months()))
            .unwrap_or(NaiveDate::MIN);
        (start, today)
    }
}

impl FromStr for RelativeRange {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last1m" => Ok(RelativeRange::Last1m),
            "last3m" => Ok(RelativeRange::Last3m),
            "last6m" => Ok(RelativeRange::Last6m),
            "last12m" => Ok(RelativeRange::Last12m),
            other => Err(TrackerError::Validation(format!(
                "Invalid range '{}', expected last1m|last3m|last6m|last12m",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StatsWindow {
    Calendar { year: i32, month: Option<u32> },
    Range { start: NaiveDate, end: NaiveDate },
}

/// Raw stats request as it arrives from the boundary.
#[derive(Debug, Clone, Default)]
pub struct StatsQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub range: Option<RelativeRange>,
}

impl StatsQuery {
    /// Picks the window: an explicit from/to pair, then a range token, then
    /// year/month. Half a pair is rejected instead of guessed.
    pub fn resolve(&self, today: NaiveDate) -> TrackerResult<StatsWindow> {
        match (self.from, self.to) {
            (Some(start), Some(end)) => {
                if start > end {
                    return Err(TrackerError::Validation(format!(
                        "Range start {} is after end {}",
                        start, end
                    )));
                }
                return Ok(StatsWindow::Range { start, end });
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(TrackerError::Validation(
                    "Both from and to are required for a custom range".into(),
                ));
            }
            (None, None) => {}
        }

        if let Some(range) = self.range {
            let (start, end) = range.resolve(today);
            return Ok(StatsWindow::Range { start, end });
        }

        match (self.year, self.month) {
            (Some(year), month) => {
                if let Some(m) = month {
                    if !(1..=12).contains(&m) {
                        return Err(TrackerError::Validation(format!(
                            "Invalid month {}, expected 1-12",
                            m
                        )));
                    }
                }
                Ok(StatsWindow::Calendar { year, month })
            }
            (None, Some(_)) => Err(TrackerError::Validation(
                "A month needs a year".into(),
            )),
            (None, None) => Err(TrackerError::Validation(
                "A year, a range or a from/to pair is required".into(),
            )),
        }
    }
}

/// Everything the dashboard shows for one window.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub window: StatsWindow,
    #[serde(flatten)]
    pub totals: Totals,
    pub entries: Vec<EntryView>,
    pub category_stats: Vec<CategoryStat>,
    pub trend: Vec<TrendRow>,
}

pub fn build_report(entries: &[EntryView], window: StatsWindow) -> StatsReport {
    match window {
        StatsWindow::Calendar { year, month } => {
            let period = monthly_stats(entries, year, month);
            StatsReport {
                window,
                totals: period.totals,
                category_stats: category_stats(&period.entries),
                trend: yearly_breakdown(entries, year),
                entries: period.entries,
            }
        }
        StatsWindow::Range { start, end } => {
            let range = stats_for_range(entries, start, end);
            StatsReport {
                window,
                totals: range.totals,
                category_stats: category_stats(&range.entries),
                trend: trend_for_range(entries, start, end),
                entries: range.entries,
            }
        }
    }
}
