// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::UserId;
use crate::stats::{RelativeRange, StatsQuery, StatsReport, StatsWindow, build_report};
use crate::store;
use crate::utils::{fmt_money, parse_date, pretty_table};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;

pub fn handle(conn: &Connection, user_id: UserId, m: &clap::ArgMatches) -> Result<()> {
    let query = query_from_args(m)?;
    let today = chrono::Local::now().date_naive();
    let report = run_query(conn, user_id, &query, today)?;
    if m.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_report(&report);
    Ok(())
}

pub fn query_from_args(m: &clap::ArgMatches) -> Result<StatsQuery> {
    Ok(StatsQuery {
        year: m.get_one::<i32>("year").copied(),
        month: m.get_one::<u32>("month").copied(),
        from: m.get_one::<String>("from").map(|s| parse_date(s)).transpose()?,
        to: m.get_one::<String>("to").map(|s| parse_date(s)).transpose()?,
        range: m
            .get_one::<String>("range")
            .map(|s| s.parse::<RelativeRange>())
            .transpose()?,
    })
}

pub fn run_query(
    conn: &Connection,
    user_id: UserId,
    query: &StatsQuery,
    today: NaiveDate,
) -> Result<StatsReport> {
    let window = query.resolve(today)?;
    let entries = store::entries_for_user(conn, user_id)?;
    tracing::debug!(user = user_id, ?window, loaded = entries.len(), "building stats");
    Ok(build_report(&entries, window))
}

fn window_label(window: &StatsWindow) -> String {
    match window {
        StatsWindow::Calendar { year, month: None } => year.to_string(),
        StatsWindow::Calendar {
            year,
            month: Some(m),
        } => format!("{}-{:02}", year, m),
        StatsWindow::Range { start, end } => format!("{} .. {}", start, end),
    }
}

fn print_report(report: &StatsReport) {
    println!("Stats for {}", window_label(&report.window));
    println!(
        "{}",
        pretty_table(
            &["Income", "Expense", "Balance", "Entries"],
            vec![vec![
                fmt_money(&report.totals.total_income),
                fmt_money(&report.totals.total_expense),
                fmt_money(&report.totals.balance),
                report.entries.len().to_string(),
            ]],
        )
    );

    if !report.category_stats.is_empty() {
        let rows = report
            .category_stats
            .iter()
            .map(|c| vec![c.name.clone(), c.kind.to_string(), fmt_money(&c.value)])
            .collect();
        println!("{}", pretty_table(&["Category", "Type", "Total"], rows));
    }

    let rows = report
        .trend
        .iter()
        .map(|t| vec![t.name.clone(), fmt_money(&t.income), fmt_money(&t.expense)])
        .collect();
    println!("{}", pretty_table(&["Month", "Income", "Expense"], rows));
}
