// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use spendwise::commands::entries::{
    self, EntryFilter, EntrySort, KindFilter, filter_entries, signed_amount,
};
use spendwise::error::TrackerError;
use spendwise::models::{CategoryKind, EntryUpdate, NewEntry, Owner, UserId};
use spendwise::{cli, db, store};

fn setup() -> (Connection, UserId) {
    let conn = db::open_in_memory().unwrap();
    let user = store::create_user(&conn, "ana@example.com", None).unwrap();
    (conn, user.id)
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn system_id(conn: &Connection, user: UserId, name: &str) -> i64 {
    store::find_visible_category_by_name(conn, user, name)
        .unwrap()
        .unwrap()
        .id
}

fn add(conn: &Connection, user: UserId, cat: &str, amount: i64, date: NaiveDate, memo: &str) -> i64 {
    store::create_entry(
        conn,
        user,
        &NewEntry {
            amount: Decimal::new(amount, 0),
            date,
            description: Some(memo.to_string()),
            category_id: system_id(conn, user, cat),
        },
    )
    .unwrap()
    .id
}

fn run(conn: &Connection, user: UserId, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["spendwise", "entry"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    let Some(("entry", m)) = matches.subcommand() else {
        panic!("no entry subcommand");
    };
    entries::handle(conn, user, m)
}

#[test]
fn entry_needs_visible_category_and_non_negative_amount() {
    let (conn, user) = setup();
    let other = store::create_user(&conn, "ben@example.com", None).unwrap().id;
    let theirs =
        store::create_category(&conn, "Golf", CategoryKind::Expense, Owner::User(other)).unwrap();

    let err = store::create_entry(
        &conn,
        user,
        &NewEntry {
            amount: Decimal::new(10, 0),
            date: ymd(2025, 1, 1),
            description: None,
            category_id: theirs.id,
        },
    )
    .unwrap_err();
    assert!(err.is_not_found());

    let err = store::create_entry(
        &conn,
        user,
        &NewEntry {
            amount: Decimal::new(-10, 0),
            date: ymd(2025, 1, 1),
            description: None,
            category_id: system_id(&conn, user, "Food"),
        },
    )
    .unwrap_err();
    assert!(matches!(err, TrackerError::Validation(_)));
    assert!(store::entries_for_user(&conn, user).unwrap().is_empty());
}

#[test]
fn entries_are_scoped_to_their_owner() {
    let (conn, user) = setup();
    let other = store::create_user(&conn, "ben@example.com", None).unwrap().id;
    let id = add(&conn, user, "Food", 12, ymd(2025, 1, 5), "Lunch");

    assert_eq!(store::entries_for_user(&conn, user).unwrap().len(), 1);
    assert!(store::entries_for_user(&conn, other).unwrap().is_empty());
    assert!(store::find_entry(&conn, other, id).unwrap().is_none());
    assert!(store::delete_entry(&conn, other, id).unwrap_err().is_not_found());
    assert!(store::find_entry(&conn, user, id).unwrap().is_some());
}

#[test]
fn update_keeps_untouched_fields() {
    let (conn, user) = setup();
    let id = add(&conn, user, "Food", 12, ymd(2025, 1, 5), "Lunch");

    let updated = store::update_entry(
        &conn,
        user,
        id,
        &EntryUpdate {
            amount: Some(Decimal::new(1575, 2)),
            category_id: Some(system_id(&conn, user, "Transport")),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(updated.amount, Decimal::new(1575, 2));
    assert_eq!(updated.date, Some(ymd(2025, 1, 5)));
    assert_eq!(updated.description.as_deref(), Some("Lunch"));
    assert_eq!(updated.category.unwrap().name, "Transport");

    let err = store::update_entry(
        &conn,
        user,
        id,
        &EntryUpdate {
            amount: Some(Decimal::new(-1, 0)),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, TrackerError::Validation(_)));
}

#[test]
fn list_filters_and_sorts_by_signed_amount() {
    let (conn, user) = setup();
    add(&conn, user, "Salary", 3000, ymd(2025, 1, 1), "January pay");
    add(&conn, user, "Food", 40, ymd(2025, 1, 3), "Groceries");
    add(&conn, user, "Rent", 900, ymd(2025, 1, 2), "Flat");
    add(&conn, user, "Food", 15, ymd(2025, 1, 4), "Lunch with Bo");
    let all = store::entries_for_user(&conn, user).unwrap();

    let by_amount = filter_entries(
        all.clone(),
        &EntryFilter {
            sort: EntrySort::AmountAsc,
            ..Default::default()
        },
    );
    let signed: Vec<Decimal> = by_amount.iter().map(signed_amount).collect();
    assert_eq!(
        signed,
        [
            Decimal::new(-900, 0),
            Decimal::new(-40, 0),
            Decimal::new(-15, 0),
            Decimal::new(3000, 0)
        ]
    );

    let newest = filter_entries(all.clone(), &EntryFilter::default());
    assert_eq!(newest[0].description.as_deref(), Some("Lunch with Bo"));

    let incomes = filter_entries(
        all.clone(),
        &EntryFilter {
            kind: KindFilter::Only(CategoryKind::Income),
            ..Default::default()
        },
    );
    assert_eq!(incomes.len(), 1);

    let searched = filter_entries(
        all.clone(),
        &EntryFilter {
            search: Some("FOOD".into()),
            sort: EntrySort::DateAsc,
            limit: Some(1),
            ..Default::default()
        },
    );
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].description.as_deref(), Some("Groceries"));

    let by_memo = filter_entries(
        all,
        &EntryFilter {
            search: Some("lunch".into()),
            ..Default::default()
        },
    );
    assert_eq!(by_memo.len(), 1);
}

#[test]
fn cli_add_resolves_category_by_name() {
    let (conn, user) = setup();
    run(
        &conn,
        user,
        &[
            "add",
            "--date",
            "2025-02-10",
            "--amount",
            "12.50",
            "--category",
            " food ",
            "--description",
            "Pizza",
        ],
    )
    .unwrap();

    let entries = store::entries_for_user(&conn, user).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].category.as_ref().unwrap().name, "Food");
    assert_eq!(entries[0].amount, Decimal::new(1250, 2));

    let err = run(
        &conn,
        user,
        &["add", "--date", "2025-02-10", "--amount", "1", "--category", "Nope"],
    )
    .unwrap_err();
    assert!(err.downcast_ref::<TrackerError>().unwrap().is_not_found());
}

#[test]
fn cli_list_query_rows_apply_flags() {
    let (conn, user) = setup();
    add(&conn, user, "Salary", 3000, ymd(2025, 1, 1), "Pay");
    add(&conn, user, "Bonus", 500, ymd(2025, 1, 2), "Q4");
    add(&conn, user, "Food", 40, ymd(2025, 1, 3), "Groceries");

    let matches = cli::build_cli().get_matches_from([
        "spendwise",
        "entry",
        "list",
        "--type",
        "income",
        "--sort",
        "amount-desc",
    ]);
    let Some(("entry", m)) = matches.subcommand() else {
        panic!("no entry subcommand");
    };
    let Some(("list", sub)) = m.subcommand() else {
        panic!("no list subcommand");
    };
    let rows = entries::query_rows(&conn, user, sub).unwrap();
    let cats: Vec<&str> = rows.iter().map(|r| r.category.as_str()).collect();
    assert_eq!(cats, ["Salary", "Bonus"]);
    assert!(rows.iter().all(|r| r.kind == CategoryKind::Income));
}

#[test]
fn cli_rm_deletes_only_once() {
    let (conn, user) = setup();
    let id = add(&conn, user, "Food", 9, ymd(2025, 1, 1), "Snack").to_string();
    run(&conn, user, &["rm", "--id", &id]).unwrap();
    assert!(store::entries_for_user(&conn, user).unwrap().is_empty());
    let err = run(&conn, user, &["rm", "--id", &id]).unwrap_err();
    assert!(err.downcast_ref::<TrackerError>().unwrap().is_not_found());
}
