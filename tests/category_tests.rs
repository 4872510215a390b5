// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use spendwise::error::TrackerError;
use spendwise::models::{Category, CategoryKind, CategoryUpdate, NewEntry, Owner, UserId};
use spendwise::resolver::{DeleteOutcome, DeleteStrategy, OTHER_CATEGORY, delete_category};
use spendwise::{cli, commands::categories, db, store};

fn setup() -> (Connection, UserId) {
    let conn = db::open_in_memory().unwrap();
    let user = store::create_user(&conn, "ana@example.com", Some("Ana")).unwrap();
    (conn, user.id)
}

fn personal(conn: &Connection, user: UserId, name: &str, kind: CategoryKind) -> Category {
    store::create_category(conn, name, kind, Owner::User(user)).unwrap()
}

fn add_entry(conn: &Connection, user: UserId, category_id: i64, amount: Decimal) {
    store::create_entry(
        conn,
        user,
        &NewEntry {
            amount,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            description: None,
            category_id,
        },
    )
    .unwrap();
}

#[test]
fn unused_category_is_deleted_outright() {
    let (mut conn, user) = setup();
    let cat = personal(&conn, user, "Hobby", CategoryKind::Expense);

    let outcome = delete_category(&mut conn, user, cat.id, DeleteStrategy::Block).unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(store::find_visible_category(&conn, user, cat.id).unwrap().is_none());

    let again = delete_category(&mut conn, user, cat.id, DeleteStrategy::Block).unwrap_err();
    assert!(again.is_not_found());
}

#[test]
fn conflict_reports_count_and_changes_nothing() {
    let (mut conn, user) = setup();
    let cat = personal(&conn, user, "Hobby", CategoryKind::Expense);
    for cents in [1000, 2000, 3000] {
        add_entry(&conn, user, cat.id, Decimal::new(cents, 2));
    }

    let err = delete_category(&mut conn, user, cat.id, DeleteStrategy::Block).unwrap_err();
    assert!(matches!(err, TrackerError::RelationExists { count: 3 }));
    assert_eq!(err.conflict_count(), Some(3));
    assert_eq!(err.kind(), "RELATION_EXISTS");

    assert!(store::find_visible_category(&conn, user, cat.id).unwrap().is_some());
    assert_eq!(store::count_entries_for_category(&conn, user, cat.id).unwrap(), 3);
}

#[test]
fn reassign_moves_entries_to_shared_other_of_same_type() {
    let (mut conn, user) = setup();
    let cat = personal(&conn, user, "Hobby", CategoryKind::Expense);
    add_entry(&conn, user, cat.id, Decimal::new(5555, 2));

    let outcome = delete_category(&mut conn, user, cat.id, DeleteStrategy::ReassignToOther).unwrap();
    let DeleteOutcome::Reassigned {
        entries_moved,
        target,
    } = outcome
    else {
        panic!("expected reassignment, got {:?}", outcome);
    };
    assert_eq!(entries_moved, 1);

    let other = store::find_visible_category(&conn, user, target).unwrap().unwrap();
    assert_eq!(other.name, OTHER_CATEGORY);
    assert_eq!(other.kind, CategoryKind::Expense);
    assert!(other.is_system());

    let entries = store::entries_for_user(&conn, user).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount, Decimal::new(5555, 2));
    assert_eq!(entries[0].category.as_ref().unwrap().id, target);
    assert!(store::find_visible_category(&conn, user, cat.id).unwrap().is_none());
}

#[test]
fn existing_other_is_reused_and_types_stay_separate() {
    let (mut conn, user) = setup();
    let a = personal(&conn, user, "Hobby", CategoryKind::Expense);
    let b = personal(&conn, user, "Games", CategoryKind::Expense);
    let c = personal(&conn, user, "Gifts", CategoryKind::Income);
    add_entry(&conn, user, a.id, Decimal::new(100, 0));
    add_entry(&conn, user, b.id, Decimal::new(200, 0));
    add_entry(&conn, user, c.id, Decimal::new(300, 0));

    let target = |o: DeleteOutcome| match o {
        DeleteOutcome::Reassigned { target, .. } => target,
        other => panic!("unexpected {:?}", other),
    };
    let first = target(delete_category(&mut conn, user, a.id, DeleteStrategy::ReassignToOther).unwrap());
    let second = target(delete_category(&mut conn, user, b.id, DeleteStrategy::ReassignToOther).unwrap());
    let income = target(delete_category(&mut conn, user, c.id, DeleteStrategy::ReassignToOther).unwrap());
    assert_eq!(first, second);
    assert_ne!(first, income);

    let others: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM categories WHERE name=?1 AND user_id IS NULL",
            [OTHER_CATEGORY],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(others, 2);
}

#[test]
fn cascade_removes_entries_with_category() {
    let (mut conn, user) = setup();
    let cat = personal(&conn, user, "Hobby", CategoryKind::Expense);
    add_entry(&conn, user, cat.id, Decimal::new(6666, 2));

    let outcome = delete_category(&mut conn, user, cat.id, DeleteStrategy::Cascade).unwrap();
    assert_eq!(outcome, DeleteOutcome::Cascaded { entries_deleted: 1 });
    assert!(store::entries_for_user(&conn, user).unwrap().is_empty());
    assert!(store::find_visible_category(&conn, user, cat.id).unwrap().is_none());
}

#[test]
fn system_categories_are_protected() {
    let (mut conn, user) = setup();
    let food = store::find_visible_category_by_name(&conn, user, "food")
        .unwrap()
        .unwrap();
    assert!(food.is_system());

    for strategy in [
        DeleteStrategy::Block,
        DeleteStrategy::Cascade,
        DeleteStrategy::ReassignToOther,
    ] {
        let err = delete_category(&mut conn, user, food.id, strategy).unwrap_err();
        assert!(matches!(err, TrackerError::ProtectedCategory(_)));
    }

    let err = store::update_category(
        &conn,
        user,
        food.id,
        &CategoryUpdate {
            name: Some("Groceries".into()),
            kind: None,
        },
    )
    .unwrap_err();
    assert!(matches!(err, TrackerError::ProtectedCategory(_)));
}

#[test]
fn another_users_category_reads_as_missing() {
    let (mut conn, user) = setup();
    let other_user = store::create_user(&conn, "ben@example.com", None).unwrap().id;
    let theirs = personal(&conn, other_user, "Golf", CategoryKind::Expense);

    let err = delete_category(&mut conn, user, theirs.id, DeleteStrategy::Cascade).unwrap_err();
    assert!(err.is_not_found());
    assert!(store::find_visible_category(&conn, other_user, theirs.id).unwrap().is_some());
    assert!(!store::list_visible_categories(&conn, user)
        .unwrap()
        .iter()
        .any(|c| c.id == theirs.id));
}

#[test]
fn category_type_is_fixed_after_creation() {
    let (conn, user) = setup();
    let cat = personal(&conn, user, "Hobby", CategoryKind::Expense);

    let err = store::update_category(
        &conn,
        user,
        cat.id,
        &CategoryUpdate {
            name: None,
            kind: Some(CategoryKind::Income),
        },
    )
    .unwrap_err();
    assert!(matches!(err, TrackerError::Validation(_)));

    let renamed = store::update_category(
        &conn,
        user,
        cat.id,
        &CategoryUpdate {
            name: Some("Crafts".into()),
            kind: Some(CategoryKind::Expense),
        },
    )
    .unwrap();
    assert_eq!(renamed.name, "Crafts");
    assert_eq!(renamed.kind, CategoryKind::Expense);
}

#[test]
fn duplicate_personal_category_is_rejected() {
    let (conn, user) = setup();
    personal(&conn, user, "Hobby", CategoryKind::Expense);
    for name in [" Hobby ", "hobby", "HOBBY"] {
        let err = store::create_category(&conn, name, CategoryKind::Expense, Owner::User(user))
            .unwrap_err();
        assert!(matches!(err, TrackerError::Duplicate { .. }));
    }
    let games = personal(&conn, user, "Games", CategoryKind::Expense);
    let err = store::update_category(
        &conn,
        user,
        games.id,
        &CategoryUpdate {
            name: Some("HOBBY".into()),
            kind: None,
        },
    )
    .unwrap_err();
    assert!(matches!(err, TrackerError::Duplicate { .. }));
    // a case-only rename of the same row is fine
    let renamed = store::update_category(
        &conn,
        user,
        games.id,
        &CategoryUpdate {
            name: Some("games".into()),
            kind: None,
        },
    )
    .unwrap();
    assert_eq!(renamed.name, "games");
    // same name under the other type is a different category
    personal(&conn, user, "Hobby", CategoryKind::Income);
}

#[test]
fn cli_rm_surfaces_conflict_then_reassigns() {
    let (mut conn, user) = setup();
    let cat = personal(&conn, user, "Hobby", CategoryKind::Expense);
    add_entry(&conn, user, cat.id, Decimal::new(10, 0));
    add_entry(&conn, user, cat.id, Decimal::new(20, 0));
    let id = cat.id.to_string();

    let matches = cli::build_cli().get_matches_from(["spendwise", "category", "rm", "--id", &id]);
    let Some(("category", m)) = matches.subcommand() else {
        panic!("no category subcommand");
    };
    let err = categories::handle(&mut conn, user, m).unwrap_err();
    let inner = err.downcast_ref::<TrackerError>().unwrap();
    assert_eq!(inner.conflict_count(), Some(2));
    assert!(err.to_string().contains("--force"));

    let matches = cli::build_cli().get_matches_from([
        "spendwise",
        "category",
        "rm",
        "--id",
        &id,
        "--reassign-other",
    ]);
    let Some(("category", m)) = matches.subcommand() else {
        panic!("no category subcommand");
    };
    categories::handle(&mut conn, user, m).unwrap();
    let entries = store::entries_for_user(&conn, user).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries
        .iter()
        .all(|e| e.category.as_ref().unwrap().name == OTHER_CATEGORY));
}

fn block_category_deletes(conn: &Connection) {
    conn.execute_batch(
        "CREATE TRIGGER block_category_delete BEFORE DELETE ON categories
         BEGIN SELECT RAISE(ABORT, 'category delete blocked'); END;",
    )
    .unwrap();
}

#[test]
fn failed_delete_rolls_back_every_step() {
    for strategy in [DeleteStrategy::Cascade, DeleteStrategy::ReassignToOther] {
        let (mut conn, user) = setup();
        let cat = personal(&conn, user, "Hobby", CategoryKind::Expense);
        add_entry(&conn, user, cat.id, Decimal::new(1234, 2));
        block_category_deletes(&conn);

        let err = delete_category(&mut conn, user, cat.id, strategy).unwrap_err();
        assert!(matches!(err, TrackerError::DeleteFailed(_)), "{:?}: {:?}", strategy, err);
        assert_eq!(err.kind(), "DELETE_FAILED");

        assert!(store::find_visible_category(&conn, user, cat.id).unwrap().is_some());
        assert_eq!(store::count_entries_for_category(&conn, user, cat.id).unwrap(), 1);
        let others: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM categories WHERE name=?1",
                [OTHER_CATEGORY],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(others, 0);
    }
}
