// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use spendwise::error::TrackerError;
use spendwise::utils::{ACTIVE_USER_KEY, current_user, get_setting};
use spendwise::{cli, commands::users, db, store};

fn run(conn: &rusqlite::Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["spendwise"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    let Some(("user", m)) = matches.subcommand() else {
        panic!("no user subcommand");
    };
    users::handle(conn, m)
}

#[test]
fn first_user_becomes_active() {
    let conn = db::open_in_memory().unwrap();
    run(&conn, &["user", "add", "--email", "Ana@Example.com"]).unwrap();
    run(&conn, &["user", "add", "--email", "ben@example.com"]).unwrap();

    assert_eq!(
        get_setting(&conn, ACTIVE_USER_KEY).unwrap().as_deref(),
        Some("ana@example.com")
    );
    assert_eq!(current_user(&conn, None).unwrap().email, "ana@example.com");
    assert_eq!(
        current_user(&conn, Some("ben@example.com")).unwrap().email,
        "ben@example.com"
    );

    run(&conn, &["user", "use", "--email", "ben@example.com"]).unwrap();
    assert_eq!(current_user(&conn, None).unwrap().email, "ben@example.com");
}

#[test]
fn rename_acts_on_the_selected_user() {
    let conn = db::open_in_memory().unwrap();
    store::create_user(&conn, "ana@example.com", None).unwrap();
    store::create_user(&conn, "ben@example.com", None).unwrap();
    run(
        &conn,
        &["user", "rename", "--name", "Benny", "--user", "ben@example.com"],
    )
    .unwrap();

    let ben = store::find_user_by_email(&conn, "ben@example.com").unwrap().unwrap();
    assert_eq!(ben.name.as_deref(), Some("Benny"));
    let ana = store::find_user_by_email(&conn, "ana@example.com").unwrap().unwrap();
    assert_eq!(ana.name, None);
}

#[test]
fn user_validation() {
    let conn = db::open_in_memory().unwrap();
    assert!(current_user(&conn, None).is_err());
    assert!(matches!(
        store::create_user(&conn, "no-at-sign", None),
        Err(TrackerError::Validation(_))
    ));
    store::create_user(&conn, "ana@example.com", None).unwrap();
    assert!(matches!(
        store::create_user(&conn, " ANA@example.com ", None),
        Err(TrackerError::Duplicate { .. })
    ));
    assert!(run(&conn, &["user", "use", "--email", "zed@example.com"]).is_err());
}
