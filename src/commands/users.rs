// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::store;
use crate::utils::{
    ACTIVE_USER_KEY, current_user, get_setting, pretty_table, required_arg, set_setting,
};
use anyhow::{Result, anyhow};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let email = required_arg(sub, "email")?;
            let name = sub.get_one::<String>("name").map(String::as_str);
            let user = store::create_user(conn, email, name)?;
            if get_setting(conn, ACTIVE_USER_KEY)?.is_none() {
                set_setting(conn, ACTIVE_USER_KEY, &user.email)?;
            }
            println!("Added user '{}' (id {})", user.email, user.id);
        }
        Some(("list", _)) => {
            let active = get_setting(conn, ACTIVE_USER_KEY)?.unwrap_or_default();
            let mut data = Vec::new();
            for u in store::list_users(conn)? {
                let marker = if u.email == active { "*" } else { "" };
                data.push(vec![
                    marker.to_string(),
                    u.id.to_string(),
                    u.email,
                    u.name.unwrap_or_default(),
                    u.created_at,
                ]);
            }
            println!(
                "{}",
                pretty_table(&["", "ID", "Email", "Name", "Created"], data)
            );
        }
        Some(("use", sub)) => {
            let email = required_arg(sub, "email")?;
            let user = store::find_user_by_email(conn, email)?
                .ok_or_else(|| anyhow!("User '{}' not found", email.trim()))?;
            set_setting(conn, ACTIVE_USER_KEY, &user.email)?;
            println!("Active user is now '{}'", user.email);
        }
        Some(("rename", sub)) => {
            let user = current_user(conn, sub.get_one::<String>("user").map(String::as_str))?;
            let name = required_arg(sub, "name")?;
            let user = store::rename_user(conn, user.id, name)?;
            println!(
                "Renamed '{}' to '{}'",
                user.email,
                user.name.unwrap_or_default()
            );
        }
        _ => {}
    }
    Ok(())
}
