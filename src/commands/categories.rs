// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{CategoryKind, CategoryUpdate, Owner, UserId};
use crate::resolver::{self, DeleteOutcome, DeleteStrategy};
use crate::store;
use crate::utils::{maybe_print_json, parse_id, pretty_table, required_arg};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, user_id: UserId, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = required_arg(sub, "name")?;
            let kind: CategoryKind = required_arg(sub, "type")?.parse()?;
            let cat = store::create_category(conn, name, kind, Owner::User(user_id))?;
            println!("Added {} category '{}' (id {})", cat.kind, cat.name, cat.id);
        }
        Some(("list", sub)) => {
            let cats = store::list_visible_categories(conn, user_id)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &cats)? {
                let data = cats
                    .into_iter()
                    .map(|c| {
                        let scope = if c.is_system() { "system" } else { "personal" };
                        vec![c.id.to_string(), c.name, c.kind.to_string(), scope.to_string()]
                    })
                    .collect();
                println!("{}", pretty_table(&["ID", "Name", "Type", "Scope"], data));
            }
        }
        Some(("edit", sub)) => {
            let id = parse_id(required_arg(sub, "id")?)?;
            let update = CategoryUpdate {
                name: sub.get_one::<String>("name").cloned(),
                kind: sub
                    .get_one::<String>("type")
                    .map(|t| t.parse::<CategoryKind>())
                    .transpose()?,
            };
            let cat = store::update_category(conn, user_id, id, &update)?;
            println!("Updated category {} -> '{}'", cat.id, cat.name);
        }
        Some(("rm", sub)) => rm(conn, user_id, sub)?,
        _ => {}
    }
    Ok(())
}

fn rm(conn: &mut Connection, user_id: UserId, sub: &clap::ArgMatches) -> Result<()> {
    let id = parse_id(required_arg(sub, "id")?)?;
    let strategy = if sub.get_flag("force") {
        DeleteStrategy::Cascade
    } else if sub.get_flag("reassign_other") {
        DeleteStrategy::ReassignToOther
    } else {
        DeleteStrategy::Block
    };

    match resolver::delete_category(conn, user_id, id, strategy) {
        Ok(DeleteOutcome::Deleted) => println!("Removed category {}", id),
        Ok(DeleteOutcome::Cascaded { entries_deleted }) => {
            println!("Removed category {} and {} entries", id, entries_deleted)
        }
        Ok(DeleteOutcome::Reassigned {
            entries_moved,
            target,
        }) => println!(
            "Removed category {}; moved {} entries to '{}' (id {})",
            id,
            entries_moved,
            resolver::OTHER_CATEGORY,
            target
        ),
        Err(e) => {
            let Some(count) = e.conflict_count() else {
                return Err(e.into());
            };
            return Err(anyhow::Error::new(e).context(format!(
                "Category {} still has {} entries; rerun with --force to delete them \
                 or --reassign-other to move them",
                id, count
            )));
        }
    }
    Ok(())
}
