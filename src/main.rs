// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use spendwise::{cli, commands, db, utils};

fn main() -> Result<()> {
    utils::init_tracing();
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let mut conn = db::open_or_init()?;
    let explicit_user = matches.get_one::<String>("user").map(String::as_str);

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("user", sub)) => commands::users::handle(&conn, sub)?,
        Some(("category", sub)) => {
            let user = utils::current_user(&conn, explicit_user)?;
            commands::categories::handle(&mut conn, user.id, sub)?
        }
        Some(("entry", sub)) => {
            let user = utils::current_user(&conn, explicit_user)?;
            commands::entries::handle(&conn, user.id, sub)?
        }
        Some(("stats", sub)) => {
            let user = utils::current_user(&conn, explicit_user)?;
            commands::reports::handle(&conn, user.id, sub)?
        }
        Some(("import", sub)) => {
            let user = utils::current_user(&conn, explicit_user)?;
            commands::importer::handle(&conn, user.id, sub)?
        }
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
