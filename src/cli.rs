// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version, value_parser};

fn json_args() -> [Arg; 2] {
    [
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print pretty JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    ]
}

fn id_arg(help: &'static str) -> Arg {
    Arg::new("id").long("id").required(true).help(help)
}

fn user_cmd() -> Command {
    Command::new("user")
        .about("Manage users and pick the active one")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Register a user")
                .arg(Arg::new("email").long("email").required(true))
                .arg(Arg::new("name").long("name")),
        )
        .subcommand(Command::new("list").about("List users"))
        .subcommand(
            Command::new("use")
                .about("Make a user the active one")
                .arg(Arg::new("email").long("email").required(true)),
        )
        .subcommand(
            Command::new("rename")
                .about("Change the active user's display name")
                .arg(Arg::new("name").long("name").required(true)),
        )
}

fn category_cmd() -> Command {
    Command::new("category")
        .about("Manage categories")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Create a personal category")
                .arg(Arg::new("name").long("name").required(true))
                .arg(
                    Arg::new("type")
                        .long("type")
                        .required(true)
                        .value_parser(["income", "expense"]),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("List system and personal categories")
                .args(json_args()),
        )
        .subcommand(
            Command::new("edit")
                .about("Rename a personal category")
                .arg(id_arg("Category id"))
                .arg(Arg::new("name").long("name"))
                .arg(
                    Arg::new("type")
                        .long("type")
                        .value_parser(["income", "expense"])
                        .help("Must match the current type; types are fixed at creation"),
                ),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete a personal category")
                .arg(id_arg("Category id"))
                .arg(
                    Arg::new("force")
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Also delete every entry in the category"),
                )
                .arg(
                    Arg::new("reassign_other")
                        .long("reassign-other")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("force")
                        .help("Move entries to the shared 'Other' category first"),
                ),
        )
}

fn entry_cmd() -> Command {
    Command::new("entry")
        .about("Record and browse income/expense entries")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Record an entry")
                .arg(Arg::new("date").long("date").required(true).help("YYYY-MM-DD"))
                .arg(Arg::new("amount").long("amount").required(true))
                .arg(
                    Arg::new("category")
                        .long("category")
                        .required(true)
                        .help("Category name (case-insensitive)"),
                )
                .arg(Arg::new("description").long("description")),
        )
        .subcommand(
            Command::new("list")
                .about("List entries")
                .arg(
                    Arg::new("type")
                        .long("type")
                        .value_parser(["all", "income", "expense"])
                        .default_value("all"),
                )
                .arg(
                    Arg::new("search")
                        .long("search")
                        .help("Match description or category name"),
                )
                .arg(
                    Arg::new("sort")
                        .long("sort")
                        .value_parser(["date-desc", "date-asc", "amount-asc", "amount-desc"])
                        .default_value("date-desc"),
                )
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize)),
                )
                .args(json_args()),
        )
        .subcommand(
            Command::new("edit")
                .about("Change an entry")
                .arg(id_arg("Entry id"))
                .arg(Arg::new("date").long("date"))
                .arg(Arg::new("amount").long("amount"))
                .arg(Arg::new("category").long("category"))
                .arg(Arg::new("description").long("description")),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete an entry")
                .arg(id_arg("Entry id")),
        )
}

fn stats_cmd() -> Command {
    Command::new("stats")
        .about("Income, expense and balance for a year, month or date range")
        .arg(
            Arg::new("year")
                .long("year")
                .value_parser(value_parser!(i32)),
        )
        .arg(
            Arg::new("month")
                .long("month")
                .value_parser(value_parser!(u32))
                .help("1-12, needs --year"),
        )
        .arg(Arg::new("from").long("from").help("YYYY-MM-DD"))
        .arg(Arg::new("to").long("to").help("YYYY-MM-DD"))
        .arg(
            Arg::new("range")
                .long("range")
                .value_parser(["last1m", "last3m", "last6m", "last12m"]),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue),
        )
}

fn import_cmd() -> Command {
    Command::new("import")
        .about("Import entries from CSV")
        .subcommand_required(true)
        .subcommand(
            Command::new("csv")
                .about("Import a headed CSV file using a column mapping")
                .arg(Arg::new("path").long("path").required(true))
                .arg(Arg::new("date_col").long("date-col").required(true))
                .arg(Arg::new("amount_col").long("amount-col").required(true))
                .arg(Arg::new("description_col").long("description-col"))
                .arg(Arg::new("category_col").long("category-col"))
                .arg(
                    Arg::new("delimiter")
                        .long("delimiter")
                        .default_value(","),
                )
                .arg(
                    Arg::new("preview")
                        .long("preview")
                        .action(ArgAction::SetTrue)
                        .help("Show how the first rows would import without saving"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue),
                ),
        )
}

pub fn build_cli() -> Command {
    Command::new("spendwise")
        .version(crate_version!())
        .about("Personal income/expense tracker")
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .value_name("EMAIL")
                .help("Act as this user instead of the active one"),
        )
        .subcommand(Command::new("init").about("Create the database and seed categories"))
        .subcommand(user_cmd())
        .subcommand(category_cmd())
        .subcommand(entry_cmd())
        .subcommand(stats_cmd())
        .subcommand(import_cmd())
}
