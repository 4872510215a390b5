// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Owner-scoped record access for users, categories and entries.
//!
//! Every function takes a plain `&Connection`, so the same calls work on a
//! `rusqlite::Transaction` when a caller needs several of them to land
//! atomically.

use crate::error::{TrackerError, TrackerResult};
use crate::models::{
    Category, CategoryId, CategoryKind, CategoryRef, CategoryUpdate, EntryId, EntryUpdate,
    EntryView, NewEntry, Owner, User, UserId,
};
use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};
use rust_decimal::Decimal;

impl ToSql for CategoryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CategoryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: TrackerError| FromSqlError::Other(Box::new(e)))
    }
}

const CATEGORY_COLUMNS: &str = "id, name, type, user_id";

fn category_from_row(r: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: r.get(0)?,
        name: r.get(1)?,
        kind: r.get(2)?,
        owner: Owner::from_column(r.get(3)?),
    })
}

fn user_from_row(r: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: r.get(0)?,
        email: r.get(1)?,
        name: r.get(2)?,
        created_at: r.get(3)?,
    })
}

fn clean_text(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

// === Users ===

pub fn create_user(conn: &Connection, email: &str, name: Option<&str>) -> TrackerResult<User> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(TrackerError::Validation(format!(
            "Invalid email '{}'",
            email
        )));
    }
    if find_user_by_email(conn, &email)?.is_some() {
        return Err(TrackerError::Duplicate {
            entity_type: "User",
            identifier: email,
        });
    }
    conn.execute(
        "INSERT INTO users(email, name) VALUES (?1, ?2)",
        params![email, name.and_then(clean_text)],
    )?;
    get_user(conn, conn.last_insert_rowid())
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> TrackerResult<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, email, name, created_at FROM users WHERE email=?1",
            params![email.trim().to_lowercase()],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn get_user(conn: &Connection, id: UserId) -> TrackerResult<User> {
    conn.query_row(
        "SELECT id, email, name, created_at FROM users WHERE id=?1",
        params![id],
        user_from_row,
    )
    .optional()?
    .ok_or_else(|| TrackerError::user_not_found(id))
}

pub fn list_users(conn: &Connection) -> TrackerResult<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, email, name, created_at FROM users ORDER BY email")?;
    let rows = stmt.query_map([], user_from_row)?;
    let mut users = Vec::new();
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

pub fn rename_user(conn: &Connection, id: UserId, name: &str) -> TrackerResult<User> {
    let changed = conn.execute(
        "UPDATE users SET name=?1 WHERE id=?2",
        params![clean_text(name), id],
    )?;
    if changed == 0 {
        return Err(TrackerError::user_not_found(id));
    }
    get_user(conn, id)
}

// === Categories ===

/// System categories first, then the user's own, each grouped by type.
pub fn list_visible_categories(conn: &Connection, user_id: UserId) -> TrackerResult<Vec<Category>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories
         WHERE user_id IS NULL OR user_id=?1
         ORDER BY user_id IS NOT NULL, type, name, id"
    ))?;
    let rows = stmt.query_map(params![user_id], category_from_row)?;
    let mut cats = Vec::new();
    for row in rows {
        cats.push(row?);
    }
    Ok(cats)
}

pub fn find_visible_category(
    conn: &Connection,
    user_id: UserId,
    id: CategoryId,
) -> TrackerResult<Option<Category>> {
    let cat = conn
        .query_row(
            &format!(
                "SELECT {CATEGORY_COLUMNS} FROM categories
                 WHERE id=?1 AND (user_id IS NULL OR user_id=?2)"
            ),
            params![id, user_id],
            category_from_row,
        )
        .optional()?;
    Ok(cat)
}

/// Case-insensitive, whitespace-trimmed name match over the categories the
/// user can see. A user's own category wins over a system one of the same
/// name.
pub fn find_visible_category_by_name(
    conn: &Connection,
    user_id: UserId,
    name: &str,
) -> TrackerResult<Option<Category>> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return Ok(None);
    }
    let mut matches: Vec<Category> = list_visible_categories(conn, user_id)?
        .into_iter()
        .filter(|c| c.name.trim().to_lowercase() == wanted)
        .collect();
    matches.sort_by_key(|c| c.is_system());
    Ok(matches.into_iter().next())
}

/// Names compare case-insensitively, matching the unique index.
fn find_scoped_category(
    conn: &Connection,
    name: &str,
    kind: CategoryKind,
    owner: Owner,
) -> TrackerResult<Option<Category>> {
    let cat = conn
        .query_row(
            &format!(
                "SELECT {CATEGORY_COLUMNS} FROM categories
                 WHERE lower(name)=lower(?1) AND type=?2 AND user_id IS ?3"
            ),
            params![name, kind, owner.user_id()],
            category_from_row,
        )
        .optional()?;
    Ok(cat)
}

pub fn create_category(
    conn: &Connection,
    name: &str,
    kind: CategoryKind,
    owner: Owner,
) -> TrackerResult<Category> {
    let name = clean_text(name)
        .ok_or_else(|| TrackerError::Validation("Category name cannot be empty".into()))?;
    if find_scoped_category(conn, &name, kind, owner)?.is_some() {
        return Err(TrackerError::Duplicate {
            entity_type: "Category",
            identifier: format!("{} ({})", name, kind),
        });
    }
    conn.execute(
        "INSERT INTO categories(name, type, user_id) VALUES (?1, ?2, ?3)",
        params![name, kind, owner.user_id()],
    )?;
    Ok(Category {
        id: conn.last_insert_rowid(),
        name,
        kind,
        owner,
    })
}

/// Idempotent upsert keyed on `(name, type, owner)`. The unique index turns a
/// racing insert into a no-op, and the re-select returns whichever row won.
pub fn find_or_create_category(
    conn: &Connection,
    name: &str,
    kind: CategoryKind,
    owner: Owner,
) -> TrackerResult<Category> {
    let name = clean_text(name)
        .ok_or_else(|| TrackerError::Validation("Category name cannot be empty".into()))?;
    if let Some(existing) = find_scoped_category(conn, &name, kind, owner)? {
        return Ok(existing);
    }
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO categories(name, type, user_id) VALUES (?1, ?2, ?3)",
        params![name, kind, owner.user_id()],
    )?;
    if inserted > 0 {
        tracing::info!(name = %name, kind = %kind, ?owner, "created category on first use");
    }
    find_scoped_category(conn, &name, kind, owner)?
        .ok_or_else(|| TrackerError::category_not_found(&name))
}

pub fn update_category(
    conn: &Connection,
    user_id: UserId,
    id: CategoryId,
    update: &CategoryUpdate,
) -> TrackerResult<Category> {
    let current = match find_visible_category(conn, user_id, id)? {
        Some(c) if c.is_system() => return Err(TrackerError::ProtectedCategory(c.name)),
        Some(c) => c,
        None => return Err(TrackerError::category_not_found(id)),
    };

    if let Some(kind) = update.kind {
        if kind != current.kind {
            return Err(TrackerError::Validation(format!(
                "Category type cannot be changed after creation ({} -> {})",
                current.kind, kind
            )));
        }
    }

    let mut updated = current.clone();
    if let Some(ref raw) = update.name {
        let name = clean_text(raw)
            .ok_or_else(|| TrackerError::Validation("Category name cannot be empty".into()))?;
        if let Some(other) = find_scoped_category(conn, &name, current.kind, current.owner)? {
            if other.id != current.id {
                return Err(TrackerError::Duplicate {
                    entity_type: "Category",
                    identifier: format!("{} ({})", name, current.kind),
                });
            }
        }
        updated.name = name;
    }

    conn.execute(
        "UPDATE categories SET name=?1 WHERE id=?2 AND user_id=?3",
        params![updated.name, id, user_id],
    )?;
    Ok(updated)
}

/// Deletes a category row the user owns. Returns the number of rows removed.
pub fn delete_owned_category(
    conn: &Connection,
    user_id: UserId,
    id: CategoryId,
) -> TrackerResult<usize> {
    let n = conn.execute(
        "DELETE FROM categories WHERE id=?1 AND user_id=?2",
        params![id, user_id],
    )?;
    Ok(n)
}

// === Entries ===

const ENTRY_SELECT: &str = "SELECT e.id, e.amount, e.date, e.description, c.id, c.name, c.type
     FROM entries e
     LEFT JOIN categories c
       ON c.id = e.category_id AND (c.user_id IS NULL OR c.user_id = e.user_id)";

struct RawEntry {
    id: EntryId,
    amount: String,
    date: String,
    description: Option<String>,
    category_id: Option<CategoryId>,
    category_name: Option<String>,
    category_type: Option<String>,
}

fn raw_entry_from_row(r: &Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok(RawEntry {
        id: r.get(0)?,
        amount: r.get(1)?,
        date: r.get(2)?,
        description: r.get(3)?,
        category_id: r.get(4)?,
        category_name: r.get(5)?,
        category_type: r.get(6)?,
    })
}

/// Normalizes a stored row. Rows whose amount is unreadable are dropped;
/// an unreadable date or category degrades to `None` instead.
fn normalize_entry(raw: RawEntry) -> Option<EntryView> {
    let amount = match raw.amount.trim().parse::<Decimal>() {
        Ok(a) => a,
        Err(_) => {
            tracing::warn!(entry = raw.id, amount = %raw.amount, "skipping entry with unreadable amount");
            return None;
        }
    };
    let date = NaiveDate::parse_from_str(raw.date.trim(), "%Y-%m-%d").ok();
    if date.is_none() {
        tracing::warn!(entry = raw.id, date = %raw.date, "entry has unreadable date");
    }
    let category = match (raw.category_id, raw.category_name, raw.category_type) {
        (Some(id), Some(name), Some(t)) => t.parse().ok().map(|kind| CategoryRef { id, name, kind }),
        _ => None,
    };
    Some(EntryView {
        id: raw.id,
        amount,
        date,
        description: raw.description,
        category,
    })
}

/// Every entry the user owns, oldest first, each joined with its category.
pub fn entries_for_user(conn: &Connection, user_id: UserId) -> TrackerResult<Vec<EntryView>> {
    let mut stmt = conn.prepare(&format!(
        "{ENTRY_SELECT} WHERE e.user_id=?1 ORDER BY e.date, e.id"
    ))?;
    let rows = stmt.query_map(params![user_id], raw_entry_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        if let Some(entry) = normalize_entry(row?) {
            out.push(entry);
        }
    }
    Ok(out)
}

pub fn find_entry(conn: &Connection, user_id: UserId, id: EntryId) -> TrackerResult<Option<EntryView>> {
    let raw = conn
        .query_row(
            &format!("{ENTRY_SELECT} WHERE e.id=?1 AND e.user_id=?2"),
            params![id, user_id],
            raw_entry_from_row,
        )
        .optional()?;
    Ok(raw.and_then(normalize_entry))
}

fn validate_amount(amount: &Decimal) -> TrackerResult<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(TrackerError::Validation(format!(
            "Amount must not be negative, got {}",
            amount
        )));
    }
    Ok(())
}

fn require_visible_category(
    conn: &Connection,
    user_id: UserId,
    id: CategoryId,
) -> TrackerResult<Category> {
    find_visible_category(conn, user_id, id)?.ok_or_else(|| TrackerError::category_not_found(id))
}

pub fn create_entry(conn: &Connection, user_id: UserId, new: &NewEntry) -> TrackerResult<EntryView> {
    validate_amount(&new.amount)?;
    require_visible_category(conn, user_id, new.category_id)?;
    conn.execute(
        "INSERT INTO entries(amount, date, description, category_id, user_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            new.amount.to_string(),
            new.date.to_string(),
            new.description.as_deref().and_then(clean_text),
            new.category_id,
            user_id
        ],
    )?;
    let id = conn.last_insert_rowid();
    find_entry(conn, user_id, id)?.ok_or_else(|| TrackerError::entry_not_found(id))
}

pub fn update_entry(
    conn: &Connection,
    user_id: UserId,
    id: EntryId,
    update: &EntryUpdate,
) -> TrackerResult<EntryView> {
    let current = find_entry(conn, user_id, id)?.ok_or_else(|| TrackerError::entry_not_found(id))?;

    let amount = update.amount.unwrap_or(current.amount);
    validate_amount(&amount)?;
    let category_id = match (update.category_id, current.category.as_ref()) {
        (Some(cid), _) => require_visible_category(conn, user_id, cid)?.id,
        (None, Some(c)) => c.id,
        (None, None) => {
            return Err(TrackerError::Validation(format!(
                "Entry {} has no resolvable category; pass one explicitly",
                id
            )));
        }
    };
    let date = match (update.date, current.date) {
        (Some(d), _) | (None, Some(d)) => d,
        (None, None) => {
            return Err(TrackerError::Validation(format!(
                "Entry {} has an unreadable date; pass one explicitly",
                id
            )));
        }
    };
    let description = match update.description {
        Some(ref d) => clean_text(d),
        None => current.description.clone(),
    };

    conn.execute(
        "UPDATE entries SET amount=?1, date=?2, description=?3, category_id=?4
         WHERE id=?5 AND user_id=?6",
        params![
            amount.to_string(),
            date.to_string(),
            description,
            category_id,
            id,
            user_id
        ],
    )?;
    find_entry(conn, user_id, id)?.ok_or_else(|| TrackerError::entry_not_found(id))
}

pub fn delete_entry(conn: &Connection, user_id: UserId, id: EntryId) -> TrackerResult<()> {
    let n = conn.execute(
        "DELETE FROM entries WHERE id=?1 AND user_id=?2",
        params![id, user_id],
    )?;
    if n == 0 {
        return Err(TrackerError::entry_not_found(id));
    }
    Ok(())
}

pub fn count_entries_for_category(
    conn: &Connection,
    user_id: UserId,
    category_id: CategoryId,
) -> TrackerResult<i64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE category_id=?1 AND user_id=?2",
        params![category_id, user_id],
        |r| r.get(0),
    )?;
    Ok(n)
}

pub fn delete_entries_for_category(
    conn: &Connection,
    user_id: UserId,
    category_id: CategoryId,
) -> TrackerResult<usize> {
    let n = conn.execute(
        "DELETE FROM entries WHERE category_id=?1 AND user_id=?2",
        params![category_id, user_id],
    )?;
    Ok(n)
}

pub fn reassign_entries(
    conn: &Connection,
    user_id: UserId,
    from: CategoryId,
    to: CategoryId,
) -> TrackerResult<usize> {
    let n = conn.execute(
        "UPDATE entries SET category_id=?1 WHERE category_id=?2 AND user_id=?3",
        params![to, from, user_id],
    )?;
    Ok(n)
}
