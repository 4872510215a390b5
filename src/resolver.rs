// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Category deletion with referential safety.
//!
//! A deletion attempt either removes an unused category outright, reports a
//! conflict carrying the number of dependent entries, or (when the caller
//! picked a strategy) cascades or reassigns inside a single transaction.

use crate::error::{TrackerError, TrackerResult};
use crate::models::{Category, CategoryId, Owner, UserId};
use crate::store;
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

/// Fallback system category that receives entries of a deleted category.
pub const OTHER_CATEGORY: &str = "Other";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteStrategy {
    /// Refuse while entries still reference the category.
    #[default]
    Block,
    /// Delete dependent entries together with the category.
    Cascade,
    /// Move dependent entries onto the system "Other" category of the same type.
    ReassignToOther,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    Cascaded { entries_deleted: usize },
    Reassigned { entries_moved: usize, target: CategoryId },
}

fn delete_failed(e: TrackerError) -> TrackerError {
    match e {
        TrackerError::Store(source) => TrackerError::DeleteFailed(source),
        other => other,
    }
}

/// Looks the category up through the owner predicate so another user's
/// category reads exactly like a missing one. System categories are refused
/// before anything is counted.
fn owned_category(conn: &Connection, user_id: UserId, id: CategoryId) -> TrackerResult<Category> {
    match store::find_visible_category(conn, user_id, id)? {
        Some(cat) if cat.is_system() => Err(TrackerError::ProtectedCategory(cat.name)),
        Some(cat) => Ok(cat),
        None => Err(TrackerError::category_not_found(id)),
    }
}

pub fn delete_category(
    conn: &mut Connection,
    user_id: UserId,
    id: CategoryId,
    strategy: DeleteStrategy,
) -> TrackerResult<DeleteOutcome> {
    let category = owned_category(conn, user_id, id)?;
    let count = store::count_entries_for_category(conn, user_id, id)?;

    if count == 0 {
        let removed = store::delete_owned_category(conn, user_id, id).map_err(delete_failed)?;
        if removed == 0 {
            return Err(TrackerError::category_not_found(id));
        }
        tracing::info!(category = id, name = %category.name, "deleted unused category");
        return Ok(DeleteOutcome::Deleted);
    }

    match strategy {
        DeleteStrategy::Block => {
            tracing::debug!(category = id, count, "delete blocked by dependent entries");
            Err(TrackerError::RelationExists { count })
        }
        DeleteStrategy::Cascade => cascade(conn, user_id, &category).map_err(delete_failed),
        DeleteStrategy::ReassignToOther => {
            reassign(conn, user_id, &category).map_err(delete_failed)
        }
    }
}

fn cascade(conn: &mut Connection, user_id: UserId, category: &Category) -> TrackerResult<DeleteOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let entries_deleted = store::delete_entries_for_category(&tx, user_id, category.id)?;
    if store::delete_owned_category(&tx, user_id, category.id)? == 0 {
        return Err(TrackerError::category_not_found(category.id));
    }
    tx.commit()?;
    tracing::info!(
        category = category.id,
        name = %category.name,
        entries_deleted,
        "deleted category with its entries"
    );
    Ok(DeleteOutcome::Cascaded { entries_deleted })
}

fn reassign(conn: &mut Connection, user_id: UserId, category: &Category) -> TrackerResult<DeleteOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let other = store::find_or_create_category(&tx, OTHER_CATEGORY, category.kind, Owner::System)?;
    let entries_moved = store::reassign_entries(&tx, user_id, category.id, other.id)?;
    if store::delete_owned_category(&tx, user_id, category.id)? == 0 {
        return Err(TrackerError::category_not_found(category.id));
    }
    tx.commit()?;
    tracing::info!(
        category = category.id,
        name = %category.name,
        target = other.id,
        entries_moved,
        "deleted category after reassigning entries"
    );
    Ok(DeleteOutcome::Reassigned {
        entries_moved,
        target: other.id,
    })
}
