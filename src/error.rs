// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Error types for the spendwise library layer.
//!
//! Command handlers wrap these in `anyhow`; everything below the CLI returns
//! [`TrackerResult`] so callers can tell a conflict from a missing record.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    /// Malformed input or a rejected mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing entity, or one the caller does not own
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// Category still referenced by entries; caller must pick a strategy
    #[error("RELATION_EXISTS: category is used by {count} entries")]
    RelationExists { count: i64 },

    #[error("System category '{0}' cannot be modified or deleted")]
    ProtectedCategory(String),

    /// The transactional part of a category deletion was rolled back
    #[error("Delete failed: {0}")]
    DeleteFailed(#[source] rusqlite::Error),

    #[error("Storage error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

impl TrackerError {
    pub fn category_not_found(identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "Category",
            identifier: identifier.to_string(),
        }
    }

    pub fn entry_not_found(identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "Entry",
            identifier: identifier.to_string(),
        }
    }

    pub fn user_not_found(identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "User",
            identifier: identifier.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Dependent entry count when this is a deletion conflict.
    pub fn conflict_count(&self) -> Option<i64> {
        match self {
            Self::RelationExists { count } => Some(*count),
            _ => None,
        }
    }

    /// Stable machine-readable tag, mirrors the HTTP-style outcome classes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Duplicate { .. } => "DUPLICATE",
            Self::RelationExists { .. } => "RELATION_EXISTS",
            Self::ProtectedCategory(_) => "PROTECTED",
            Self::DeleteFailed(_) => "DELETE_FAILED",
            Self::Store(_) => "STORE",
            Self::Csv(_) => "CSV",
        }
    }
}
