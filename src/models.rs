// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::TrackerError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type UserId = i64;
pub type CategoryId = i64;
pub type EntryId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Income => "income",
            CategoryKind::Expense => "expense",
        }
    }

    /// Negative amounts are expenses, everything else is income.
    pub fn from_sign(amount: &Decimal) -> Self {
        if amount.is_sign_negative() && !amount.is_zero() {
            CategoryKind::Expense
        } else {
            CategoryKind::Income
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryKind {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(CategoryKind::Income),
            "expense" => Ok(CategoryKind::Expense),
            other => Err(TrackerError::Validation(format!(
                "Invalid category type '{}', expected income|expense",
                other
            ))),
        }
    }
}

/// Who a category belongs to. System categories are shared by every user
/// and can be neither edited nor deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "user_id", rename_all = "lowercase")]
pub enum Owner {
    System,
    User(UserId),
}

impl Owner {
    pub fn from_column(user_id: Option<UserId>) -> Self {
        match user_id {
            Some(id) => Owner::User(id),
            None => Owner::System,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Owner::System => None,
            Owner::User(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    pub owner: Owner,
}

impl Category {
    pub fn is_system(&self) -> bool {
        self.owner == Owner::System
    }

    pub fn to_ref(&self) -> CategoryRef {
        CategoryRef {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
        }
    }
}

/// The slice of a category an entry needs for aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryKind,
}

/// An entry joined with its category, normalized once at load time.
///
/// `date` is `None` when the stored value could not be parsed and `category`
/// is `None` when the referenced category no longer resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryView {
    pub id: EntryId,
    pub amount: Decimal,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub category: Option<CategoryRef>,
}

impl EntryView {
    pub fn kind(&self) -> Option<CategoryKind> {
        self.category.as_ref().map(|c| c.kind)
    }
}

#[derive(Debug, Clone)]
pub struct NewEntry {
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub category_id: CategoryId,
}

#[derive(Debug, Clone, Default)]
pub struct EntryUpdate {
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub kind: Option<CategoryKind>,
}
