//! Derived summary aggregates over an expense list.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{Category, Expense};

/// Aggregate statistics computed from an in-memory expense list.
///
/// Recomputed on demand and never persisted; the list is bounded by
/// what one user has fetched into memory, so a full pass per
/// computation is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    /// Sum of all amounts.
    pub total: f64,
    /// Number of expenses.
    pub count: usize,
    /// Per-category subtotals; only categories present in the list are
    /// keyed. `BTreeMap` keeps display iteration deterministic.
    pub by_category: BTreeMap<Category, f64>,
}

impl Summary {
    /// Computes the summary of the given expenses.
    #[must_use]
    pub fn of(expenses: &[Expense]) -> Self {
        let mut by_category = BTreeMap::new();
        let mut total = 0.0_f64;
        for expense in expenses {
            total += expense.amount;
            *by_category.entry(expense.category).or_insert(0.0_f64) += expense.amount;
        }
        Self {
            total,
            count: expenses.len(),
            by_category,
        }
    }

    /// Mean amount per expense, or `None` for an empty list.
    #[inline]
    #[must_use]
    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        #[allow(
            clippy::cast_precision_loss,
            reason = "expense counts stay far below 2^52"
        )]
        let mean = self.total / self.count as f64;
        Some(mean)
    }
}
