//! Expense entity and its mutation payloads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, ExpenseId, UserId};
use crate::error::{OutlayError, Result};

/// A single expense row as stored by the record store.
///
/// Only `amount`, `category`, `description`, and `date` are
/// client-settable; the remaining fields are assigned server-side and
/// immutable from this library's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Unique identifier, assigned by the record store.
    pub id: ExpenseId,
    /// Non-negative, finite amount in the account currency.
    pub amount: f64,
    /// Category from the fixed set.
    pub category: Category,
    /// Free-text description, possibly empty.
    pub description: String,
    /// Effective date of the expense (not the creation time).
    pub date: NaiveDate,
    /// Row creation timestamp, assigned by the record store.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp, assigned by the record store.
    pub updated_at: DateTime<Utc>,
    /// Owning user; row visibility is enforced server-side.
    pub user_id: UserId,
}

impl Expense {
    /// Canonical display ordering: date descending, ties broken by
    /// creation time descending.
    ///
    /// The remote query orders result sets the same way; the ledger
    /// re-applies this comparator after local patches so the in-memory
    /// list never diverges from the server-defined order.
    #[inline]
    #[must_use]
    pub fn newest_first(a: &Self, b: &Self) -> core::cmp::Ordering {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    }
}

/// Checks that an amount is finite and non-negative.
fn validate_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount >= 0.0_f64 {
        Ok(())
    } else {
        Err(OutlayError::InvalidAmount(amount))
    }
}

/// Payload for creating an expense.
///
/// Construction goes through [`NewExpense::new`], which fails closed on
/// malformed amounts before anything reaches the record store. `id`,
/// timestamps, and ownership are assigned server-side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewExpense {
    /// Non-negative, finite amount.
    amount: f64,
    /// Category from the fixed set.
    category: Category,
    /// Free-text description, possibly empty.
    description: String,
    /// Effective date of the expense.
    date: NaiveDate,
}

impl NewExpense {
    /// Creates a validated new-expense payload.
    ///
    /// # Errors
    ///
    /// Returns [`OutlayError::InvalidAmount`] if `amount` is negative,
    /// `NaN`, or infinite.
    #[inline]
    pub fn new<T: Into<String>>(
        amount: f64,
        category: Category,
        description: T,
        date: NaiveDate,
    ) -> Result<Self> {
        validate_amount(amount)?;
        Ok(Self {
            amount,
            category,
            description: description.into(),
            date,
        })
    }

    /// Returns the amount.
    #[inline]
    #[must_use]
    pub const fn amount(&self) -> f64 {
        self.amount
    }

    /// Returns the category.
    #[inline]
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Returns the description.
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the effective date.
    #[inline]
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Partial update payload for an existing expense.
///
/// Unset fields are omitted from the wire body and retain their stored
/// values. An all-unset patch is rejected by the ledger before any
/// remote call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpensePatch {
    /// Replacement amount, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Replacement category, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Replacement description, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replacement effective date, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl ExpensePatch {
    /// Creates an empty patch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the replacement amount.
    #[inline]
    #[must_use]
    pub const fn amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Sets the replacement category.
    #[inline]
    #[must_use]
    pub const fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Sets the replacement description.
    #[inline]
    #[must_use]
    pub fn description<T: Into<String>>(mut self, description: T) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the replacement effective date.
    #[inline]
    #[must_use]
    pub const fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Returns `true` if no field is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.date.is_none()
    }

    /// Validates the patch at the repository boundary.
    ///
    /// Rejects empty patches and malformed amounts before any remote
    /// call is made.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(OutlayError::EmptyPatch);
        }
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        Ok(())
    }

    /// Applies the set fields onto an expense row.
    ///
    /// Used by in-process store implementations; the HTTP client sends
    /// the patch over the wire instead.
    pub(crate) fn apply_to(&self, expense: &mut Expense) {
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(category) = self.category {
            expense.category = category;
        }
        if let Some(description) = self.description.as_ref() {
            expense.description.clone_from(description);
        }
        if let Some(date) = self.date {
            expense.date = date;
        }
    }
}
