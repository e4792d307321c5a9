//! Filter criteria for expense queries.

use chrono::NaiveDate;

use super::{Category, Expense};

/// Composable filter for querying expenses from the record store.
///
/// Use builder-style methods to chain multiple criteria. All conditions
/// are combined — an expense must satisfy every set criterion to pass.
/// An empty filter matches the user's complete record set.
///
/// # Examples
///
/// ```
/// use outlay_rs::models::{Category, ExpenseFilter, NaiveDate};
///
/// let filter = ExpenseFilter::new()
///     .category(Category::Food)
///     .date_range(
///         NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///         NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
///     )
///     .search("coffee");
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExpenseFilter {
    /// Category equality.
    pub category: Option<Category>,
    /// Start date (inclusive).
    pub date_from: Option<NaiveDate>,
    /// End date (inclusive).
    pub date_to: Option<NaiveDate>,
    /// Description substring (case-insensitive).
    pub search: Option<String>,
}

impl ExpenseFilter {
    /// Creates an empty filter that matches all expenses.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to expenses with the given category.
    #[inline]
    #[must_use]
    pub const fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Restricts to expenses dated on or after the given date.
    #[inline]
    #[must_use]
    pub const fn from_date(mut self, from: NaiveDate) -> Self {
        self.date_from = Some(from);
        self
    }

    /// Restricts to expenses dated on or before the given date.
    #[inline]
    #[must_use]
    pub const fn to_date(mut self, to: NaiveDate) -> Self {
        self.date_to = Some(to);
        self
    }

    /// Restricts to expenses within the given date range (inclusive).
    #[inline]
    #[must_use]
    pub const fn date_range(self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from_date(from).to_date(to)
    }

    /// Restricts to expenses whose description contains the given
    /// substring (case-insensitive).
    #[inline]
    #[must_use]
    pub fn search<T: Into<String>>(mut self, needle: T) -> Self {
        self.search = Some(needle.into());
        self
    }

    /// Returns `true` if the expense satisfies all set criteria.
    ///
    /// The remote record store evaluates the same predicates
    /// server-side; this in-process counterpart backs
    /// [`crate::store::InMemoryStore`] and test assertions.
    #[inline]
    #[must_use]
    pub fn matches(&self, expense: &Expense) -> bool {
        self.matches_category(expense) && self.matches_date(expense) && self.matches_search(expense)
    }

    /// Checks the category criterion.
    fn matches_category(&self, expense: &Expense) -> bool {
        self.category.is_none_or(|category| expense.category == category)
    }

    /// Checks the date range criteria.
    fn matches_date(&self, expense: &Expense) -> bool {
        self.date_from.is_none_or(|from| expense.date >= from)
            && self.date_to.is_none_or(|to| expense.date <= to)
    }

    /// Checks the description substring criterion.
    fn matches_search(&self, expense: &Expense) -> bool {
        self.search.as_ref().is_none_or(|needle| {
            expense
                .description
                .to_lowercase()
                .contains(&needle.to_lowercase())
        })
    }
}
