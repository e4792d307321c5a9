//! Data models for the Outlay record store.
//!
//! This module contains strongly-typed representations of the expense
//! entity and its payloads, newtype ID wrappers, the fixed category
//! set, filter criteria, and the derived summary aggregate.

mod category;
mod expense;
mod filter;
mod ids;
mod summary;
mod user;

pub use category::Category;
pub use chrono::NaiveDate;
pub use expense::{Expense, ExpensePatch, NewExpense};
pub use filter::ExpenseFilter;
pub use ids::{ExpenseId, UserId};
pub use summary::Summary;
pub use user::AuthUser;
