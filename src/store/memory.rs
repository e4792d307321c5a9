//! In-memory record store backend for testing.
//!
//! Provides [`InMemoryStore`], a thread-safe in-process implementation
//! of the record store traits. Ideal for unit and integration tests
//! where a network round trip is undesirable.

use std::sync::Mutex;

#[cfg(feature = "async")]
use core::future::{self, Future};

use chrono::Utc;

use crate::error::{OutlayError, Result};
use crate::models::{Expense, ExpenseFilter, ExpenseId, ExpensePatch, NewExpense, UserId};

/// Thread-safe in-memory record store.
///
/// This type implements both [`super::RecordStore`] (async) and
/// [`super::BlockingRecordStore`] (blocking) traits, providing a
/// zero-setup backend for tests and demos.
///
/// Rows are owned by the single user the store was created for;
/// [`InMemoryStore::insert`] via the traits assigns sequential ids and
/// stamps both timestamps with the current instant. Selection applies
/// the same predicates and ordering the remote store would.
///
/// # Example
///
/// ```rust
/// use outlay_rs::models::UserId;
/// use outlay_rs::store::InMemoryStore;
///
/// let store = InMemoryStore::new(UserId::from("user-1"));
/// // Use with ExpenseLedger::new or ExpenseLedgerBlocking::new.
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    /// All state behind a single mutex for thread-safe interior
    /// mutability.
    inner: Mutex<Inner>,
}

/// Inner mutable state.
#[derive(Debug)]
struct Inner {
    /// The user all rows belong to.
    user: UserId,
    /// Stored expense rows, in insertion order.
    rows: Vec<Expense>,
    /// Monotonic counter backing id assignment.
    next_row: u64,
}

impl InMemoryStore {
    /// Creates an empty store owned by the given user.
    #[inline]
    #[must_use]
    pub const fn new(user: UserId) -> Self {
        Self {
            inner: Mutex::new(Inner {
                user,
                rows: Vec::new(),
                next_row: 0,
            }),
        }
    }

    /// Inserts pre-built rows, keeping their ids and timestamps.
    ///
    /// Intended for test fixtures that need full control over the
    /// stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    #[inline]
    pub fn seed(&self, rows: Vec<Expense>) -> Result<()> {
        self.with_lock(|inner| inner.rows.extend(rows))
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        Ok(f(&mut inner))
    }

    /// Resolves the owning user.
    fn current_user_sync(&self) -> Result<UserId> {
        self.with_lock(|inner| inner.user.clone())
    }

    /// Evaluates a filtered, ordered selection.
    fn select_sync(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        self.with_lock(|inner| {
            let mut rows: Vec<Expense> = inner
                .rows
                .iter()
                .filter(|row| filter.matches(row))
                .cloned()
                .collect();
            rows.sort_by(Expense::newest_first);
            rows
        })
    }

    /// Creates a row with a fresh id and current timestamps.
    fn insert_sync(&self, expense: &NewExpense, user: UserId) -> Result<Expense> {
        self.with_lock(|inner| {
            inner.next_row += 1;
            let now = Utc::now();
            let row = Expense {
                id: ExpenseId::new(format!("mem-{}", inner.next_row)),
                amount: expense.amount(),
                category: expense.category(),
                description: expense.description().to_owned(),
                date: expense.date(),
                created_at: now,
                updated_at: now,
                user_id: user,
            };
            inner.rows.push(row.clone());
            row
        })
    }

    /// Patches the row with the given id.
    fn update_sync(&self, id: &ExpenseId, patch: &ExpensePatch) -> Result<Expense> {
        self.with_lock(|inner| {
            let Some(row) = inner.rows.iter_mut().find(|row| row.id == *id) else {
                return Err(OutlayError::UnknownExpense(id.clone()));
            };
            patch.apply_to(row);
            row.updated_at = Utc::now();
            Ok(row.clone())
        })?
    }

    /// Removes the row with the given id.
    fn delete_sync(&self, id: &ExpenseId) -> Result<()> {
        self.with_lock(|inner| {
            let Some(position) = inner.rows.iter().position(|row| row.id == *id) else {
                return Err(OutlayError::UnknownExpense(id.clone()));
            };
            let _removed = inner.rows.remove(position);
            Ok(())
        })?
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> OutlayError {
    OutlayError::Store(err.to_string().into())
}

// ── BlockingRecordStore implementation ──────────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingRecordStore for InMemoryStore {
    #[inline]
    fn current_user(&self) -> Result<UserId> {
        self.current_user_sync()
    }

    #[inline]
    fn select(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        self.select_sync(filter)
    }

    #[inline]
    fn insert(&self, expense: NewExpense, user: UserId) -> Result<Expense> {
        self.insert_sync(&expense, user)
    }

    #[inline]
    fn update(&self, id: &ExpenseId, patch: ExpensePatch) -> Result<Expense> {
        self.update_sync(id, &patch)
    }

    #[inline]
    fn delete(&self, id: &ExpenseId) -> Result<()> {
        self.delete_sync(id)
    }
}

// ── RecordStore implementation ──────────────────────────────────────────

#[cfg(feature = "async")]
impl super::RecordStore for InMemoryStore {
    #[inline]
    fn current_user(&self) -> impl Future<Output = Result<UserId>> + Send {
        future::ready(self.current_user_sync())
    }

    #[inline]
    fn select(&self, filter: &ExpenseFilter) -> impl Future<Output = Result<Vec<Expense>>> + Send {
        future::ready(self.select_sync(filter))
    }

    #[inline]
    fn insert(
        &self,
        expense: NewExpense,
        user: UserId,
    ) -> impl Future<Output = Result<Expense>> + Send {
        future::ready(self.insert_sync(&expense, user))
    }

    #[inline]
    fn update(
        &self,
        id: &ExpenseId,
        patch: ExpensePatch,
    ) -> impl Future<Output = Result<Expense>> + Send {
        future::ready(self.update_sync(id, &patch))
    }

    #[inline]
    fn delete(&self, id: &ExpenseId) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.delete_sync(id))
    }
}
