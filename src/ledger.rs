//! High-level expense ledger with session state.
//!
//! Combines a [`crate::store::RecordStore`] /
//! [`crate::store::BlockingRecordStore`] backend with the session's
//! working copy of the expense list, bridging caller intents
//! (fetch/add/update/delete) to the remote service and keeping local
//! state synchronized with successful mutations.

use crate::error::OutlayError;
use crate::models::Expense;

/// Session-scoped view state, guarded by a mutex inside the ledger.
#[derive(Debug, Default)]
struct SessionState {
    /// Working copy of the user's expense list, in canonical order.
    expenses: Vec<Expense>,
    /// True while a fetch is in flight.
    loading: bool,
    /// Human-readable description of the most recent failure.
    last_error: Option<String>,
    /// Sequence number of the most recently issued fetch. Responses
    /// carrying an older number are discarded.
    fetch_seq: u64,
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> OutlayError {
    OutlayError::Store(err.to_string().into())
}

/// Generates an expense ledger (async or blocking).
macro_rules! define_ledger {
    (
        ledger_name: $ledger:ident,
        store_trait: $store_trait:ident,
        ledger_doc: $ledger_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $ledger_doc]
        #[derive(Debug)]
        pub struct $ledger<S: $store_trait> {
            /// Record store backend.
            store: S,
            /// Session view state.
            state: Mutex<SessionState>,
        }

        impl<S: $store_trait> $ledger<S> {
            /// Creates a ledger over the given record store.
            ///
            /// The store is injected rather than reached through any
            /// process-wide handle, so tests can substitute
            /// [`crate::store::InMemoryStore`] or a custom fake.
            #[inline]
            pub fn new(store: S) -> Self {
                Self {
                    store,
                    state: Mutex::new(SessionState::default()),
                }
            }

            /// Acquires the state lock and applies a closure.
            fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> Result<R> {
                let mut state = self.state.lock().map_err(|err| lock_error(&err))?;
                Ok(f(&mut state))
            }

            /// Records a failed outcome in `last_error`, passing the
            /// result through unchanged.
            fn record_outcome<T>(&self, result: Result<T>) -> Result<T> {
                if let Err(err) = result.as_ref() {
                    let message = err.to_string();
                    self.with_state(move |state| state.last_error = Some(message))?;
                }
                result
            }

            /// Fetches the expense list matching the filter, replacing
            /// the session's working copy.
            ///
            /// Re-running this with new criteria is the only filter
            /// mechanism — there is no client-side re-filtering of an
            /// already-fetched list. An empty filter returns the user's
            /// complete record set; an empty result set is valid.
            ///
            /// Each invocation is tagged with a sequence number. If a
            /// newer fetch was issued while this one was in flight, the
            /// stale response is discarded and the current list is
            /// returned unchanged. The latest response, on success,
            /// replaces the whole list and clears any prior error; on
            /// failure it leaves the list untouched and records the
            /// error.
            ///
            /// # Errors
            ///
            /// Returns an error if the store fails to evaluate the
            /// query.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn fetch(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
                let seq = self.with_state(|state| {
                    state.fetch_seq += 1;
                    state.loading = true;
                    state.fetch_seq
                })?;
                tracing::debug!(seq, "fetching expenses");
                let outcome = self.store.select(filter) $( .$await_ext )?;
                self.with_state(move |state| {
                    if seq != state.fetch_seq {
                        tracing::debug!(
                            seq,
                            latest = state.fetch_seq,
                            "discarding stale fetch response"
                        );
                        return Ok(state.expenses.clone());
                    }
                    state.loading = false;
                    match outcome {
                        Ok(rows) => {
                            state.expenses = rows;
                            state.last_error = None;
                            Ok(state.expenses.clone())
                        }
                        Err(err) => {
                            state.last_error = Some(err.to_string());
                            Err(err)
                        }
                    }
                })?
            }

            /// Creates an expense and inserts it into the working copy.
            ///
            /// Ownership is stamped from the store's current
            /// authenticated user, looked up once per insert. The
            /// payload itself was validated at construction by
            /// [`NewExpense::new`]. On success the store-assigned
            /// record joins the local list, which is re-sorted with the
            /// canonical comparator; on failure the list is unchanged
            /// and the error is recorded.
            ///
            /// # Errors
            ///
            /// Returns an error if identity lookup or the insert fails.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn add(&self, expense: NewExpense) -> Result<Expense> {
                let outcome = self.submit_add(expense) $( .$await_ext )?;
                self.record_outcome(outcome)
            }

            /// Stamps ownership and performs the insert.
            $($async_kw)? fn submit_add(&self, expense: NewExpense) -> Result<Expense> {
                let user = self.store.current_user() $( .$await_ext )? ?;
                tracing::debug!(user = %user, "adding expense");
                let created = self.store.insert(expense, user) $( .$await_ext )? ?;
                self.with_state(|state| {
                    state.expenses.push(created.clone());
                    state.expenses.sort_by(Expense::newest_first);
                })?;
                Ok(created)
            }

            /// Applies a partial update to an expense.
            ///
            /// The patch is validated before any remote call: empty
            /// patches and malformed amounts fail closed. On success
            /// the matching local entry is replaced and the list is
            /// re-sorted (a changed date moves the row to its proper
            /// position); a record absent from the working copy leaves
            /// local state unchanged. The store cannot distinguish
            /// "not found" from "forbidden" for another user's row;
            /// both surface as the store's own error.
            ///
            /// # Errors
            ///
            /// Returns an error if validation or the remote update
            /// fails.
            #[tracing::instrument(skip_all, fields(id = %id))]
            pub $($async_kw)? fn update(
                &self,
                id: &ExpenseId,
                patch: ExpensePatch,
            ) -> Result<Expense> {
                let outcome = self.submit_update(id, patch) $( .$await_ext )?;
                self.record_outcome(outcome)
            }

            /// Validates and performs the update.
            $($async_kw)? fn submit_update(
                &self,
                id: &ExpenseId,
                patch: ExpensePatch,
            ) -> Result<Expense> {
                patch.validate()?;
                let updated = self.store.update(id, patch) $( .$await_ext )? ?;
                self.with_state(|state| {
                    if let Some(row) = state.expenses.iter_mut().find(|row| row.id == *id) {
                        *row = updated.clone();
                        state.expenses.sort_by(Expense::newest_first);
                    }
                })?;
                Ok(updated)
            }

            /// Deletes an expense remotely, then removes it from the
            /// working copy by identity match.
            ///
            /// The ledger applies the delete directly; confirming
            /// intent is the caller's concern.
            ///
            /// # Errors
            ///
            /// Returns an error if the remote delete fails; the local
            /// list is left unchanged in that case.
            #[tracing::instrument(skip_all, fields(id = %id))]
            pub $($async_kw)? fn delete(&self, id: &ExpenseId) -> Result<()> {
                let outcome = self.submit_delete(id) $( .$await_ext )?;
                self.record_outcome(outcome)
            }

            /// Performs the delete and prunes local state.
            $($async_kw)? fn submit_delete(&self, id: &ExpenseId) -> Result<()> {
                self.store.delete(id) $( .$await_ext )? ?;
                self.with_state(|state| state.expenses.retain(|row| row.id != *id))
            }

            /// Returns the session's working copy of the expense list.
            ///
            /// # Errors
            ///
            /// Returns an error if the state lock is poisoned.
            #[inline]
            pub fn expenses(&self) -> Result<Vec<Expense>> {
                self.with_state(|state| state.expenses.clone())
            }

            /// Returns `true` while a fetch is in flight.
            ///
            /// # Errors
            ///
            /// Returns an error if the state lock is poisoned.
            #[inline]
            pub fn is_loading(&self) -> Result<bool> {
                self.with_state(|state| state.loading)
            }

            /// Returns the most recently recorded error message, if
            /// any.
            ///
            /// # Errors
            ///
            /// Returns an error if the state lock is poisoned.
            #[inline]
            pub fn last_error(&self) -> Result<Option<String>> {
                self.with_state(|state| state.last_error.clone())
            }

            /// Computes aggregate statistics over the working copy.
            ///
            /// Recomputed on every call; the list is bounded by what
            /// one user has fetched into memory.
            ///
            /// # Errors
            ///
            /// Returns an error if the state lock is poisoned.
            #[inline]
            pub fn summary(&self) -> Result<Summary> {
                self.with_state(|state| Summary::of(&state.expenses))
            }
        }
    };
}

// ── Async variant ───────────────────────────────────────────────────────

#[cfg(feature = "async")]
mod async_ledger {
    //! Async ledger over an async record store.

    use std::sync::Mutex;

    use super::{SessionState, lock_error};
    use crate::error::Result;
    use crate::models::{Expense, ExpenseFilter, ExpenseId, ExpensePatch, NewExpense, Summary};
    use crate::store::RecordStore;

    define_ledger! {
        ledger_name: ExpenseLedger,
        store_trait: RecordStore,
        ledger_doc: "High-level async expense ledger.\n\nOwns the session's working copy of the current user's expense list\nand bridges caller intents to a [`RecordStore`]. Construct with\n[`ExpenseLedger::new`].",
        async_kw: async,
        await_kw: await,
    }
}

// ── Blocking variant ────────────────────────────────────────────────────

#[cfg(feature = "blocking")]
mod blocking_ledger {
    //! Blocking ledger over a blocking record store.

    use std::sync::Mutex;

    use super::{SessionState, lock_error};
    use crate::error::Result;
    use crate::models::{Expense, ExpenseFilter, ExpenseId, ExpensePatch, NewExpense, Summary};
    use crate::store::BlockingRecordStore;

    define_ledger! {
        ledger_name: ExpenseLedgerBlocking,
        store_trait: BlockingRecordStore,
        ledger_doc: "High-level blocking expense ledger.\n\nOwns the session's working copy of the current user's expense list\nand bridges caller intents to a [`BlockingRecordStore`]. Construct\nwith [`ExpenseLedgerBlocking::new`].",
    }
}

#[cfg(feature = "async")]
pub use async_ledger::ExpenseLedger;
#[cfg(feature = "blocking")]
pub use blocking_ledger::ExpenseLedgerBlocking;

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate};

    use crate::error::{OutlayError, Result};
    use crate::models::{
        Category, Expense, ExpenseFilter, ExpenseId, ExpensePatch, NewExpense, UserId,
    };
    use crate::store::InMemoryStore;

    /// Builds a date from components for test fixtures.
    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Creates a fully-specified expense row for seeding.
    fn row(id: &str, amount: f64, category: Category, day: NaiveDate, created: i64) -> Expense {
        Expense {
            id: ExpenseId::from(id),
            amount,
            category,
            description: String::new(),
            date: day,
            created_at: DateTime::from_timestamp(created, 0).unwrap(),
            updated_at: DateTime::from_timestamp(created, 0).unwrap(),
            user_id: UserId::from("user-1"),
        }
    }

    /// Simulated backend error used by [`FlakyStore`].
    fn outage() -> OutlayError {
        OutlayError::Api {
            status: 503,
            message: "simulated outage".to_owned(),
        }
    }

    /// Store that delegates to an [`InMemoryStore`] until told to fail.
    ///
    /// The failure switch is shared through an `Arc` so tests keep a
    /// handle after the store moves into the ledger.
    #[derive(Debug)]
    struct FlakyStore {
        /// Delegate holding the real rows.
        inner: InMemoryStore,
        /// When set, every operation fails with [`outage`].
        failing: std::sync::Arc<core::sync::atomic::AtomicBool>,
    }

    impl FlakyStore {
        /// Errors out if the store is in its failing state.
        fn check(&self) -> Result<()> {
            if self.failing.load(core::sync::atomic::Ordering::SeqCst) {
                Err(outage())
            } else {
                Ok(())
            }
        }
    }

    #[cfg(feature = "blocking")]
    impl crate::store::BlockingRecordStore for FlakyStore {
        fn current_user(&self) -> Result<UserId> {
            self.check()?;
            crate::store::BlockingRecordStore::current_user(&self.inner)
        }

        fn select(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
            self.check()?;
            crate::store::BlockingRecordStore::select(&self.inner, filter)
        }

        fn insert(&self, expense: NewExpense, user: UserId) -> Result<Expense> {
            self.check()?;
            crate::store::BlockingRecordStore::insert(&self.inner, expense, user)
        }

        fn update(&self, id: &ExpenseId, patch: ExpensePatch) -> Result<Expense> {
            self.check()?;
            crate::store::BlockingRecordStore::update(&self.inner, id, patch)
        }

        fn delete(&self, id: &ExpenseId) -> Result<()> {
            self.check()?;
            crate::store::BlockingRecordStore::delete(&self.inner, id)
        }
    }

    #[cfg(feature = "blocking")]
    mod blocking {
        use core::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        use super::*;
        use crate::ledger::ExpenseLedgerBlocking;

        /// Ledger over a flaky store pre-seeded with the given rows,
        /// plus the shared failure switch.
        fn seeded_ledger(
            rows: Vec<Expense>,
        ) -> (ExpenseLedgerBlocking<FlakyStore>, Arc<AtomicBool>) {
            let failing = Arc::new(AtomicBool::new(false));
            let store = FlakyStore {
                inner: InMemoryStore::new(UserId::from("user-1")),
                failing: Arc::clone(&failing),
            };
            store.inner.seed(rows).unwrap();
            (ExpenseLedgerBlocking::new(store), failing)
        }

        #[test]
        fn initial_state_is_empty_and_idle() {
            let (ledger, _failing) = seeded_ledger(Vec::new());
            assert!(ledger.expenses().unwrap().is_empty());
            assert!(!ledger.is_loading().unwrap());
            assert_eq!(ledger.last_error().unwrap(), None);
        }

        #[test]
        fn fetch_replaces_list_and_clears_error() {
            let (ledger, failing) = seeded_ledger(vec![
                row("exp-1", 10.0, Category::Food, date(2024, 1, 1), 100),
                row("exp-2", 20.0, Category::Travel, date(2024, 1, 2), 200),
            ]);

            // Record a failure first so we can observe the clear.
            failing.store(true, Ordering::SeqCst);
            assert!(ledger.fetch(&ExpenseFilter::new()).is_err());
            assert!(ledger.last_error().unwrap().is_some());

            failing.store(false, Ordering::SeqCst);
            let rows = ledger.fetch(&ExpenseFilter::new()).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(ledger.last_error().unwrap(), None);
            assert!(!ledger.is_loading().unwrap());
        }

        #[test]
        fn fetch_empty_result_is_valid() {
            let (ledger, _failing) = seeded_ledger(Vec::new());
            let rows = ledger.fetch(&ExpenseFilter::new()).unwrap();
            assert!(rows.is_empty());
            assert_eq!(ledger.last_error().unwrap(), None);
        }

        #[test]
        fn fetch_failure_leaves_list_untouched() {
            let (ledger, failing) = seeded_ledger(vec![
                row("exp-1", 10.0, Category::Food, date(2024, 1, 1), 100),
                row("exp-2", 20.0, Category::Travel, date(2024, 1, 2), 200),
            ]);
            let before = ledger.fetch(&ExpenseFilter::new()).unwrap();

            failing.store(true, Ordering::SeqCst);
            let result = ledger.fetch(&ExpenseFilter::new().category(Category::Food));
            assert!(result.is_err());
            assert_eq!(ledger.expenses().unwrap(), before);
            let message = ledger.last_error().unwrap().unwrap();
            assert!(message.contains("simulated outage"));
            assert!(!ledger.is_loading().unwrap());
        }

        #[test]
        fn fetch_applies_filter_remotely() {
            let (ledger, _failing) = seeded_ledger(vec![
                row("exp-1", 1.0, Category::Food, date(2024, 1, 1), 100),
                row("exp-2", 2.0, Category::Food, date(2024, 1, 2), 200),
                row("exp-3", 3.0, Category::Food, date(2024, 1, 3), 300),
                row("exp-4", 4.0, Category::Travel, date(2024, 1, 4), 400),
                row("exp-5", 5.0, Category::Travel, date(2024, 1, 5), 500),
            ]);

            let food = ledger
                .fetch(&ExpenseFilter::new().category(Category::Food))
                .unwrap();
            assert_eq!(food.len(), 3);
            assert!(food.iter().all(|r| r.category == Category::Food));
        }

        #[test]
        fn add_grows_list_by_one_and_keeps_order() {
            let (ledger, _failing) = seeded_ledger(Vec::new());
            let _initial = ledger.fetch(&ExpenseFilter::new()).unwrap();

            let older = NewExpense::new(5.0, Category::Food, "older", date(2024, 1, 1)).unwrap();
            let newer = NewExpense::new(6.0, Category::Travel, "newer", date(2024, 6, 1)).unwrap();

            let created = ledger.add(older).unwrap();
            assert_eq!(ledger.expenses().unwrap().len(), 1);
            assert!((created.amount - 5.0).abs() < f64::EPSILON);
            assert_eq!(created.category, Category::Food);
            assert_eq!(created.description, "older");
            assert_eq!(created.date, date(2024, 1, 1));

            let _newer = ledger.add(newer).unwrap();
            let list = ledger.expenses().unwrap();
            assert_eq!(list.len(), 2);
            // The later-dated expense sorts first even though it was
            // added second.
            assert_eq!(list.first().map(|r| r.description.as_str()), Some("newer"));
        }

        #[test]
        fn add_failure_records_error_and_leaves_list() {
            let (ledger, failing) = seeded_ledger(vec![row(
                "exp-1",
                10.0,
                Category::Food,
                date(2024, 1, 1),
                100,
            )]);
            let before = ledger.fetch(&ExpenseFilter::new()).unwrap();

            failing.store(true, Ordering::SeqCst);
            let payload = NewExpense::new(1.0, Category::Other, "", date(2024, 2, 2)).unwrap();
            let result = ledger.add(payload);
            assert!(result.is_err());
            assert_eq!(ledger.expenses().unwrap(), before);
            assert!(ledger.last_error().unwrap().unwrap().contains("outage"));
        }

        #[test]
        fn update_patches_fields_and_resorts() {
            let (ledger, _failing) = seeded_ledger(vec![
                row("exp-1", 10.0, Category::Food, date(2024, 1, 1), 100),
                row("exp-2", 20.0, Category::Travel, date(2024, 3, 1), 200),
            ]);
            let _initial = ledger.fetch(&ExpenseFilter::new()).unwrap();

            // Move the older row to the newest date; it should surface
            // at the head of the list.
            let updated = ledger
                .update(
                    &ExpenseId::from("exp-1"),
                    ExpensePatch::new().amount(11.0).date(date(2024, 6, 1)),
                )
                .unwrap();

            assert!((updated.amount - 11.0).abs() < f64::EPSILON);
            assert_eq!(updated.category, Category::Food);

            let list = ledger.expenses().unwrap();
            assert_eq!(
                list.first().map(|r| r.id.clone()),
                Some(ExpenseId::from("exp-1"))
            );
        }

        #[test]
        fn update_empty_patch_fails_before_remote_call() {
            let (ledger, failing) = seeded_ledger(Vec::new());
            // Even with the backend down, validation rejects the patch
            // first.
            failing.store(true, Ordering::SeqCst);
            let result = ledger.update(&ExpenseId::from("exp-1"), ExpensePatch::new());
            assert!(matches!(result, Err(OutlayError::EmptyPatch)));
        }

        #[test]
        fn update_invalid_amount_fails_closed() {
            let (ledger, _failing) = seeded_ledger(vec![row(
                "exp-1",
                10.0,
                Category::Food,
                date(2024, 1, 1),
                100,
            )]);
            let result = ledger.update(
                &ExpenseId::from("exp-1"),
                ExpensePatch::new().amount(-4.0),
            );
            assert!(matches!(result, Err(OutlayError::InvalidAmount(_))));
        }

        #[test]
        fn delete_removes_row_by_id() {
            let (ledger, _failing) = seeded_ledger(vec![
                row("exp-1", 10.0, Category::Food, date(2024, 1, 1), 100),
                row("exp-2", 20.0, Category::Travel, date(2024, 1, 2), 200),
            ]);
            let _initial = ledger.fetch(&ExpenseFilter::new()).unwrap();

            ledger.delete(&ExpenseId::from("exp-1")).unwrap();
            let list = ledger.expenses().unwrap();
            assert_eq!(list.len(), 1);
            assert!(list.iter().all(|r| r.id != ExpenseId::from("exp-1")));
        }

        #[test]
        fn delete_failure_records_error_and_leaves_list() {
            let (ledger, failing) = seeded_ledger(vec![row(
                "exp-1",
                10.0,
                Category::Food,
                date(2024, 1, 1),
                100,
            )]);
            let before = ledger.fetch(&ExpenseFilter::new()).unwrap();

            failing.store(true, Ordering::SeqCst);
            let result = ledger.delete(&ExpenseId::from("exp-1"));
            assert!(result.is_err());
            assert_eq!(ledger.expenses().unwrap(), before);
            assert!(ledger.last_error().unwrap().is_some());
        }

        #[test]
        fn summary_matches_current_list() {
            let (ledger, _failing) = seeded_ledger(vec![
                row("exp-1", 50.0, Category::Food, date(2024, 1, 1), 100),
                row("exp-2", 30.0, Category::Travel, date(2024, 1, 2), 200),
            ]);
            let _initial = ledger.fetch(&ExpenseFilter::new()).unwrap();

            let summary = ledger.summary().unwrap();
            assert!((summary.total - 80.0).abs() < f64::EPSILON);
            assert_eq!(summary.count, 2);
            assert!((summary.by_category[&Category::Food] - 50.0).abs() < f64::EPSILON);
            assert!((summary.by_category[&Category::Travel] - 30.0).abs() < f64::EPSILON);
        }
    }

    #[cfg(feature = "async")]
    mod async_mode {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU64, Ordering};

        use tokio::sync::Notify;

        use super::*;
        use crate::ledger::ExpenseLedger;
        use crate::store::RecordStore;

        #[tokio::test]
        async fn async_round_trip() {
            let store = InMemoryStore::new(UserId::from("user-1"));
            let ledger = ExpenseLedger::new(store);

            let payload =
                NewExpense::new(3.5, Category::Food, "espresso", date(2024, 5, 5)).unwrap();
            let created = ledger.add(payload).await.unwrap();

            let rows = ledger.fetch(&ExpenseFilter::new()).await.unwrap();
            assert_eq!(rows, vec![created]);
            assert!(!ledger.is_loading().unwrap());
        }

        /// Store whose first select call blocks until released, so a
        /// test can interleave a second fetch ahead of it.
        #[derive(Debug)]
        struct GateStore {
            /// Rows returned by the gated first select call.
            first: Vec<Expense>,
            /// Rows returned by every later select call.
            rest: Vec<Expense>,
            /// Number of select calls issued so far.
            calls: AtomicU64,
            /// Signals that the first select call has started.
            started: Arc<Notify>,
            /// Gates completion of the first select call.
            release: Arc<Notify>,
        }

        impl RecordStore for GateStore {
            async fn current_user(&self) -> Result<UserId> {
                Ok(UserId::from("user-1"))
            }

            async fn select(&self, _filter: &ExpenseFilter) -> Result<Vec<Expense>> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    self.started.notify_one();
                    self.release.notified().await;
                    Ok(self.first.clone())
                } else {
                    Ok(self.rest.clone())
                }
            }

            async fn insert(&self, _expense: NewExpense, _user: UserId) -> Result<Expense> {
                Err(outage())
            }

            async fn update(&self, _id: &ExpenseId, _patch: ExpensePatch) -> Result<Expense> {
                Err(outage())
            }

            async fn delete(&self, _id: &ExpenseId) -> Result<()> {
                Err(outage())
            }
        }

        #[tokio::test]
        async fn stale_fetch_response_is_discarded() {
            let stale_row = row("exp-stale", 1.0, Category::Food, date(2024, 1, 1), 100);
            let fresh_row = row("exp-fresh", 2.0, Category::Travel, date(2024, 2, 2), 200);

            let started = Arc::new(Notify::new());
            let release = Arc::new(Notify::new());
            let store = GateStore {
                first: vec![stale_row],
                rest: vec![fresh_row.clone()],
                calls: AtomicU64::new(0),
                started: Arc::clone(&started),
                release: Arc::clone(&release),
            };
            let ledger = Arc::new(ExpenseLedger::new(store));

            let background = Arc::clone(&ledger);
            let first_fetch =
                tokio::spawn(async move { background.fetch(&ExpenseFilter::new()).await });

            // Wait until the first fetch is inside the store, then let
            // a second fetch overtake it.
            started.notified().await;
            let second = ledger.fetch(&ExpenseFilter::new()).await.unwrap();
            assert_eq!(second, vec![fresh_row.clone()]);

            release.notify_one();
            let first = first_fetch.await.unwrap().unwrap();

            // The stale response was discarded: both calls report the
            // newer list, and the working copy keeps it.
            assert_eq!(first, vec![fresh_row.clone()]);
            assert_eq!(ledger.expenses().unwrap(), vec![fresh_row]);
            assert!(!ledger.is_loading().unwrap());
        }
    }
}
