//! Record store abstraction for expense rows.
//!
//! This module defines the [`RecordStore`] (async) and
//! [`BlockingRecordStore`] (blocking) traits via a shared macro,
//! mirroring the client generation pattern in [`crate::client`]. The
//! HTTP client implements these traits against the remote service;
//! [`InMemoryStore`] implements them in-process so the ledger can be
//! exercised without a network.

mod memory;

pub use memory::InMemoryStore;

/// Generates a record store trait (async or blocking) with all row
/// operations.
///
/// Uses `@methods` to define the method list once, and `@method` to
/// render each method in async (`impl Future + Send`) or blocking
/// (`fn`) style.
macro_rules! define_store {
    // ── Entry points ────────────────────────────────────────────────
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: async_mode,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_store!(@methods async_mode);
        }
    };
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: blocking,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_store!(@methods blocking);
        }
    };

    // ── Single method list (shared between both variants) ───────────
    (@methods $mode:ident) => {
        define_store!(@method $mode, current_user,
            "Returns the identity of the currently authenticated user.\n\nThe ledger calls this once per insert to stamp row ownership.\n\n# Errors\n\nReturns an error if the store cannot resolve the identity.",
            -> Result<UserId>);
        define_store!(@method $mode, select,
            "Returns all of the user's expenses matching the filter, ordered by date descending with ties broken by creation time descending.\n\nAn empty result set is valid and not an error.\n\n# Errors\n\nReturns an error if the store fails to evaluate the query.",
            filter: &ExpenseFilter, -> Result<Vec<Expense>>);
        define_store!(@method $mode, insert,
            "Creates an expense row owned by `user` and returns the full record, including the store-assigned id and timestamps.\n\n# Errors\n\nReturns an error if the store rejects the row.",
            expense: NewExpense, user: UserId, -> Result<Expense>);
        define_store!(@method $mode, update,
            "Applies a partial field set to the row with the given id and returns the full updated record.\n\nOwnership is enforced by the store; a row belonging to another user surfaces as a generic failure.\n\n# Errors\n\nReturns an error if the row is missing, not writable, or the store rejects the patch.",
            id: &ExpenseId, patch: ExpensePatch, -> Result<Expense>);
        define_store!(@method $mode, delete,
            "Deletes the row with the given id.\n\n# Errors\n\nReturns an error if the row is missing or the store rejects the delete.",
            id: &ExpenseId, -> Result<()>);
    };

    // ── Blocking method renderer ────────────────────────────────────
    (@method blocking, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*) -> $ret;
    };

    // ── Async method renderer (returns impl Future + Send) ──────────
    (@method async_mode, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*)
            -> impl core::future::Future<Output = $ret> + Send;
    };
}

#[cfg(feature = "async")]
mod async_store {
    //! Async record store trait definition.

    use crate::error::Result;
    use crate::models::{Expense, ExpenseFilter, ExpenseId, ExpensePatch, NewExpense, UserId};

    define_store! {
        trait_name: RecordStore,
        trait_doc: "Async record store holding a user's expense rows.\n\nAll methods take `&self` — implementations should use interior mutability\n(e.g. `Mutex`) for thread-safe mutation.",
        mode: async_mode,
    }
}

#[cfg(feature = "blocking")]
mod blocking_store {
    //! Blocking record store trait definition.

    use crate::error::Result;
    use crate::models::{Expense, ExpenseFilter, ExpenseId, ExpensePatch, NewExpense, UserId};

    define_store! {
        trait_name: BlockingRecordStore,
        trait_doc: "Blocking record store holding a user's expense rows.\n\nAll methods take `&self` — implementations should use interior mutability\n(e.g. `Mutex`) for thread-safe mutation.",
        mode: blocking,
    }
}

#[cfg(feature = "async")]
pub use async_store::RecordStore;
#[cfg(feature = "blocking")]
pub use blocking_store::BlockingRecordStore;
