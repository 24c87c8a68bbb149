//! Synchronous facade over the async client for hosts without an executor.
//!
//! Every call blocks on a process-wide multi-thread runtime created on first
//! use. Do not call these from inside an async context; use the async API there.

mod firestore;

pub use firestore::{
    BlockingCollectionReference, BlockingDocumentReference, BlockingFirestore, BlockingQuery,
};

use once_cell::sync::Lazy;
use tokio::runtime::Runtime;

use crate::error::{internal_error, FirestoreResult};

macro_rules! block_on_methods {
    ($(fn $name:ident($($arg:ident : $ty:ty),*) -> $ret:ty);* $(;)?) => {
        $(pub fn $name(&self, $($arg: $ty),*) -> $ret {
            crate::blocking::block_on(self.inner.$name($($arg),*))
        })*
    };
}

pub(crate) use block_on_methods;

static RT: Lazy<std::io::Result<Runtime>> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("firestore-blocking")
        .build()
});

pub(crate) fn block_on<F, T>(fut: F) -> FirestoreResult<T>
where
    F: std::future::Future<Output = FirestoreResult<T>>,
{
    match RT.as_ref() {
        Ok(runtime) => runtime.block_on(fut),
        Err(err) => Err(internal_error(format!(
            "Failed to start blocking runtime: {err}"
        ))),
    }
}
