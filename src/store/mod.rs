//! Persistence for guests and guestbook messages.
//!
//! Services only see the [`RecordStore`] trait. [`SqliteStore`] backs the
//! running site; [`MemoryStore`] keeps everything in process for tests.
//!
//! Guest names are unique at the store level: `insert_guest` must fail with
//! [`StoreError::Duplicate`] instead of writing a second guest with a name that
//! is already taken, however many requests race for it.

mod memory;
mod sqlite;

use std::future::Future;

use thiserror::Error;

use crate::db::{Guest, Message};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists")]
    Duplicate,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub trait RecordStore: Clone + Send + Sync + 'static {
    /// Persists a new guest.
    ///
    /// # Errors
    ///
    /// [`StoreError::Duplicate`] when a guest with the same name exists.
    fn insert_guest(&self, guest: &Guest) -> impl Future<Output = StoreResult<()>> + Send;

    /// Exact, case-sensitive lookup.
    fn find_guest_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = StoreResult<Option<Guest>>> + Send;

    /// Every guest, newest first.
    fn list_guests(&self) -> impl Future<Output = StoreResult<Vec<Guest>>> + Send;

    fn insert_message(&self, message: &Message) -> impl Future<Output = StoreResult<()>> + Send;

    /// At most `limit` messages, newest first.
    fn list_messages(&self, limit: u32) -> impl Future<Output = StoreResult<Vec<Message>>> + Send;
}
