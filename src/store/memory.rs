use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::db::{Guest, Message};

use super::{RecordStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    guests: Vec<Guest>,
    messages: Vec<Message>,
}

/// Keeps records in process. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

fn newest_first<T>(records: &[T], created: impl Fn(&T) -> (i128, uuid::Uuid)) -> Vec<&T> {
    let mut sorted: Vec<&T> = records.iter().collect();
    sorted.sort_by_key(|r| std::cmp::Reverse(created(r)));
    sorted
}

impl RecordStore for MemoryStore {
    fn insert_guest(&self, guest: &Guest) -> impl Future<Output = StoreResult<()>> + Send {
        // name check and push happen under one guard
        let result = self.lock().and_then(|mut tables| {
            if tables.guests.iter().any(|g| g.name == guest.name) {
                return Err(StoreError::Duplicate);
            }
            tables.guests.push(guest.clone());
            Ok(())
        });

        async move { result }
    }

    fn find_guest_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = StoreResult<Option<Guest>>> + Send {
        let result = self
            .lock()
            .map(|tables| tables.guests.iter().find(|g| g.name == name).cloned());

        async move { result }
    }

    fn list_guests(&self) -> impl Future<Output = StoreResult<Vec<Guest>>> + Send {
        let result = self.lock().map(|tables| {
            newest_first(&tables.guests, |g| (g.created_at.unix_timestamp_nanos(), g.id))
                .into_iter()
                .cloned()
                .collect()
        });

        async move { result }
    }

    fn insert_message(&self, message: &Message) -> impl Future<Output = StoreResult<()>> + Send {
        let result = self.lock().map(|mut tables| tables.messages.push(message.clone()));

        async move { result }
    }

    fn list_messages(&self, limit: u32) -> impl Future<Output = StoreResult<Vec<Message>>> + Send {
        let result = self.lock().map(|tables| {
            newest_first(&tables.messages, |m| (m.created_at.unix_timestamp_nanos(), m.id))
                .into_iter()
                .take(limit as usize)
                .cloned()
                .collect()
        });

        async move { result }
    }
}
