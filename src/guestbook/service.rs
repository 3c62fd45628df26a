use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppError, AppResult,
    db::{self, Message},
    store::RecordStore,
    validate::validate_message,
};

/// How many messages the wall shows.
pub const DEFAULT_LIMIT: u32 = 20;

#[derive(Clone)]
pub struct GuestbookService<S> {
    store: S,
}

impl<S: RecordStore> GuestbookService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The newest `limit` messages, newest first.
    pub async fn list(&self, limit: u32) -> AppResult<Vec<Message>> {
        self.store
            .list_messages(limit)
            .await
            .map_err(AppError::store("Erro ao buscar recados"))
    }

    pub async fn post(&self, input: &Value) -> AppResult<Message> {
        let draft = validate_message(input)?;

        let message = Message {
            id: Uuid::now_v7(),
            name: draft.name,
            content: draft.content,
            created_at: db::now(),
        };

        self.store
            .insert_message(&message)
            .await
            .map_err(AppError::store("Erro ao criar recado"))?;

        info!(id = %message.id, name = %message.name, "message posted");
        Ok(message)
    }
}
