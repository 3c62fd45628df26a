mod service;

use axum::{
    Json, Router,
    extract::{FromRef, State, rejection::JsonRejection},
    routing::get,
};
use serde_json::Value;

use crate::{
    AppResult, AppState, Reply,
    db::Message,
    store::RecordStore,
    validate::ValidationError,
};

pub use service::{DEFAULT_LIMIT, GuestbookService};

pub fn router<S: RecordStore>() -> Router<AppState<S>> {
    Router::new().route("/api/recados", get(list::<S>).post(post::<S>))
}

impl<S: RecordStore> FromRef<AppState<S>> for GuestbookService<S> {
    fn from_ref(state: &AppState<S>) -> Self {
        state.guestbook.clone()
    }
}

async fn list<S: RecordStore>(
    State(guestbook): State<GuestbookService<S>>,
) -> AppResult<Reply<Vec<Message>>> {
    Ok(Reply::ok(guestbook.list(DEFAULT_LIMIT).await?))
}

async fn post<S: RecordStore>(
    State(guestbook): State<GuestbookService<S>>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Reply<Message>> {
    let Json(input) = body.map_err(|_| ValidationError::Malformed)?;

    Ok(Reply::created(guestbook.post(&input).await?))
}
