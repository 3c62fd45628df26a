mod service;

use axum::{
    Json, Router,
    extract::{FromRef, State, rejection::JsonRejection},
    routing::get,
};
use serde_json::Value;

use crate::{
    AppResult, AppState, Reply,
    db::Guest,
    store::RecordStore,
    validate::ValidationError,
};

pub use service::{ConfirmationList, ConfirmationService, Stats};

pub fn router<S: RecordStore>() -> Router<AppState<S>> {
    Router::new().route("/api/confirmacao", get(list::<S>).post(confirm::<S>))
}

impl<S: RecordStore> FromRef<AppState<S>> for ConfirmationService<S> {
    fn from_ref(state: &AppState<S>) -> Self {
        state.confirmations.clone()
    }
}

async fn list<S: RecordStore>(
    State(confirmations): State<ConfirmationService<S>>,
) -> AppResult<Reply<ConfirmationList>> {
    Ok(Reply::ok(confirmations.list().await?))
}

async fn confirm<S: RecordStore>(
    State(confirmations): State<ConfirmationService<S>>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Reply<Guest>> {
    let Json(input) = body.map_err(|_| ValidationError::Malformed)?;

    Ok(Reply::created(confirmations.confirm(&input).await?))
}
