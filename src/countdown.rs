use axum::{Router, debug_handler, extract::State, routing::get};
use serde::Serialize;
use time::OffsetDateTime;

use crate::Reply;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    /// Whole time left from `now` until `target`, zero once it has passed.
    pub fn until(target: OffsetDateTime, now: OffsetDateTime) -> Self {
        let left = (target - now).whole_seconds().max(0);

        Self {
            days: left / 86_400,
            hours: left % 86_400 / 3_600,
            minutes: left % 3_600 / 60,
            seconds: left % 60,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCountdown {
    #[serde(with = "time::serde::rfc3339")]
    pub event_at: OffsetDateTime,
    #[serde(flatten)]
    pub left: Countdown,
    pub started: bool,
}

pub fn router(event_at: OffsetDateTime) -> Router {
    Router::new()
        .route("/api/contagem", get(countdown))
        .with_state(event_at)
}

#[debug_handler]
async fn countdown(State(event_at): State<OffsetDateTime>) -> Reply<EventCountdown> {
    let now = OffsetDateTime::now_utc();

    Reply::ok(EventCountdown {
        event_at,
        left: Countdown::until(event_at, now),
        started: now >= event_at,
    })
}
