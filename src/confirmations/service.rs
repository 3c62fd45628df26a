use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    AppError, AppResult,
    db::{self, Guest},
    store::{RecordStore, StoreError},
    validate::validate_confirmation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_guests: u64,
    pub total_people: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationList {
    pub guests: Vec<Guest>,
    pub stats: Stats,
}

#[derive(Clone)]
pub struct ConfirmationService<S> {
    store: S,
}

impl<S: RecordStore> ConfirmationService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> AppResult<ConfirmationList> {
        let guests = self
            .store
            .list_guests()
            .await
            .map_err(AppError::store("Erro ao buscar confirmações"))?;

        let stats = Stats {
            total_guests: guests.len() as u64,
            total_people: guests.iter().map(|g| u64::from(g.quantity)).sum(),
        };

        Ok(ConfirmationList { guests, stats })
    }

    /// Validates `input` and stores a new guest.
    ///
    /// The name lookup only saves a write for the common repeat submission;
    /// the store's unique name constraint decides concurrent ones.
    pub async fn confirm(&self, input: &Value) -> AppResult<Guest> {
        let draft = validate_confirmation(input)?;

        let existing = self
            .store
            .find_guest_by_name(&draft.name)
            .await
            .map_err(AppError::store("Erro ao confirmar presença"))?;
        if existing.is_some() {
            info!(name = %draft.name, "name already confirmed");
            return Err(AppError::Conflict);
        }

        let guest = Guest {
            id: Uuid::now_v7(),
            name: draft.name,
            quantity: draft.quantity,
            note: draft.note,
            created_at: db::now(),
        };

        match self.store.insert_guest(&guest).await {
            Ok(()) => {
                info!(id = %guest.id, name = %guest.name, quantity = guest.quantity, "presence confirmed");
                Ok(guest)
            }
            Err(StoreError::Duplicate) => {
                warn!(name = %guest.name, "lost confirmation race on name");
                Err(AppError::Conflict)
            }
            Err(e) => Err(AppError::store("Erro ao confirmar presença")(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use serde_json::json;

    use super::*;
    use crate::{
        db::Message,
        store::{MemoryStore, SqliteStore, StoreResult},
        validate::ValidationError,
    };

    /// Never finds an existing guest, like a request that checked just before
    /// a concurrent one inserted.
    #[derive(Clone, Default)]
    struct StaleLookup(MemoryStore);

    impl RecordStore for StaleLookup {
        fn insert_guest(&self, guest: &Guest) -> impl Future<Output = StoreResult<()>> + Send {
            self.0.insert_guest(guest)
        }

        fn find_guest_by_name(
            &self,
            _name: &str,
        ) -> impl Future<Output = StoreResult<Option<Guest>>> + Send {
            async { StoreResult::Ok(None) }
        }

        fn list_guests(&self) -> impl Future<Output = StoreResult<Vec<Guest>>> + Send {
            self.0.list_guests()
        }

        fn insert_message(&self, message: &Message) -> impl Future<Output = StoreResult<()>> + Send {
            self.0.insert_message(message)
        }

        fn list_messages(&self, limit: u32) -> impl Future<Output = StoreResult<Vec<Message>>> + Send {
            self.0.list_messages(limit)
        }
    }

    #[derive(Clone)]
    struct Offline;

    fn offline<T>() -> StoreResult<T> {
        Err(StoreError::Unavailable("connection refused".to_owned()))
    }

    impl RecordStore for Offline {
        fn insert_guest(&self, _: &Guest) -> impl Future<Output = StoreResult<()>> + Send {
            async { offline::<()>() }
        }

        fn find_guest_by_name(&self, _: &str) -> impl Future<Output = StoreResult<Option<Guest>>> + Send {
            async { offline::<Option<Guest>>() }
        }

        fn list_guests(&self) -> impl Future<Output = StoreResult<Vec<Guest>>> + Send {
            async { offline::<Vec<Guest>>() }
        }

        fn insert_message(&self, _: &Message) -> impl Future<Output = StoreResult<()>> + Send {
            async { offline::<()>() }
        }

        fn list_messages(&self, _: u32) -> impl Future<Output = StoreResult<Vec<Message>>> + Send {
            async { offline::<Vec<Message>>() }
        }
    }

    #[tokio::test]
    async fn confirm_stores_guest_with_default_quantity() {
        let service = ConfirmationService::new(MemoryStore::new());

        let guest = service.confirm(&json!({ "name": "Ana" })).await.unwrap();
        assert_eq!(guest.name, "Ana");
        assert_eq!(guest.quantity, 1);
        assert_eq!(guest.note, None);

        let listed = service.list().await.unwrap();
        assert_eq!(listed.guests, vec![guest]);
    }

    #[tokio::test]
    async fn second_confirmation_with_same_name_conflicts() {
        let service = ConfirmationService::new(MemoryStore::new());

        let first = service.confirm(&json!({ "name": "Ana", "quantity": 2 })).await.unwrap();
        assert_eq!(first.quantity, 2);

        let err = service
            .confirm(&json!({ "name": "Ana", "quantity": 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict), "{err:?}");

        let listed = service.list().await.unwrap();
        assert_eq!(listed.stats, Stats { total_guests: 1, total_people: 2 });
        assert_eq!(listed.guests[0].quantity, 2);
    }

    #[tokio::test]
    async fn store_duplicate_is_a_conflict_even_when_lookup_misses() {
        let service = ConfirmationService::new(StaleLookup::default());

        service.confirm(&json!({ "name": "Ana" })).await.unwrap();
        let err = service.confirm(&json!({ "name": "Ana" })).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict), "{err:?}");
        assert_eq!(service.list().await.unwrap().stats.total_guests, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_confirmations_with_same_name_store_one_guest() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("convite.db").display());
        let service = ConfirmationService::new(SqliteStore::connect(&url, 4).await.unwrap());

        for round in 0..8 {
            let input = json!({ "name": format!("Ana {round}"), "quantity": 2 });
            let (a, b) = tokio::join!(service.confirm(&input), service.confirm(&input));

            let results = [a, b];
            let stored = results.iter().filter(|r| r.is_ok()).count();
            let conflicts = results
                .iter()
                .filter(|r| matches!(r, Err(AppError::Conflict)))
                .count();
            assert_eq!((stored, conflicts), (1, 1), "round {round}: {results:?}");
        }

        let listed = service.list().await.unwrap();
        assert_eq!(listed.stats, Stats { total_guests: 8, total_people: 16 });
    }

    #[tokio::test]
    async fn invalid_input_persists_nothing() {
        let service = ConfirmationService::new(MemoryStore::new());

        for (input, expected) in [
            (json!({ "name": "" }), ValidationError::NameRequired),
            (json!({ "name": "x".repeat(101) }), ValidationError::NameTooLong),
            (json!({ "name": "Ana", "quantity": 0 }), ValidationError::QuantityTooLow),
            (json!({ "name": "Ana", "quantity": 11 }), ValidationError::QuantityTooHigh),
        ] {
            let err = service.confirm(&input).await.unwrap_err();
            assert!(matches!(err, AppError::Invalid(e) if e == expected), "{input}");
        }

        assert_eq!(service.list().await.unwrap().stats.total_guests, 0);
    }

    #[tokio::test]
    async fn stats_sum_quantities_and_guests_are_newest_first() {
        let service = ConfirmationService::new(MemoryStore::new());

        for (name, quantity) in [("Ana", 2), ("Bia", 5), ("Caio", 1)] {
            service
                .confirm(&json!({ "name": name, "quantity": quantity }))
                .await
                .unwrap();
        }

        let listed = service.list().await.unwrap();
        assert_eq!(listed.stats, Stats { total_guests: 3, total_people: 8 });

        let names: Vec<_> = listed.guests.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["Caio", "Bia", "Ana"]);
    }

    #[tokio::test]
    async fn store_failures_carry_a_generic_message() {
        let service = ConfirmationService::new(Offline);

        let err = service.list().await.unwrap_err();
        assert_eq!(err.to_string(), "Erro ao buscar confirmações");

        let err = service.confirm(&json!({ "name": "Ana" })).await.unwrap_err();
        assert_eq!(err.to_string(), "Erro ao confirmar presença");
        assert!(matches!(err, AppError::Store { .. }));
    }
}
