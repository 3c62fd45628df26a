use std::future::Future;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tracing::info;
use uuid::Uuid;

use crate::{
    db::{Guest, Message, from_millis, to_millis},
    res,
};

use super::{RecordStore, StoreError, StoreResult};

type GuestRow = (String, String, i64, Option<String>, i64);
type MessageRow = (String, String, String, i64);

#[derive(Clone)]
pub struct SqliteStore {
    db_pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Opens a pool on `url` and applies the schema.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        let store = Self::new(db_pool);
        store.migrate().await?;
        Ok(store)
    }

    /// A private in-memory database. The pool holds a single connection since
    /// every sqlite `:memory:` connection is its own database.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(res::SCHEMA).execute(&self.db_pool).await?;
        info!("schema applied");
        Ok(())
    }
}

fn parse_id(id: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(id).map_err(|e| StoreError::Corrupt(format!("id {id}: {e}")))
}

fn guest_from_row((id, name, quantity, note, created_at): GuestRow) -> StoreResult<Guest> {
    Ok(Guest {
        id: parse_id(&id)?,
        quantity: u32::try_from(quantity)
            .map_err(|_| StoreError::Corrupt(format!("guest {name} has quantity {quantity}")))?,
        name,
        note,
        created_at: from_millis(created_at),
    })
}

fn message_from_row((id, name, content, created_at): MessageRow) -> StoreResult<Message> {
    Ok(Message {
        id: parse_id(&id)?,
        name,
        content,
        created_at: from_millis(created_at),
    })
}

impl RecordStore for SqliteStore {
    fn insert_guest(&self, guest: &Guest) -> impl Future<Output = StoreResult<()>> + Send {
        let db_pool = self.db_pool.clone();
        let guest = guest.clone();

        async move {
            let result = sqlx::query(
                "INSERT INTO guests (id,name,quantity,note,created_at) VALUES (?,?,?,?,?)",
            )
            .bind(guest.id.to_string())
            .bind(&guest.name)
            .bind(i64::from(guest.quantity))
            .bind(&guest.note)
            .bind(to_millis(guest.created_at))
            .execute(&db_pool)
            .await;

            match result {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    Err(StoreError::Duplicate)
                }
                Err(e) => Err(e.into()),
            }
        }
    }

    fn find_guest_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = StoreResult<Option<Guest>>> + Send {
        let db_pool = self.db_pool.clone();
        let name = name.to_owned();

        async move {
            sqlx::query_as::<_, GuestRow>(
                "SELECT id,name,quantity,note,created_at FROM guests WHERE name=?",
            )
            .bind(&name)
            .fetch_optional(&db_pool)
            .await?
            .map(guest_from_row)
            .transpose()
        }
    }

    fn list_guests(&self) -> impl Future<Output = StoreResult<Vec<Guest>>> + Send {
        let db_pool = self.db_pool.clone();

        async move {
            sqlx::query_as::<_, GuestRow>(
                "SELECT id,name,quantity,note,created_at FROM guests ORDER BY created_at DESC, id DESC",
            )
            .fetch_all(&db_pool)
            .await?
            .into_iter()
            .map(guest_from_row)
            .collect()
        }
    }

    fn insert_message(&self, message: &Message) -> impl Future<Output = StoreResult<()>> + Send {
        let db_pool = self.db_pool.clone();
        let message = message.clone();

        async move {
            sqlx::query("INSERT INTO messages (id,name,content,created_at) VALUES (?,?,?,?)")
                .bind(message.id.to_string())
                .bind(&message.name)
                .bind(&message.content)
                .bind(to_millis(message.created_at))
                .execute(&db_pool)
                .await?;
            Ok(())
        }
    }

    fn list_messages(&self, limit: u32) -> impl Future<Output = StoreResult<Vec<Message>>> + Send {
        let db_pool = self.db_pool.clone();

        async move {
            sqlx::query_as::<_, MessageRow>(
                "SELECT id,name,content,created_at FROM messages ORDER BY created_at DESC, id DESC LIMIT ?",
            )
            .bind(i64::from(limit))
            .fetch_all(&db_pool)
            .await?
            .into_iter()
            .map(message_from_row)
            .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::now;

    fn guest(name: &str, quantity: u32) -> Guest {
        Guest {
            id: Uuid::now_v7(),
            name: name.to_owned(),
            quantity,
            note: None,
            created_at: now(),
        }
    }

    #[tokio::test]
    async fn unique_index_rejects_second_guest_with_same_name() {
        let store = SqliteStore::in_memory().await.unwrap();

        store.insert_guest(&guest("Ana", 2)).await.unwrap();
        let err = store.insert_guest(&guest("Ana", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate), "{err:?}");

        store.insert_guest(&guest("ana", 1)).await.unwrap();
        assert_eq!(store.list_guests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn guests_round_trip_through_rows() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut stored = guest("Tia Ana", 4);
        stored.note = Some("chego cedo".to_owned());

        store.insert_guest(&stored).await.unwrap();

        assert_eq!(store.find_guest_by_name("Tia Ana").await.unwrap(), Some(stored.clone()));
        assert_eq!(store.find_guest_by_name("Tia").await.unwrap(), None);
        assert_eq!(store.list_guests().await.unwrap(), vec![stored]);
    }

    #[tokio::test]
    async fn messages_are_listed_newest_first_up_to_limit() {
        let store = SqliteStore::in_memory().await.unwrap();
        let base = now();

        for i in 0..5 {
            let message = Message {
                id: Uuid::now_v7(),
                name: format!("visitante {i}"),
                content: "oi".to_owned(),
                created_at: base + time::Duration::seconds(i),
            };
            store.insert_message(&message).await.unwrap();
        }

        let listed = store.list_messages(3).await.unwrap();
        let names: Vec<_> = listed.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["visitante 4", "visitante 3", "visitante 2"]);
    }

    #[tokio::test]
    async fn migrate_is_repeatable() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.migrate().await.unwrap();
    }
}
