use anyhow::{Context, Result};

use super::RunStore;

/// Persisted record of a bot identity and when it last started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotRecord {
    pub name: String,
    pub last_run: String,
}

impl RunStore {
    /// Look up the run record for a bot name.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<BotRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT name, last_run FROM bots WHERE name = ?1")
            .context("Failed to prepare bot lookup")?;
        let mut rows = stmt
            .query_map(rusqlite::params![name], |row| {
                Ok(BotRecord {
                    name: row.get(0)?,
                    last_run: row.get(1)?,
                })
            })
            .context("Failed to query bot record")?;
        match rows.next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(e).context("Failed to deserialize bot record"),
            None => Ok(None),
        }
    }

    /// Create the record if absent, otherwise overwrite only `last_run`.
    pub async fn upsert_last_run(&self, name: &str, last_run: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO bots (name, last_run) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET last_run = excluded.last_run",
            rusqlite::params![name, last_run],
        )
        .context("Failed to upsert bot run record")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn count_rows(store: &RunStore) -> i64 {
        let conn = store.conn.lock().await;
        conn.query_row("SELECT count(*) FROM bots", [], |row| row.get(0))
            .unwrap()
    }

    #[tokio::test]
    async fn find_returns_none_for_an_unknown_name() {
        let store = RunStore::open_in_memory().unwrap();
        assert_eq!(store.find_by_name("norrisbot").await.unwrap(), None);
    }

    #[tokio::test]
    async fn upsert_creates_a_record() {
        let store = RunStore::open_in_memory().unwrap();
        store
            .upsert_last_run("norrisbot", "2026-08-06T10:00:00.000Z")
            .await
            .unwrap();

        let record = store.find_by_name("norrisbot").await.unwrap().unwrap();
        assert_eq!(record.name, "norrisbot");
        assert_eq!(record.last_run, "2026-08-06T10:00:00.000Z");
    }

    #[tokio::test]
    async fn upsert_overwrites_last_run_without_duplicating() {
        let store = RunStore::open_in_memory().unwrap();
        store
            .upsert_last_run("norrisbot", "2026-08-06T10:00:00.000Z")
            .await
            .unwrap();
        store
            .upsert_last_run("norrisbot", "2026-08-06T11:30:00.000Z")
            .await
            .unwrap();

        let record = store.find_by_name("norrisbot").await.unwrap().unwrap();
        assert_eq!(record.last_run, "2026-08-06T11:30:00.000Z");
        assert_eq!(count_rows(&store).await, 1);
    }

    #[tokio::test]
    async fn records_are_keyed_per_name() {
        let store = RunStore::open_in_memory().unwrap();
        store
            .upsert_last_run("norrisbot", "2026-08-06T10:00:00.000Z")
            .await
            .unwrap();
        store
            .upsert_last_run("jokebot", "2026-08-06T10:05:00.000Z")
            .await
            .unwrap();

        assert_eq!(count_rows(&store).await, 2);
        assert!(store.find_by_name("jokebot").await.unwrap().is_some());
    }
}
