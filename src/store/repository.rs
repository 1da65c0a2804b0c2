use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::entry::{GratitudeEntry, GratitudeItem, NewEntry};

/// Durable-store seam for gratitude entries. All operations are scoped to
/// one owning user; the `(user_id, entry_date)` pair is the uniqueness key.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Every entry owned by the user, newest date first, items attached in
    /// `sort_order`.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<GratitudeEntry>>;

    /// Insert-or-replace keyed on `(user_id, entry_date)`. An existing entry
    /// keeps its id and creation timestamp; its items are discarded and
    /// replaced by the new list. Entry row and item replacement commit
    /// together or not at all.
    async fn upsert(&self, user_id: Uuid, new: &NewEntry) -> AppResult<GratitudeEntry>;

    /// Delete the entry for the date. Succeeds when nothing exists.
    async fn delete(&self, user_id: Uuid, date: NaiveDate) -> AppResult<()>;
}

pub struct PgEntryRepository {
    pool: PgPool,
}

impl PgEntryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntryRepository for PgEntryRepository {
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<GratitudeEntry>> {
        let mut entries = sqlx::query_as::<_, GratitudeEntry>(
            r#"
            SELECT * FROM gratitude_entries
            WHERE user_id = $1
            ORDER BY entry_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if entries.is_empty() {
            return Ok(entries);
        }

        let entry_ids: Vec<Uuid> = entries.iter().map(|e| e.id).collect();
        let items = sqlx::query_as::<_, GratitudeItem>(
            r#"
            SELECT * FROM gratitude_items
            WHERE entry_id = ANY($1)
            ORDER BY entry_id, sort_order
            "#,
        )
        .bind(&entry_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_entry: HashMap<Uuid, Vec<GratitudeItem>> = HashMap::new();
        for item in items {
            by_entry.entry(item.entry_id).or_default().push(item);
        }
        for entry in &mut entries {
            if let Some(items) = by_entry.remove(&entry.id) {
                entry.items = items;
            }
        }

        Ok(entries)
    }

    async fn upsert(&self, user_id: Uuid, new: &NewEntry) -> AppResult<GratitudeEntry> {
        let mut tx = self.pool.begin().await?;

        let mut entry = sqlx::query_as::<_, GratitudeEntry>(
            r#"
            INSERT INTO gratitude_entries (id, user_id, entry_date, emotion, summary)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, entry_date) DO UPDATE SET
                emotion = EXCLUDED.emotion,
                summary = EXCLUDED.summary,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(new.entry_date)
        .bind(new.emotion)
        .bind(&new.summary)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM gratitude_items WHERE entry_id = $1")
            .bind(entry.id)
            .execute(&mut *tx)
            .await?;

        let mut items = Vec::with_capacity(new.items.len());
        for (idx, item) in new.items.iter().enumerate() {
            let row = sqlx::query_as::<_, GratitudeItem>(
                r#"
                INSERT INTO gratitude_items (id, entry_id, title, content, sort_order)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(entry.id)
            .bind(&item.title)
            .bind(&item.content)
            .bind(idx as i32)
            .fetch_one(&mut *tx)
            .await?;
            items.push(row);
        }

        tx.commit().await?;

        entry.items = items;
        Ok(entry)
    }

    async fn delete(&self, user_id: Uuid, date: NaiveDate) -> AppResult<()> {
        // Idempotent: zero rows affected is still success.
        sqlx::query("DELETE FROM gratitude_entries WHERE user_id = $1 AND entry_date = $2")
            .bind(user_id)
            .bind(date)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::error::AppError;
    use crate::models::entry::NewItem;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory repository mirroring the Postgres upsert semantics:
    /// identity preserved on replace, items rebuilt from scratch.
    #[derive(Default)]
    pub struct MemoryRepository {
        entries: Mutex<HashMap<(Uuid, NaiveDate), GratitudeEntry>>,
        fail_next: AtomicBool,
    }

    impl MemoryRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next operation fail with a store error.
        pub fn fail_next(&self) {
            self.fail_next.store(true, Ordering::SeqCst);
        }

        fn check_failure(&self) -> AppResult<()> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(AppError::Database(sqlx::Error::PoolClosed));
            }
            Ok(())
        }

        fn build_items(entry_id: Uuid, items: &[NewItem]) -> Vec<GratitudeItem> {
            items
                .iter()
                .enumerate()
                .map(|(idx, item)| GratitudeItem {
                    id: Uuid::new_v4(),
                    entry_id,
                    title: item.title.clone(),
                    content: item.content.clone(),
                    sort_order: idx as i32,
                })
                .collect()
        }
    }

    #[async_trait]
    impl EntryRepository for MemoryRepository {
        async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<GratitudeEntry>> {
            self.check_failure()?;
            let entries = self.entries.lock().unwrap();
            let mut result: Vec<GratitudeEntry> = entries
                .values()
                .filter(|e| e.user_id == user_id)
                .cloned()
                .collect();
            result.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));
            Ok(result)
        }

        async fn upsert(&self, user_id: Uuid, new: &NewEntry) -> AppResult<GratitudeEntry> {
            self.check_failure()?;
            let mut entries = self.entries.lock().unwrap();
            let key = (user_id, new.entry_date);

            let entry = match entries.get(&key) {
                Some(existing) => GratitudeEntry {
                    id: existing.id,
                    user_id,
                    entry_date: new.entry_date,
                    emotion: new.emotion,
                    summary: new.summary.clone(),
                    created_at: existing.created_at,
                    updated_at: Utc::now(),
                    items: Self::build_items(existing.id, &new.items),
                },
                None => {
                    let id = Uuid::new_v4();
                    let now = Utc::now();
                    GratitudeEntry {
                        id,
                        user_id,
                        entry_date: new.entry_date,
                        emotion: new.emotion,
                        summary: new.summary.clone(),
                        created_at: now,
                        updated_at: now,
                        items: Self::build_items(id, &new.items),
                    }
                }
            };

            entries.insert(key, entry.clone());
            Ok(entry)
        }

        async fn delete(&self, user_id: Uuid, date: NaiveDate) -> AppResult<()> {
            self.check_failure()?;
            self.entries.lock().unwrap().remove(&(user_id, date));
            Ok(())
        }
    }
}
