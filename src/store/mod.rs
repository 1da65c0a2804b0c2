//! Per-user entry store: the single source of truth for one user's
//! gratitude entries, reconciling an in-memory cache with the durable
//! repository. The cache is only mutated after the durable operation has
//! confirmed, so a failed save or delete leaves it exactly as it was.

mod registry;
mod repository;

pub use registry::StoreRegistry;
pub use repository::{EntryRepository, PgEntryRepository};

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::entry::{GratitudeEntry, NewEntry};
use crate::report::month_bounds;

pub struct EntryStore {
    user_id: Option<Uuid>,
    repo: Arc<dyn EntryRepository>,
    // Keyed by date so inserts land in order; no re-sort on write.
    cache: BTreeMap<NaiveDate, GratitudeEntry>,
    loading: bool,
    loaded: bool,
}

impl EntryStore {
    pub fn new(user_id: Option<Uuid>, repo: Arc<dyn EntryRepository>) -> Self {
        Self {
            user_id,
            repo,
            cache: BTreeMap::new(),
            loading: false,
            loaded: false,
        }
    }

    /// True while a `fetch_all` is in flight; callers use this to suppress
    /// redundant refresh triggers.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True once the cache reflects the durable store.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Replace the whole cache from the durable store, newest-first order
    /// being implicit in the date-keyed map. Without an authenticated user
    /// this clears the cache and succeeds.
    pub async fn fetch_all(&mut self) -> AppResult<()> {
        let Some(user_id) = self.user_id else {
            self.cache.clear();
            self.loaded = true;
            return Ok(());
        };

        self.loading = true;
        let result = self.repo.list_for_user(user_id).await;
        self.loading = false;

        let entries = result?;
        self.cache = entries.into_iter().map(|e| (e.entry_date, e)).collect();
        self.loaded = true;
        Ok(())
    }

    /// Atomic upsert keyed on (user, date). On success the canonical entry
    /// returned by the store replaces any cached entry for that date.
    pub async fn save(&mut self, new: NewEntry) -> AppResult<GratitudeEntry> {
        let user_id = self.user_id.ok_or(AppError::Unauthorized)?;
        let entry = self.repo.upsert(user_id, &new).await?;
        self.cache.insert(entry.entry_date, entry.clone());
        Ok(entry)
    }

    /// Delete the entry for the date. Succeeds when no entry exists; the
    /// cached copy is dropped only after the durable delete confirms.
    pub async fn remove(&mut self, date: NaiveDate) -> AppResult<()> {
        let user_id = self.user_id.ok_or(AppError::Unauthorized)?;
        self.repo.delete(user_id, date).await?;
        self.cache.remove(&date);
        Ok(())
    }

    /// Pure cache lookup; never touches the durable store.
    pub fn by_date(&self, date: NaiveDate) -> Option<&GratitudeEntry> {
        self.cache.get(&date)
    }

    /// Cached entries whose date falls within the calendar month.
    pub fn by_month(&self, year: i32, month: u32) -> Vec<&GratitudeEntry> {
        match month_bounds(year, month) {
            Some((first, last)) => self.cache.range(first..=last).map(|(_, e)| e).collect(),
            None => Vec::new(),
        }
    }

    /// All cached entries, newest date first.
    pub fn entries(&self) -> Vec<&GratitudeEntry> {
        self.cache.values().rev().collect()
    }

    /// Teardown on sign-out.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.loaded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::repository::test_support::MemoryRepository;
    use super::*;
    use crate::models::entry::{Emotion, NewItem};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn item(title: &str, content: &str) -> NewItem {
        NewItem {
            title: title.into(),
            content: content.into(),
        }
    }

    fn new_entry(d: &str, emotion: Emotion, items: Vec<NewItem>) -> NewEntry {
        NewEntry {
            entry_date: date(d),
            emotion,
            summary: String::new(),
            items,
        }
    }

    fn store_with_user() -> (EntryStore, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        let store = EntryStore::new(Some(Uuid::new_v4()), repo.clone());
        (store, repo)
    }

    #[tokio::test]
    async fn save_then_by_date_returns_saved_items() {
        let (mut store, _) = store_with_user();

        let saved = store
            .save(new_entry(
                "2024-03-05",
                Emotion::Calm,
                vec![item("self", "slept well")],
            ))
            .await
            .unwrap();

        assert_eq!(saved.items.len(), 1);
        let cached = store.by_date(date("2024-03-05")).unwrap();
        assert_eq!(cached.emotion, Emotion::Calm);
        assert_eq!(cached.items.len(), 1);
        assert_eq!(cached.items[0].content, "slept well");
        assert_eq!(cached.items[0].sort_order, 0);
    }

    #[tokio::test]
    async fn resave_replaces_entry_in_place() {
        let (mut store, _) = store_with_user();

        let first = store
            .save(new_entry(
                "2024-03-05",
                Emotion::Calm,
                vec![item("self", "slept well")],
            ))
            .await
            .unwrap();

        let second = store
            .save(new_entry(
                "2024-03-05",
                Emotion::Joy,
                vec![item("self", "went for a run"), item("others", "call from mom")],
            ))
            .await
            .unwrap();

        // Same identity, fully replaced items.
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);

        let cached = store.by_date(date("2024-03-05")).unwrap();
        assert_eq!(cached.emotion, Emotion::Joy);
        assert_eq!(cached.items.len(), 2);
        assert_eq!(cached.items[1].content, "call from mom");

        // One entry per date, never two.
        assert_eq!(store.by_month(2024, 3).len(), 1);
        assert_eq!(store.entries().len(), 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (mut store, _) = store_with_user();

        store
            .save(new_entry("2024-03-05", Emotion::Sad, vec![item("self", "x")]))
            .await
            .unwrap();

        store.remove(date("2024-03-05")).await.unwrap();
        assert!(store.by_date(date("2024-03-05")).is_none());

        // Removing a date with no entry still succeeds.
        store.remove(date("2024-03-05")).await.unwrap();
        store.remove(date("2030-01-01")).await.unwrap();
    }

    #[tokio::test]
    async fn failed_save_leaves_cache_untouched() {
        let (mut store, repo) = store_with_user();

        store
            .save(new_entry(
                "2024-03-05",
                Emotion::Calm,
                vec![item("self", "slept well")],
            ))
            .await
            .unwrap();

        repo.fail_next();
        let result = store
            .save(new_entry("2024-03-05", Emotion::Joy, vec![item("self", "y")]))
            .await;
        assert!(result.is_err());

        let cached = store.by_date(date("2024-03-05")).unwrap();
        assert_eq!(cached.emotion, Emotion::Calm);
        assert_eq!(cached.items[0].content, "slept well");
    }

    #[tokio::test]
    async fn failed_remove_leaves_cache_untouched() {
        let (mut store, repo) = store_with_user();

        store
            .save(new_entry("2024-03-05", Emotion::Calm, vec![item("self", "x")]))
            .await
            .unwrap();

        repo.fail_next();
        assert!(store.remove(date("2024-03-05")).await.is_err());
        assert!(store.by_date(date("2024-03-05")).is_some());
    }

    #[tokio::test]
    async fn fetch_all_without_user_clears_cache() {
        let repo = Arc::new(MemoryRepository::new());
        let mut store = EntryStore::new(None, repo);

        store.fetch_all().await.unwrap();
        assert!(store.is_loaded());
        assert!(store.entries().is_empty());

        // Writes require an authenticated user.
        let err = store
            .save(new_entry("2024-03-05", Emotion::Joy, vec![item("self", "x")]))
            .await;
        assert!(matches!(err, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn fetch_all_replaces_cache_newest_first() {
        let (mut store, _) = store_with_user();

        for (d, e) in [
            ("2024-03-05", Emotion::Calm),
            ("2024-03-07", Emotion::Joy),
            ("2024-02-28", Emotion::Tired),
        ] {
            store.save(new_entry(d, e, vec![item("self", "x")])).await.unwrap();
        }

        store.fetch_all().await.unwrap();
        let dates: Vec<NaiveDate> = store.entries().iter().map(|e| e.entry_date).collect();
        assert_eq!(
            dates,
            vec![date("2024-03-07"), date("2024-03-05"), date("2024-02-28")]
        );
    }

    #[tokio::test]
    async fn clear_tears_down_cache_on_sign_out() {
        let (mut store, _) = store_with_user();

        store
            .save(new_entry("2024-03-05", Emotion::Happy, vec![item("self", "x")]))
            .await
            .unwrap();
        store.fetch_all().await.unwrap();
        assert!(store.is_loaded());
        assert!(!store.is_loading());

        store.clear();
        assert!(!store.is_loaded());
        assert!(store.entries().is_empty());
    }

    #[tokio::test]
    async fn by_month_scans_calendar_bounds() {
        let (mut store, _) = store_with_user();

        for d in ["2024-02-29", "2024-03-01", "2024-03-31", "2024-04-01"] {
            store
                .save(new_entry(d, Emotion::Happy, vec![item("self", "x")]))
                .await
                .unwrap();
        }

        let march: Vec<NaiveDate> = store
            .by_month(2024, 3)
            .iter()
            .map(|e| e.entry_date)
            .collect();
        assert_eq!(march, vec![date("2024-03-01"), date("2024-03-31")]);
        assert!(store.by_month(2024, 13).is_empty());
    }
}
