use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::domain::{Location, LocationPatch, NewLocation};
use crate::errors::ServiceError;
use crate::storage::atomic_file;

/// File-backed collection of saved locations.
///
/// The whole collection is the unit of persistence: each mutation reads the
/// file, changes the list in memory and rewrites the file atomically. One
/// lock spans that read-modify-write so concurrent mutations cannot lose
/// each other's changes. Reads go straight to the file.
pub struct LocationStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LocationStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Arc<Self> {
        Arc::new(Self { path: path.into(), write_lock: Mutex::new(()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Vec<Location> {
        atomic_file::read_json_or_default(&self.path).await
    }

    // Mutations must not rewrite a file they failed to read.
    async fn load_for_update(&self) -> Result<Vec<Location>, ServiceError> {
        Ok(atomic_file::read_json_for_update(&self.path).await?)
    }

    async fn persist(&self, locations: &[Location]) -> Result<(), ServiceError> {
        atomic_file::write_json(&self.path, locations).await?;
        debug!(path = %self.path.display(), count = locations.len(), "locations persisted");
        Ok(())
    }

    /// All locations in insertion order. Missing or corrupt file reads as empty.
    pub async fn list_all(&self) -> Vec<Location> {
        self.load().await
    }

    pub async fn get_by_id(&self, id: u64) -> Option<Location> {
        self.load().await.into_iter().find(|l| l.id == id)
    }

    /// Insert a new location. A case-insensitive `city_name` clash yields
    /// `ServiceError::Conflict` and leaves the file untouched.
    pub async fn add(&self, new: NewLocation) -> Result<Location, ServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut locations = self.load_for_update().await?;

        if locations.iter().any(|l| l.same_city(&new.city_name)) {
            return Err(ServiceError::Conflict(format!("location '{}' already exists", new.city_name)));
        }

        let id = match locations.iter().map(|l| l.id).max() {
            None => 1,
            Some(max) => max.checked_add(1).ok_or_else(|| {
                ServiceError::Storage(io::Error::new(io::ErrorKind::InvalidData, "location id space exhausted"))
            })?,
        };
        let now = Utc::now();
        let location = Location {
            id,
            city_name: new.city_name,
            country_code: new.country_code,
            latitude: new.latitude,
            longitude: new.longitude,
            notes: new.notes,
            is_favorite: new.is_favorite,
            created_at: now,
            updated_at: now,
        };
        locations.push(location.clone());
        self.persist(&locations).await?;

        info!(id, city = %location.city_name, "location added");
        Ok(location)
    }

    /// Apply `patch` to the location with `id`. `Ok(None)` when it does not exist.
    pub async fn update(&self, id: u64, patch: LocationPatch) -> Result<Option<Location>, ServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut locations = self.load_for_update().await?;

        let Some(idx) = locations.iter().position(|l| l.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.city_name.as_deref() {
            if locations.iter().any(|l| l.id != id && l.same_city(name)) {
                return Err(ServiceError::Conflict(format!("location '{}' already exists", name)));
            }
        }

        let location = &mut locations[idx];
        patch.apply_to(location);
        location.updated_at = Utc::now();
        let updated = location.clone();
        self.persist(&locations).await?;

        info!(id, "location updated");
        Ok(Some(updated))
    }

    /// Remove the location with `id`; returns whether anything was removed.
    pub async fn delete(&self, id: u64) -> Result<bool, ServiceError> {
        let _guard = self.write_lock.lock().await;
        let mut locations = self.load_for_update().await?;

        let Some(idx) = locations.iter().position(|l| l.id == id) else {
            return Ok(false);
        };
        locations.remove(idx);
        self.persist(&locations).await?;

        info!(id, "location deleted");
        Ok(true)
    }

    pub async fn list_favorites(&self) -> Vec<Location> {
        self.load().await.into_iter().filter(|l| l.is_favorite).collect()
    }

    /// Case-insensitive substring match on `city_name`; empty query matches all.
    pub async fn search(&self, query: &str) -> Vec<Location> {
        let needle = query.to_lowercase();
        self.load()
            .await
            .into_iter()
            .filter(|l| l.city_name.to_lowercase().contains(&needle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_store() -> (Arc<LocationStore>, PathBuf) {
        let dir = std::env::temp_dir().join(format!("locations_{}", Uuid::new_v4()));
        (LocationStore::new(dir.join("locations.json")), dir)
    }

    fn city(name: &str) -> NewLocation {
        NewLocation { city_name: name.into(), ..Default::default() }
    }

    #[tokio::test]
    async fn add_then_get_round_trips() -> anyhow::Result<()> {
        let (store, dir) = temp_store();
        assert!(store.list_all().await.is_empty());

        let input = NewLocation {
            city_name: "London".into(),
            country_code: Some("GB".into()),
            latitude: Some(51.5074),
            longitude: Some(-0.1278),
            notes: Some("home".into()),
            is_favorite: true,
        };
        let created = store.add(input.clone()).await?;
        assert_eq!(created.id, 1);
        assert_eq!(created.created_at, created.updated_at);

        let found = store.get_by_id(created.id).await.expect("stored");
        assert_eq!(found, created);
        assert_eq!(found.city_name, input.city_name);
        assert_eq!(found.country_code, input.country_code);
        assert_eq!(found.latitude, input.latitude);
        assert_eq!(found.notes, input.notes);
        assert!(found.is_favorite);

        // a fresh handle on the same file sees the same data
        let reopened = LocationStore::new(store.path());
        assert_eq!(reopened.list_all().await, vec![created]);

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_city_is_rejected_case_insensitively() -> anyhow::Result<()> {
        let (store, dir) = temp_store();
        store.add(city("London")).await?;

        let res = store.add(city("LONDON")).await;
        assert!(matches!(res, Err(ServiceError::Conflict(_))));
        assert_eq!(store.list_all().await.len(), 1);

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn ids_follow_current_maximum() -> anyhow::Result<()> {
        let (store, dir) = temp_store();
        let a = store.add(city("Paris")).await?;
        let b = store.add(city("Berlin")).await?;
        let c = store.add(city("Madrid")).await?;
        assert!(a.id < b.id && b.id < c.id);

        // removing a middle record does not reuse its id
        assert!(store.delete(b.id).await?);
        let d = store.add(city("Lisbon")).await?;
        assert_eq!(d.id, c.id + 1);

        // removing the max record: next id is max(existing) + 1
        assert!(store.delete(d.id).await?);
        let e = store.add(city("Vienna")).await?;
        assert_eq!(e.id, c.id + 1);

        let ids: Vec<u64> = store.list_all().await.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![a.id, c.id, e.id]);

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn empty_patch_only_touches_updated_at() -> anyhow::Result<()> {
        let (store, dir) = temp_store();
        let created = store.add(NewLocation { notes: Some("n".into()), ..city("Tokyo") }).await?;

        let updated = store.update(created.id, LocationPatch::default()).await?.expect("exists");
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(Location { updated_at: created.updated_at, ..updated.clone() }, created);

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn update_applies_fields_and_guards_renames() -> anyhow::Result<()> {
        let (store, dir) = temp_store();
        let rome = store.add(city("Rome")).await?;
        store.add(city("Milan")).await?;

        let patch = LocationPatch { is_favorite: Some(true), notes: Some(Some("pasta".into())), ..Default::default() };
        let updated = store.update(rome.id, patch).await?.expect("exists");
        assert!(updated.is_favorite);
        assert_eq!(updated.notes.as_deref(), Some("pasta"));
        assert_eq!(store.get_by_id(rome.id).await, Some(updated));

        let clash = LocationPatch { city_name: Some("milan".into()), ..Default::default() };
        assert!(matches!(store.update(rome.id, clash).await, Err(ServiceError::Conflict(_))));

        // renaming to a different casing of itself is fine
        let recase = LocationPatch { city_name: Some("ROME".into()), ..Default::default() };
        assert_eq!(store.update(rome.id, recase).await?.map(|l| l.city_name), Some("ROME".into()));

        assert_eq!(store.update(999, LocationPatch::default()).await?, None);

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() -> anyhow::Result<()> {
        let (store, dir) = temp_store();
        let loc = store.add(city("Cairo")).await?;

        assert!(!store.delete(42).await?);
        assert_eq!(store.list_all().await.len(), 1);

        assert!(store.delete(loc.id).await?);
        assert!(!store.delete(loc.id).await?);
        assert!(store.list_all().await.is_empty());

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn favorites_and_search_filter_the_collection() -> anyhow::Result<()> {
        let (store, dir) = temp_store();
        store.add(NewLocation { is_favorite: true, ..city("London") }).await?;
        store.add(city("Londrina")).await?;
        store.add(city("Lyon")).await?;

        let favs: Vec<String> = store.list_favorites().await.into_iter().map(|l| l.city_name).collect();
        assert_eq!(favs, vec!["London"]);

        let hits: Vec<String> = store.search("lon").await.into_iter().map(|l| l.city_name).collect();
        assert_eq!(hits, vec!["London", "Londrina"]);
        assert_eq!(store.search("").await.len(), 3);
        assert!(store.search("zzz").await.is_empty());

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_reads_empty_and_is_replaced_on_write() -> anyhow::Result<()> {
        let (store, dir) = temp_store();
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(store.path(), b"[{\"id\": ").await?;

        assert!(store.list_all().await.is_empty());
        assert_eq!(store.get_by_id(1).await, None);

        let loc = store.add(city("Lima")).await?;
        assert_eq!(loc.id, 1);
        assert_eq!(store.list_all().await.len(), 1);

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_adds_are_not_lost() -> anyhow::Result<()> {
        let (store, dir) = temp_store();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.add(city(&format!("City{i}"))).await }));
        }
        for h in handles {
            h.await??;
        }

        let all = store.list_all().await;
        assert_eq!(all.len(), 16);
        let mut ids: Vec<u64> = all.iter().map(|l| l.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=16).collect::<Vec<u64>>());

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn write_failure_propagates() -> anyhow::Result<()> {
        let (store, dir) = temp_store();
        // a directory where the file should be fails the save
        tokio::fs::create_dir_all(store.path().join("blocker")).await?;

        let res = store.add(city("Quito")).await;
        assert!(matches!(res, Err(ServiceError::Storage(_))));

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_file_blocks_mutations() -> anyhow::Result<()> {
        let (store, dir) = temp_store();
        // a directory at the data path reads as an I/O error, not as "missing"
        tokio::fs::create_dir_all(store.path().join("kept")).await?;

        assert!(store.list_all().await.is_empty());
        assert!(matches!(store.add(city("Oslo")).await, Err(ServiceError::Storage(_))));
        assert!(matches!(store.delete(1).await, Err(ServiceError::Storage(_))));
        assert!(matches!(store.update(1, LocationPatch::default()).await, Err(ServiceError::Storage(_))));
        assert!(tokio::fs::metadata(store.path().join("kept")).await?.is_dir());

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn exhausted_id_space_is_an_error() -> anyhow::Result<()> {
        let (store, dir) = temp_store();
        let now = Utc::now();
        let last = Location {
            id: u64::MAX,
            city_name: "Edge".into(),
            country_code: None,
            latitude: None,
            longitude: None,
            notes: None,
            is_favorite: false,
            created_at: now,
            updated_at: now,
        };
        atomic_file::write_json(store.path(), &vec![last]).await?;

        assert!(matches!(store.add(city("Beyond")).await, Err(ServiceError::Storage(_))));
        assert_eq!(store.list_all().await.len(), 1);

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    async fn stray_temp_files(dir: &Path) -> anyhow::Result<usize> {
        let mut count = 0;
        let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
            return Ok(0);
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().ends_with(".tmp") {
                count += 1;
            }
        }
        Ok(count)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelled_add_leaves_no_temp_file() -> anyhow::Result<()> {
        let (store, dir) = temp_store();
        store.add(city("Seed")).await?;

        for i in 0..20 {
            let task_store = Arc::clone(&store);
            let handle = tokio::spawn(async move { task_store.add(city(&format!("Town{i}"))).await });
            // abort as soon as the save is visibly in flight, or right away
            for _ in 0..1000 {
                if handle.is_finished() || stray_temp_files(&dir).await? > 0 {
                    break;
                }
                tokio::task::yield_now().await;
            }
            handle.abort();
            let _ = handle.await;

            assert_eq!(stray_temp_files(&dir).await?, 0, "iteration {i}");
        }
        // whatever got committed is still a readable collection
        assert!(!store.list_all().await.is_empty());

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }
}
