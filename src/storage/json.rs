use std::{
    fs::{self, OpenOptions, rename, write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use serde_json::to_string_pretty;
use tracing::debug;
use uuid::Uuid;

use crate::{
    models::store::Store,
    storage::{Storage, StorageError},
};

/// Number of backups kept next to the store
const MAX_BACKUPS: usize = 5;

pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn create_backup_dir(&self) -> Result<(), StorageError> {
        let backups_dir = self.get_backup_dir();
        fs::create_dir(&backups_dir).map_err(|e| StorageError::BackupFailed {
            path: backups_dir,
            source: e,
        })?;
        Ok(())
    }

    fn create_backup(&self) -> Result<u64, StorageError> {
        let file_exists = fs::exists(&self.path).map_err(|e| StorageError::BackupFailed {
            path: self.path.clone(),
            source: e,
        })?;
        if !file_exists {
            return Ok(0);
        }

        let backup_path = self.get_backup_path();
        let copy_result = fs::copy(&self.path, &backup_path);
        match copy_result {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.create_backup_dir()?;
                self.create_backup()
            }
            Err(e) => Err(StorageError::BackupFailed {
                path: backup_path,
                source: e,
            }),
            Ok(bytes) => {
                debug!(backup = %backup_path.display(), bytes, "store backed up");
                Ok(bytes)
            }
        }
    }

    fn cleanup_old_backups(&self) -> Result<(), StorageError> {
        let backup_dir = self.get_backup_dir();
        let backup_dir_exists =
            fs::exists(&backup_dir).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
        if !backup_dir_exists {
            return Ok(());
        }

        let mut file_entries = fs::read_dir(&backup_dir)
            .map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?
            .flatten()
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .collect::<Vec<_>>();

        file_entries.sort();

        let number_of_files_to_delete = file_entries.len().saturating_sub(MAX_BACKUPS);
        if number_of_files_to_delete == 0 {
            return Ok(());
        }

        for file_path in &file_entries[0..number_of_files_to_delete] {
            fs::remove_file(file_path).map_err(|e| StorageError::CleanupFailed {
                dir: backup_dir.clone(),
                source: e,
            })?;
            debug!(backup = %file_path.display(), "old backup removed");
        }

        Ok(())
    }

    /// Swaps the written temp file in under the lock, backing up the old store
    fn replace_with(&self, temp_path: &Path) -> Result<(), StorageError> {
        let lock_file_path = self.path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file_path)
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| StorageError::SaveFailed {
                path: lock_file_path,
                source: e,
            })?;

        self.create_backup()?;
        self.cleanup_old_backups()?;

        rename(temp_path, &self.path).map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        lock_file.unlock().map_err(|e| StorageError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }

    fn get_backup_dir(&self) -> PathBuf {
        let parent_store_path = self.path.parent().unwrap_or(Path::new("."));
        parent_store_path.join("backups")
    }

    fn get_backup_path(&self) -> PathBuf {
        let backups_dir = self.get_backup_dir();

        // Zero-padded nanoseconds keep lexical order equal to creation order
        let nanos = jiff::Timestamp::now().as_nanosecond();
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("store.json"));

        backups_dir.join(format!("{}-{:020}", file_name, nanos))
    }
}

impl Storage for JsonFileStorage {
    fn load(&self) -> Result<Store, StorageError> {
        use crate::models::store::CURRENT_VERSION;
        use crate::storage::migrations::{apply_migrations, detect_version};

        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let file_version = detect_version(&self.path, &content)?;

                if file_version > CURRENT_VERSION {
                    return Err(StorageError::FutureVersion(file_version));
                }

                let mut data: serde_json::Value =
                    serde_json::from_str(&content).map_err(|e| StorageError::ParseFailed {
                        path: self.path.clone(),
                        source: e,
                    })?;

                if file_version < CURRENT_VERSION {
                    debug!(from = file_version, to = CURRENT_VERSION, "migrating store");
                    data = apply_migrations(data, file_version, CURRENT_VERSION)?;
                }

                if let Some(obj) = data.as_object_mut() {
                    obj.insert("version".to_string(), serde_json::json!(CURRENT_VERSION));
                }

                let store: Store =
                    serde_json::from_value(data).map_err(|e| StorageError::ParseFailed {
                        path: self.path.clone(),
                        source: e,
                    })?;
                debug!(path = %self.path.display(), plots = store.plots.len(), "store loaded");
                Ok(store)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no store yet, starting empty");
                Ok(Store::default())
            }
            Err(e) => Err(StorageError::LoadFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn save(&self, store: &Store) -> Result<(), StorageError> {
        let json =
            to_string_pretty(store).map_err(|e| StorageError::SerializeFailed { source: e })?;

        let unique_temp = format!("{}.tmp.{}", self.path.display(), Uuid::new_v4());
        let temp_path = PathBuf::from(&unique_temp);
        write(&temp_path, json).map_err(|e| StorageError::SaveFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        let result = self.replace_with(&temp_path);
        if result.is_err() {
            // Leave no temp file behind
            let _ = fs::remove_file(&temp_path);
        }
        result?;

        debug!(path = %self.path.display(), plots = store.plots.len(), "store saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        geometry::Coordinate,
        models::{plot::Plot, store::Store},
        storage::json::JsonFileStorage,
    };

    fn backup_count(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.metadata().map(|m| m.is_file()).unwrap_or(false))
            .count()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::default();
        store.add_plot(Plot {
            id: Uuid::new_v4(),
            name: String::from("Vineyard"),
            coordinates: vec![
                Coordinate::new(44.1, 4.1),
                Coordinate::new(44.1, 4.2),
                Coordinate::new(44.2, 4.2),
            ],
            surface_area: Some(12.5),
            ..Plot::default()
        });
        let json_file_storage = JsonFileStorage::new(dir.path().join("store.json"));

        if json_file_storage.save(&store).is_err() {
            panic!("Should correctly save the store");
        }
        match json_file_storage.load() {
            Ok(loaded_store) => {
                assert_eq!(loaded_store.plots[0].id, store.plots[0].id);
                assert_eq!(loaded_store.plots[0].coordinates, store.plots[0].coordinates);
                assert_eq!(loaded_store.plots[0].surface_area, Some(12.5));
                assert_eq!(loaded_store.next_plot_number, 2);
            }
            Err(_) => panic!("Should correctly load the saved store"),
        }
    }

    #[test]
    fn test_coordinates_persist_as_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut store = Store::default();
        store.add_plot(Plot {
            coordinates: vec![Coordinate::new(1.5, 2.5)],
            ..Plot::default()
        });

        JsonFileStorage::new(path.clone()).save(&store).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["plots"][0]["coordinates"], serde_json::json!([[1.5, 2.5]]));
        assert_eq!(raw["plots"][0]["surface_area"], serde_json::Value::Null);
    }

    #[test]
    fn test_load_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("absent.json"));

        let store = storage.load().unwrap();
        assert!(store.plots.is_empty());
        assert_eq!(store.version, crate::models::store::CURRENT_VERSION);
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid_store.json");

        fs::write(&path, "{ this is not valid json }").unwrap();

        let storage = JsonFileStorage::new(path);
        let result = storage.load();

        match result {
            Err(StorageError::ParseFailed { .. }) => {}
            _ => panic!("Expected ParseFailed error, got something else"),
        }
    }

    #[test]
    fn test_load_v1_without_version_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v1_store.json");
        let old_json = r#"{
            "plots": [
                {
                    "id": "7d3c4a36-0c7f-4d57-9a8e-3b0b9a1f2c11",
                    "name": "Old Orchard",
                    "coordinates": [[10, 10], [10, 10.001], [10.001, 10]],
                    "surface_area": 0.0062,
                    "created_at": "2024-05-01T10:00:00Z",
                    "updated_at": "2024-05-01T10:00:00Z"
                }
            ]
        }"#;

        fs::write(&path, old_json).unwrap();

        let storage = JsonFileStorage::new(path);
        let result = storage.load();

        match result {
            Ok(store) => {
                assert_eq!(store.version, crate::models::store::CURRENT_VERSION);
                assert_eq!(store.plots[0].plot_number, 1);
                assert_eq!(store.plots[0].slug, "old-orchard");
                assert_eq!(store.plots[0].surface_area, Some(0.6102));
                assert_eq!(store.next_plot_number, 2);
            }
            Err(e) => panic!("Expected successful load, got error: {:?}", e),
        }
    }

    #[test]
    fn test_load_future_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future_store.json");
        let future_json = r#"{
            "version": 999,
            "next_plot_number": 1,
            "plots": []
        }"#;

        fs::write(&path, future_json).unwrap();

        let storage = JsonFileStorage::new(path);
        let result = storage.load();

        match result {
            Err(StorageError::FutureVersion(999)) => {}
            _ => panic!("Expected FutureVersion(999) error"),
        }
    }

    #[test]
    fn test_backup_creation_and_cleanup() {
        let test_dir = tempfile::tempdir().unwrap();
        let store_path = test_dir.path().join("store.json");
        let storage = JsonFileStorage::new(store_path);

        for i in 1..=7 {
            let mut store = Store::default();
            store.next_plot_number = i;

            storage.save(&store).unwrap();

            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        let backups_dir = test_dir.path().join("backups");
        assert_eq!(
            backup_count(&backups_dir),
            MAX_BACKUPS,
            "Should keep exactly 5 backups"
        );
    }

    #[test]
    fn test_failed_save_removes_temp_file() {
        let test_dir = tempfile::tempdir().unwrap();
        let store_path = test_dir.path().join("store.json");
        fs::write(&store_path, "{}").unwrap();
        // A plain file where the backups directory should be
        fs::write(test_dir.path().join("backups"), "not a directory").unwrap();

        let storage = JsonFileStorage::new(store_path.clone());
        let result = storage.save(&Store::default());

        assert!(matches!(result, Err(StorageError::BackupFailed { .. })));
        let leftovers: Vec<_> = fs::read_dir(test_dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty(), "temp file should be removed");
        assert_eq!(fs::read_to_string(&store_path).unwrap(), "{}");
    }

    #[test]
    fn test_backup_directory_created_on_second_save() {
        let test_dir = tempfile::tempdir().unwrap();
        let store_path = test_dir.path().join("store.json");
        let storage = JsonFileStorage::new(store_path);

        let backups_dir = test_dir.path().join("backups");
        assert!(!backups_dir.exists(), "Backups dir should not exist yet");

        storage.save(&Store::default()).unwrap();

        assert!(
            !backups_dir.exists(),
            "Backups dir should not exist after first save"
        );

        let mut store2 = Store::default();
        store2.next_plot_number = 2;
        storage.save(&store2).unwrap();

        assert!(
            backups_dir.exists(),
            "Backups dir should be created on second save"
        );
        assert!(backups_dir.is_dir(), "Backups path should be a directory");
        assert_eq!(backup_count(&backups_dir), 1);
    }
}
