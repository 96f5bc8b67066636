use crate::error::AppResult;
use crate::storage::{Collection, RecordStore};
use log::warn;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// One pretty-printed JSON array per collection under the app data directory
pub struct JsonFileStore {
    app_data_path: PathBuf,
}

impl JsonFileStore {
    pub fn open(app_data_path: impl Into<PathBuf>) -> AppResult<Self> {
        let app_data_path = app_data_path.into();
        fs::create_dir_all(&app_data_path)?;
        Ok(Self { app_data_path })
    }

    pub fn path(&self) -> &Path {
        &self.app_data_path
    }

    fn collection_path(&self, collection: Collection) -> PathBuf {
        self.app_data_path.join(format!("{}.json", collection.key()))
    }
}

impl RecordStore for JsonFileStore {
    fn read_all(&self, collection: Collection) -> Vec<Value> {
        let path = self.collection_path(collection);

        if !path.exists() {
            return Vec::new();
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(records)) => records,
            Ok(_) => {
                warn!("{} does not hold a list, treating as empty", path.display());
                Vec::new()
            }
            Err(e) => {
                warn!("{} is corrupt, treating as empty: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    fn write_all(&self, collection: Collection, records: &[Value]) -> AppResult<()> {
        let path = self.collection_path(collection);
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(records)?;

        // Rename over the target so a crash mid-write leaves the previous file intact
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn backup(&self, collection: Collection, records: &[Value]) -> AppResult<()> {
        let backup_path = self
            .app_data_path
            .join(format!("{}_backup_v1.json", collection.key()));
        if backup_path.exists() {
            return Ok(());
        }
        fs::write(&backup_path, serde_json::to_string_pretty(records)?)?;
        Ok(())
    }
}
