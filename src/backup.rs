// src/backup.rs
//! Offline copies of entity snapshots.
//!
//! A backup directory holds one `<undashed id>.json` file per entity with the
//! raw API payload. Loading re-parses that payload through the same
//! deserializers used for live responses; the typed attributes are never
//! written to disk.

use crate::core::{Entity, EntityKind, IdentityMap, Snapshot};
use crate::error::AppError;
use crate::types::NotionId;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct BackupDir {
    root: PathBuf,
}

impl BackupDir {
    /// Opens `root`, creating it when missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: NotionId) -> PathBuf {
        self.root.join(format!("{}.json", id.to_undashed()))
    }

    /// Writes the snapshot's raw payload, replacing any earlier copy.
    pub fn save<K: EntityKind>(&self, snapshot: &Snapshot<K>) -> Result<PathBuf, AppError> {
        let path = self.path_for(snapshot.id());
        let text = serde_json::to_string_pretty(snapshot.raw()).map_err(|source| {
            AppError::JsonParseError {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, text)?;
        log::debug!("saved {} {} to {}", K::OBJECT, snapshot.id(), path.display());
        Ok(path)
    }

    pub fn load<K: EntityKind>(&self, id: NotionId) -> Result<Snapshot<K>, AppError> {
        let path = self.path_for(id);
        let text = fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|source| AppError::JsonParseError { path, source })?;
        Ok(Snapshot::from_json(&value)?)
    }

    /// Loads a backup into the entity's preview slot.
    ///
    /// The next snapshot fetched for the entity is coalesced with it.
    pub fn restore_preview<K: EntityKind>(
        &self,
        identities: &IdentityMap,
        id: NotionId,
    ) -> Result<Arc<Entity<K>>, AppError> {
        let snapshot = self.load::<K>(id)?;
        let entity = identities.entity::<K>(id);
        entity.set_preview(Arc::new(snapshot));
        Ok(entity)
    }

    /// Ids with a backup file, sorted.
    pub fn list(&self) -> Result<Vec<NotionId>, AppError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match NotionId::parse(stem) {
                Ok(id) => ids.push(id),
                Err(_) => log::debug!("skipping {} in backup directory", path.display()),
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const ID: &str = "8c4ed1a0-8a32-4b7e-9d1c-3b5a6f0e2d11";

    fn scratch() -> BackupDir {
        let root = std::env::temp_dir().join(format!("notion-df-backup-{}", uuid::Uuid::new_v4()));
        BackupDir::open(root).unwrap()
    }

    fn page() -> Snapshot<PageKind> {
        Snapshot::from_json(&json!({
            "object": "page",
            "id": ID,
            "archived": false,
            "url": "https://www.notion.so/8c4ed1a08a324b7e9d1c3b5a6f0e2d11",
            "properties": {}
        }))
        .unwrap()
    }

    #[test]
    fn test_save_then_load() {
        let backup = scratch();
        let path = backup.save(&page()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "8c4ed1a08a324b7e9d1c3b5a6f0e2d11.json"
        );
        let loaded = backup.load::<PageKind>(NotionId::parse(ID).unwrap()).unwrap();
        assert_eq!(loaded.raw(), page().raw());
        assert_eq!(loaded.attrs(), page().attrs());
        assert_eq!(backup.list().unwrap(), vec![NotionId::parse(ID).unwrap()]);
        fs::remove_dir_all(backup.root()).unwrap();
    }

    #[test]
    fn test_restore_fills_preview_only() {
        let backup = scratch();
        backup.save(&page()).unwrap();
        let identities = IdentityMap::new();
        let entity = backup
            .restore_preview::<PageKind>(&identities, NotionId::parse(ID).unwrap())
            .unwrap();
        assert!(entity.latest().is_none());
        assert_eq!(entity.preview().unwrap().attrs().archived, Some(false));
        fs::remove_dir_all(backup.root()).unwrap();
    }

    #[test]
    fn test_corrupt_file_names_the_path() {
        let backup = scratch();
        let id = NotionId::parse(ID).unwrap();
        fs::write(backup.path_for(id), "{not json").unwrap();
        let err = backup.load::<PageKind>(id).unwrap_err();
        assert!(matches!(err, AppError::JsonParseError { ref path, .. } if *path == backup.path_for(id)));
        fs::remove_dir_all(backup.root()).unwrap();
    }
}
