use panorama_shared::calc;
use panorama_shared::models::Panorama;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PANORAMAS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("panoramas");

pub struct Storage {
    db: Database,
    path: PathBuf,
}

fn decode(bytes: &[u8]) -> Result<Panorama, String> {
    let mut panorama: Panorama = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    panorama.migrate();
    Ok(panorama)
}

impl Storage {
    pub fn open(path: &Path) -> Result<Arc<Self>, String> {
        let db = Database::create(path)
            .map_err(|e| format!("Failed to open database at {}: {}", path.display(), e))?;

        // Ensure table exists
        let write_txn = db.begin_write().map_err(|e| e.to_string())?;
        {
            write_txn.open_table(PANORAMAS_TABLE).map_err(|e| e.to_string())?;
        }
        write_txn.commit().map_err(|e| e.to_string())?;

        tracing::debug!(path = %path.display(), "Opened panorama database");
        Ok(Arc::new(Storage {
            db,
            path: path.to_path_buf(),
        }))
    }

    pub fn save_panorama(&self, panorama: &Panorama) -> Result<(), String> {
        let json = serde_json::to_vec(panorama).map_err(|e| e.to_string())?;
        let id_str = panorama.id.to_string();

        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        {
            let mut table = write_txn
                .open_table(PANORAMAS_TABLE)
                .map_err(|e| e.to_string())?;
            table
                .insert(id_str.as_str(), json.as_slice())
                .map_err(|e| e.to_string())?;
        }
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn get_panorama(&self, id: &str) -> Result<Option<Panorama>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn
            .open_table(PANORAMAS_TABLE)
            .map_err(|e| e.to_string())?;

        match table.get(id).map_err(|e| e.to_string())? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    /// All panoramas, ordered by title and then id.
    pub fn list_panoramas(&self) -> Result<Vec<Panorama>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn
            .open_table(PANORAMAS_TABLE)
            .map_err(|e| e.to_string())?;

        let mut panoramas = Vec::new();
        for entry in table.iter().map_err(|e| e.to_string())? {
            let (_, value) = entry.map_err(|e| e.to_string())?;
            panoramas.push(decode(value.value())?);
        }
        panoramas.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(panoramas)
    }

    /// Overwrite the north offset of one panorama.
    ///
    /// The value must already be normalized; anything outside [0, 360) is
    /// rejected. Read and write happen in one transaction, and the last
    /// writer wins.
    pub fn set_north_offset(
        &self,
        id: &str,
        degrees: f64,
        updated_at: &str,
    ) -> Result<Panorama, String> {
        let degrees = calc::validate_north_offset(degrees)?;

        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        let panorama = {
            let mut table = write_txn
                .open_table(PANORAMAS_TABLE)
                .map_err(|e| e.to_string())?;
            let mut panorama = match table.get(id).map_err(|e| e.to_string())? {
                Some(value) => decode(value.value())?,
                None => return Err(format!("Panorama not found: {}", id)),
            };
            panorama.north_offset = degrees;
            panorama.updated_at = updated_at.to_string();

            let json = serde_json::to_vec(&panorama).map_err(|e| e.to_string())?;
            table
                .insert(id, json.as_slice())
                .map_err(|e| e.to_string())?;
            panorama
        };
        write_txn.commit().map_err(|e| e.to_string())?;

        tracing::info!(%id, north_offset = degrees, "Updated north offset");
        Ok(panorama)
    }

    pub fn count_panoramas(&self) -> Result<u64, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn
            .open_table(PANORAMAS_TABLE)
            .map_err(|e| e.to_string())?;
        table.len().map_err(|e| e.to_string())
    }

    pub fn db_size_bytes(&self) -> Result<u64, String> {
        std::fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|e| e.to_string())
    }

    pub fn delete_panorama(&self, id: &str) -> Result<bool, String> {
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        let removed = {
            let mut table = write_txn
                .open_table(PANORAMAS_TABLE)
                .map_err(|e| e.to_string())?;
            let result = table.remove(id).map_err(|e| e.to_string())?;
            result.is_some()
        };
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2024-05-01T12:00:00+00:00";

    fn temp_storage() -> (tempfile::TempDir, Arc<Storage>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&dir.path().join("test.redb")).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_save_and_get_panorama() {
        let (_dir, storage) = temp_storage();
        let p = Panorama::new("Harbour", "/images/harbour.jpg", NOW);
        storage.save_panorama(&p).unwrap();

        let loaded = storage.get_panorama(&p.id.to_string()).unwrap().unwrap();
        assert_eq!(loaded, p);
    }

    #[test]
    fn test_get_missing_panorama() {
        let (_dir, storage) = temp_storage();
        assert!(storage.get_panorama("nope").unwrap().is_none());
    }

    #[test]
    fn test_set_north_offset_persists() {
        let (_dir, storage) = temp_storage();
        let p = Panorama::new("Harbour", "/images/harbour.jpg", NOW);
        storage.save_panorama(&p).unwrap();
        let id = p.id.to_string();

        let updated = storage
            .set_north_offset(&id, 275.0, "2024-05-02T00:00:00+00:00")
            .unwrap();
        assert_eq!(updated.north_offset, 275.0);
        assert_eq!(updated.updated_at, "2024-05-02T00:00:00+00:00");

        let loaded = storage.get_panorama(&id).unwrap().unwrap();
        assert_eq!(loaded.north_offset, 275.0);
        assert_eq!(loaded.created_at, NOW);
    }

    #[test]
    fn test_set_north_offset_rejects_malformed_values() {
        let (_dir, storage) = temp_storage();
        let p = Panorama::new("Harbour", "/images/harbour.jpg", NOW);
        storage.save_panorama(&p).unwrap();
        let id = p.id.to_string();

        assert!(storage.set_north_offset(&id, 360.0, NOW).is_err());
        assert!(storage.set_north_offset(&id, -1.0, NOW).is_err());
        assert!(storage.set_north_offset(&id, f64::NAN, NOW).is_err());

        // Nothing was clamped into the record.
        let loaded = storage.get_panorama(&id).unwrap().unwrap();
        assert_eq!(loaded.north_offset, 0.0);
    }

    #[test]
    fn test_set_north_offset_unknown_id() {
        let (_dir, storage) = temp_storage();
        let err = storage.set_north_offset("missing", 10.0, NOW).unwrap_err();
        assert!(err.contains("not found"));
    }

    #[test]
    fn test_last_write_wins() {
        let (_dir, storage) = temp_storage();
        let p = Panorama::new("Harbour", "/images/harbour.jpg", NOW);
        storage.save_panorama(&p).unwrap();
        let id = p.id.to_string();

        storage.set_north_offset(&id, 10.0, NOW).unwrap();
        storage.set_north_offset(&id, 20.0, NOW).unwrap();
        assert_eq!(storage.get_panorama(&id).unwrap().unwrap().north_offset, 20.0);
    }

    #[test]
    fn test_list_sorted_by_title() {
        let (_dir, storage) = temp_storage();
        for title in ["Tower", "Bridge", "Market"] {
            storage
                .save_panorama(&Panorama::new(title, format!("/images/{}.jpg", title), NOW))
                .unwrap();
        }
        let titles: Vec<String> = storage
            .list_panoramas()
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["Bridge", "Market", "Tower"]);
    }

    #[test]
    fn test_count_and_delete() {
        let (_dir, storage) = temp_storage();
        let p = Panorama::new("Harbour", "/images/harbour.jpg", NOW);
        storage.save_panorama(&p).unwrap();
        assert_eq!(storage.count_panoramas().unwrap(), 1);

        assert!(storage.delete_panorama(&p.id.to_string()).unwrap());
        assert!(!storage.delete_panorama(&p.id.to_string()).unwrap());
        assert_eq!(storage.count_panoramas().unwrap(), 0);
    }

    #[test]
    fn test_db_size_is_reported() {
        let (_dir, storage) = temp_storage();
        assert!(storage.db_size_bytes().unwrap() > 0);
    }
}
