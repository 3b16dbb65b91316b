use panorama_shared::calc;
use panorama_shared::models::Panorama;
use serde::Deserialize;
use std::path::Path;

use crate::storage::Storage;

/// One entry of the seed file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanoramaSeed {
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub north_offset: f64,
}

pub struct Seed {
    pub panoramas: Vec<PanoramaSeed>,
}

impl Seed {
    pub fn load(path: &Path) -> Result<Self, String> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let panoramas: Vec<PanoramaSeed> = serde_json::from_str(&data)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;

        for p in &panoramas {
            calc::validate_north_offset(p.north_offset)
                .map_err(|e| format!("Invalid seed entry '{}': {}", p.title, e))?;
        }

        tracing::info!(panoramas = panoramas.len(), "Loaded panorama seed");
        Ok(Seed { panoramas })
    }

    /// Insert every seed entry, but only into an empty store.
    /// Returns the number of panoramas written.
    pub fn import_into(&self, storage: &Storage, now: &str) -> Result<usize, String> {
        if storage.count_panoramas()? > 0 {
            tracing::debug!("Store already populated, skipping seed import");
            return Ok(0);
        }
        for entry in &self.panoramas {
            let mut panorama = Panorama::new(entry.title.as_str(), entry.image_url.as_str(), now);
            panorama.north_offset = entry.north_offset;
            storage.save_panorama(&panorama)?;
        }
        Ok(self.panoramas.len())
    }
}
