use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calc;

/// A 360° equirectangular image whose horizontal centre is rotated by
/// `north_offset` degrees so that viewer azimuth 0 faces true north.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panorama {
    pub id: Uuid,
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub north_offset: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl Panorama {
    /// New panorama with a fresh id and no north correction.
    pub fn new(title: impl Into<String>, image_url: impl Into<String>, now: &str) -> Self {
        Panorama {
            id: Uuid::new_v4(),
            title: title.into(),
            image_url: image_url.into(),
            north_offset: 0.0,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    /// Rotation of the sphere mesh in radians.
    pub fn sphere_rotation(&self) -> f64 {
        calc::sphere_rotation_radians(self.north_offset)
    }

    /// Bring records written by older versions back inside the invariants.
    pub fn migrate(&mut self) {
        if self.north_offset.is_finite() {
            self.north_offset = calc::normalize_degrees(self.north_offset);
        } else {
            self.north_offset = 0.0;
        }
    }
}
