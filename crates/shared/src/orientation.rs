//! Camera orientation of a panorama viewer.
//!
//! The camera sits at the centre of the image sphere and never orbits.
//! Azimuth is measured clockwise from the viewer's internal zero, polar
//! from the horizon.

use serde::{Deserialize, Serialize};

use crate::calc::normalize_degrees;

/// Degrees of rotation per pixel of pointer movement.
pub const DRAG_SENSITIVITY: f64 = 0.1;

/// Distance kept from the poles so the camera never flips.
pub const POLAR_MARGIN: f64 = 1.0;
pub const MAX_POLAR: f64 = 90.0 - POLAR_MARGIN;
pub const MIN_POLAR: f64 = -MAX_POLAR;

// Field of view bounds, in degrees
pub const MIN_FOV: f64 = 30.0;
pub const MAX_FOV: f64 = 90.0;
pub const DEFAULT_FOV: f64 = 75.0;
pub const ZOOM_STEP: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraOrientation {
    pub azimuth: f64,
    pub polar: f64,
    pub fov: f64,
}

impl Default for CameraOrientation {
    fn default() -> Self {
        CameraOrientation {
            azimuth: 0.0,
            polar: 0.0,
            fov: DEFAULT_FOV,
        }
    }
}

impl CameraOrientation {
    /// Build an orientation from arbitrary values, wrapping azimuth and
    /// clamping polar and fov. Non-finite components fall back to defaults.
    pub fn normalized(azimuth: f64, polar: f64, fov: f64) -> Self {
        let d = CameraOrientation::default();
        CameraOrientation {
            azimuth: if azimuth.is_finite() {
                normalize_degrees(azimuth)
            } else {
                d.azimuth
            },
            polar: if polar.is_finite() {
                polar.clamp(MIN_POLAR, MAX_POLAR)
            } else {
                d.polar
            },
            fov: if fov.is_finite() {
                fov.clamp(MIN_FOV, MAX_FOV)
            } else {
                d.fov
            },
        }
    }

    /// Apply a pointer drag of `dx`, `dy` pixels.
    ///
    /// Deltas are subtracted so the image follows the pointer. Polar is
    /// clamped before azimuth is wrapped; the order is fixed so replays of
    /// the same deltas land on the same state.
    pub fn rotate(&mut self, dx: f64, dy: f64) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.polar = (self.polar - dy * DRAG_SENSITIVITY).clamp(MIN_POLAR, MAX_POLAR);
        self.azimuth = normalize_degrees(self.azimuth - dx * DRAG_SENSITIVITY);
    }

    /// Apply a sequence of drags in order.
    pub fn rotate_all(&mut self, deltas: &[(f64, f64)]) {
        for &(dx, dy) in deltas {
            self.rotate(dx, dy);
        }
    }

    /// Step the field of view by one `ZOOM_STEP` in the direction of `scroll`.
    /// The magnitude of `scroll` is ignored.
    pub fn zoom(&mut self, scroll: f64) {
        if scroll == 0.0 || !scroll.is_finite() {
            return;
        }
        self.fov = (self.fov + scroll.signum() * ZOOM_STEP).clamp(MIN_FOV, MAX_FOV);
    }

    /// Heading presented to the viewer, in [0, 360).
    pub fn current_heading(&self) -> f64 {
        normalize_degrees(self.azimuth)
    }

    /// Look straight at the image centre on the horizon. Zoom is kept.
    pub fn reset(&mut self) {
        self.azimuth = 0.0;
        self.polar = 0.0;
    }

    pub fn is_home(&self) -> bool {
        self.azimuth == 0.0 && self.polar == 0.0
    }
}
