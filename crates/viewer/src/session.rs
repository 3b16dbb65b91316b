use panorama_shared::calc;
use panorama_shared::models::Panorama;
use panorama_shared::orientation::CameraOrientation;
use uuid::Uuid;

use crate::error::CalibrationError;
use crate::notify::{NotificationLevel, NotificationSink};

/// Persistent home of panoramas and their north offsets.
#[allow(async_fn_in_trait)]
pub trait PanoramaStore {
    async fn get(&self, id: &str) -> Result<Option<Panorama>, String>;

    /// `degrees` is already normalized by the caller. Implementations fail on
    /// malformed values instead of clamping them.
    async fn set_north_offset(&self, id: &str, degrees: f64) -> Result<(), String>;
}

impl<T: PanoramaStore + ?Sized> PanoramaStore for &T {
    async fn get(&self, id: &str) -> Result<Option<Panorama>, String> {
        (**self).get(id).await
    }

    async fn set_north_offset(&self, id: &str, degrees: f64) -> Result<(), String> {
        (**self).set_north_offset(id, degrees).await
    }
}

/// Scene that displays the panorama sphere. Texture loading and frame
/// cadence are the implementation's business.
pub trait Renderer {
    /// Load `image_url` onto the sphere, rotated once by `rotation_degrees`
    /// about the vertical axis.
    fn load_sphere(&mut self, image_url: &str, rotation_degrees: f64) -> Result<(), String>;
    fn set_camera_orientation(&mut self, orientation: &CameraOrientation);
    fn camera_orientation(&self) -> CameraOrientation;
}

/// Raw pointer input in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up,
    Wheel { delta: f64 },
}

/// A north offset computed by [`ViewerSession::begin_commit`] that has not
/// been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommit {
    panorama_id: Uuid,
    heading: f64,
    north_offset: f64,
}

impl PendingCommit {
    pub fn panorama_id(&self) -> Uuid {
        self.panorama_id
    }

    /// Camera heading captured when the commit started.
    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// Offset to persist.
    pub fn north_offset(&self) -> f64 {
        self.north_offset
    }
}

/// One panorama viewer: the loaded panorama, its live camera orientation
/// and the collaborators it talks to.
///
/// Dragging and idling are the same state with and without a pressed
/// pointer. The only transition with side effects is the north commit,
/// of which at most one is in flight at a time.
pub struct ViewerSession<S, R, N> {
    store: S,
    renderer: R,
    notifier: N,
    panorama: Option<Panorama>,
    orientation: CameraOrientation,
    last_pointer: Option<(f64, f64)>,
    commit_in_flight: bool,
}

impl<S, R, N> ViewerSession<S, R, N>
where
    S: PanoramaStore,
    R: Renderer,
    N: NotificationSink,
{
    pub fn new(store: S, renderer: R, notifier: N) -> Self {
        ViewerSession {
            store,
            renderer,
            notifier,
            panorama: None,
            orientation: CameraOrientation::default(),
            last_pointer: None,
            commit_in_flight: false,
        }
    }

    pub fn panorama(&self) -> Option<&Panorama> {
        self.panorama.as_ref()
    }

    pub fn orientation(&self) -> CameraOrientation {
        self.orientation
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn is_dragging(&self) -> bool {
        self.last_pointer.is_some()
    }

    /// True while a north commit awaits the store. The "set north" control
    /// should stay disabled meanwhile.
    pub fn is_commit_in_flight(&self) -> bool {
        self.commit_in_flight
    }

    fn fail(&self, err: CalibrationError) -> CalibrationError {
        self.notifier.notify(&err.to_string(), NotificationLevel::Error);
        err
    }

    /// Fetch a panorama from the store and display it.
    pub async fn load(&mut self, id: &str) -> Result<(), CalibrationError> {
        let uuid = Uuid::parse_str(id.trim())
            .map_err(|_| self.fail(CalibrationError::InvalidPanoramaId(id.to_string())))?;

        let panorama = match self.store.get(&uuid.to_string()).await {
            Ok(Some(p)) => p,
            Ok(None) => return Err(self.fail(CalibrationError::PanoramaNotFound(id.to_string()))),
            Err(message) => return Err(self.fail(CalibrationError::Store(message))),
        };
        self.show(panorama)
    }

    /// Display `panorama` with a fresh camera. The sphere is rotated by the
    /// stored north offset here and nowhere else.
    pub fn show(&mut self, mut panorama: Panorama) -> Result<(), CalibrationError> {
        panorama.migrate();
        let north_offset = panorama.north_offset;

        self.orientation = CameraOrientation::default();
        self.last_pointer = None;
        let loaded = self.renderer.load_sphere(&panorama.image_url, north_offset);
        self.renderer.set_camera_orientation(&self.orientation);

        tracing::debug!(id = %panorama.id, north_offset, "Showing panorama");
        self.panorama = Some(panorama);

        loaded.map_err(|message| {
            self.fail(CalibrationError::Render {
                north_offset,
                message,
            })
        })
    }

    /// Turn the camera by a pointer drag of `dx`, `dy` pixels.
    pub fn rotate(&mut self, dx: f64, dy: f64) {
        self.orientation.rotate(dx, dy);
        self.renderer.set_camera_orientation(&self.orientation);
    }

    pub fn zoom(&mut self, scroll: f64) {
        self.orientation.zoom(scroll);
        self.renderer.set_camera_orientation(&self.orientation);
    }

    /// Apply one pointer event. Returns whether the camera orientation changed.
    pub fn handle(&mut self, event: PointerEvent) -> bool {
        let before = self.orientation;
        match event {
            PointerEvent::Down { x, y } => {
                if x.is_finite() && y.is_finite() {
                    self.last_pointer = Some((x, y));
                }
                false
            }
            PointerEvent::Move { x, y } => {
                let Some((last_x, last_y)) = self.last_pointer else {
                    return false;
                };
                if !x.is_finite() || !y.is_finite() {
                    return false;
                }
                self.last_pointer = Some((x, y));
                self.rotate(x - last_x, y - last_y);
                self.orientation != before
            }
            PointerEvent::Up => {
                self.last_pointer = None;
                false
            }
            PointerEvent::Wheel { delta } => {
                self.zoom(delta);
                self.orientation != before
            }
        }
    }

    /// Adopt the renderer's camera, for renderers that move it themselves.
    pub fn sync_from_renderer(&mut self) {
        let o = self.renderer.camera_orientation();
        self.orientation = CameraOrientation::normalized(o.azimuth, o.polar, o.fov);
    }

    pub fn current_heading(&self) -> f64 {
        self.orientation.current_heading()
    }

    pub fn heading_label(&self) -> String {
        format!("Current rotation: {}", calc::format_heading(self.current_heading()))
    }

    /// Capture the current heading as a north correction and mark a commit
    /// as in flight.
    pub fn begin_commit(&mut self) -> Result<PendingCommit, CalibrationError> {
        if self.commit_in_flight {
            return Err(self.fail(CalibrationError::CommitInProgress));
        }
        let Some(panorama) = self.panorama.as_ref() else {
            return Err(self.fail(CalibrationError::NoPanoramaLoaded));
        };
        if panorama.id.is_nil() {
            let id = panorama.id.to_string();
            return Err(self.fail(CalibrationError::InvalidPanoramaId(id)));
        }

        let heading = self.current_heading();
        let pending = PendingCommit {
            panorama_id: panorama.id,
            heading,
            north_offset: calc::north_offset_after_commit(panorama.north_offset, heading),
        };
        self.commit_in_flight = true;
        Ok(pending)
    }

    /// Apply the store's answer to a pending commit.
    ///
    /// On failure nothing but the in-flight flag changes. On success the
    /// camera returns home and the sphere is reloaded with the new offset.
    /// If that reload fails the offset still counts as committed.
    pub fn finish_commit(
        &mut self,
        pending: PendingCommit,
        outcome: Result<(), String>,
    ) -> Result<f64, CalibrationError> {
        self.commit_in_flight = false;

        if let Err(message) = outcome {
            tracing::warn!(id = %pending.panorama_id, %message, "North offset not saved");
            return Err(self.fail(CalibrationError::Store(message)));
        }

        let north_offset = pending.north_offset;
        let saved = format!("North direction saved ({})", calc::format_heading(north_offset));

        let image_url = match self.panorama.as_mut() {
            Some(p) if p.id == pending.panorama_id => {
                p.north_offset = north_offset;
                p.image_url.clone()
            }
            // The operator moved on to another panorama while saving.
            _ => {
                self.notifier.notify(&saved, NotificationLevel::Success);
                return Ok(north_offset);
            }
        };

        self.orientation.reset();
        self.last_pointer = None;
        self.renderer.set_camera_orientation(&self.orientation);

        if let Err(message) = self.renderer.load_sphere(&image_url, north_offset) {
            return Err(self.fail(CalibrationError::Render {
                north_offset,
                message,
            }));
        }

        tracing::info!(id = %pending.panorama_id, north_offset, "North offset committed");
        self.notifier.notify(&saved, NotificationLevel::Success);
        Ok(north_offset)
    }

    /// Persist the current heading as the panorama's north.
    ///
    /// No retry is attempted. Dropping the returned future while the store
    /// call is pending abandons the commit and clears the in-flight flag.
    pub async fn commit_north(&mut self) -> Result<f64, CalibrationError> {
        let pending = self.begin_commit()?;
        let id = pending.panorama_id.to_string();
        let outcome = {
            let _in_flight = InFlight(&mut self.commit_in_flight);
            self.store.set_north_offset(&id, pending.north_offset).await
        };
        self.finish_commit(pending, outcome)
    }
}

/// Clears the in-flight flag when dropped, including on cancellation.
struct InFlight<'a>(&'a mut bool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}
