use crate::config::MediaConstraints;
use crate::error::MediaAccessError;
use crate::media::{MediaTrack, TrackSource};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct LocalTracks {
    pub audio: Option<MediaTrack>,
    pub video: Option<MediaTrack>,
}

impl LocalTracks {
    pub fn iter(&self) -> impl Iterator<Item = &MediaTrack> {
        self.audio.iter().chain(self.video.iter())
    }
}

/// Capture-side collaborator: hands out local tracks and takes them back.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn acquire_local_tracks(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<LocalTracks, MediaAccessError>;

    async fn acquire_screen_track(&self) -> Result<MediaTrack, MediaAccessError>;

    /// Stops capture for `track`.
    fn release(&self, track: &MediaTrack);
}

/// Devices whose tracks are fed by the application through [`MediaTrack::write_sample`].
///
/// Each device can be switched off to model a missing device or a denied prompt.
pub struct SampleTrackDevices {
    microphone: AtomicBool,
    camera: AtomicBool,
    screen: AtomicBool,
    counter: AtomicU32,
    released: Mutex<Vec<String>>,
}

impl SampleTrackDevices {
    pub fn new() -> Self {
        Self {
            microphone: AtomicBool::new(true),
            camera: AtomicBool::new(true),
            screen: AtomicBool::new(true),
            counter: AtomicU32::new(0),
            released: Mutex::new(Vec::new()),
        }
    }

    pub fn set_microphone_available(&self, available: bool) {
        self.microphone.store(available, Ordering::SeqCst);
    }

    pub fn set_camera_available(&self, available: bool) {
        self.camera.store(available, Ordering::SeqCst);
    }

    /// With screen capture off every screen-share prompt counts as denied.
    pub fn set_screen_available(&self, available: bool) {
        self.screen.store(available, Ordering::SeqCst);
    }

    /// Ids of released tracks, in release order.
    pub fn released(&self) -> Vec<String> {
        self.released
            .lock()
            .map(|released| released.clone())
            .unwrap_or_default()
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", prefix, n)
    }
}

impl Default for SampleTrackDevices {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaDevices for SampleTrackDevices {
    async fn acquire_local_tracks(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<LocalTracks, MediaAccessError> {
        let mut tracks = LocalTracks::default();

        if constraints.audio {
            if !self.microphone.load(Ordering::SeqCst) {
                return Err(MediaAccessError::NotFound("microphone".into()));
            }
            tracks.audio = Some(MediaTrack::new(self.next_id("mic"), TrackSource::Microphone));
        }

        if constraints.video {
            if !self.camera.load(Ordering::SeqCst) {
                return Err(MediaAccessError::NotFound("camera".into()));
            }
            tracks.video = Some(MediaTrack::new(self.next_id("cam"), TrackSource::Camera));
        }

        Ok(tracks)
    }

    async fn acquire_screen_track(&self) -> Result<MediaTrack, MediaAccessError> {
        if !self.screen.load(Ordering::SeqCst) {
            return Err(MediaAccessError::PermissionDenied("screen capture".into()));
        }
        Ok(MediaTrack::new(self.next_id("screen"), TrackSource::Screen))
    }

    fn release(&self, track: &MediaTrack) {
        debug!("Releasing local track {}", track.id());
        if let Ok(mut released) = self.released.lock() {
            released.push(track.id().to_owned());
        }
    }
}
