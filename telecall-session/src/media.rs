use crate::error::MediaAccessError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Opaque handle to a media stream, the id a renderer attaches to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamHandle(pub String);

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A captured local track. Whoever produces samples for it checks
/// `is_enabled` and stops once `is_stopped` reports true.
#[derive(Debug)]
pub struct LocalTrack {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

impl LocalTrack {
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct LocalMedia {
    stream: StreamHandle,
    tracks: Vec<Arc<LocalTrack>>,
}

impl LocalMedia {
    pub fn new(stream: StreamHandle, tracks: Vec<Arc<LocalTrack>>) -> Self {
        Self { stream, tracks }
    }

    pub fn stream(&self) -> &StreamHandle {
        &self.stream
    }

    pub fn tracks(&self) -> &[Arc<LocalTrack>] {
        &self.tracks
    }

    /// Enables or disables every track of `kind`. Returns false when the
    /// stream has no such track, in which case nothing changes.
    pub fn set_enabled(&self, kind: TrackKind, enabled: bool) -> bool {
        let mut touched = false;
        for track in self.tracks.iter().filter(|t| t.kind() == kind) {
            track.set_enabled(enabled);
            touched = true;
        }
        touched
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// Local capture, the `getUserMedia` of the call.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<LocalMedia, MediaAccessError>;
}

/// Hands out track handles that never carry samples. Used where no
/// capture device exists, such as the command line client.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentMediaSource;

#[async_trait]
impl MediaSource for SilentMediaSource {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<LocalMedia, MediaAccessError> {
        if !constraints.audio && !constraints.video {
            return Err(MediaAccessError::new("neither audio nor video requested"));
        }

        let stream = StreamHandle(Uuid::new_v4().to_string());
        let mut tracks = Vec::new();
        if constraints.audio {
            tracks.push(LocalTrack::new(format!("audio-{}", Uuid::new_v4()), TrackKind::Audio));
        }
        if constraints.video {
            tracks.push(LocalTrack::new(format!("video-{}", Uuid::new_v4()), TrackKind::Video));
        }

        Ok(LocalMedia::new(stream, tracks))
    }
}
