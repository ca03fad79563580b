use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// A media track handed to or received from a peer connection.
///
/// `native` carries the binding-specific track object (for example a
/// `webrtc` local or remote track) so the binding can recover it.
#[derive(Clone)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    native: Option<Arc<dyn Any + Send + Sync>>,
}

impl MediaTrack {
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            kind,
            native: None,
        }
    }

    pub fn with_native<T: Any + Send + Sync>(mut self, native: T) -> Self {
        self.native = Some(Arc::new(native));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn native<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.native.as_deref().and_then(|native| native.downcast_ref::<T>())
    }
}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("native", &self.native.is_some())
            .finish()
    }
}

/// An ordered set of tracks. The remote stream built by a negotiator is
/// shared with the application through `Arc` and grows as tracks arrive.
pub struct MediaStream {
    id: String,
    tracks: RwLock<Vec<MediaTrack>>,
}

impl MediaStream {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tracks: RwLock::new(Vec::new()),
        }
    }

    pub fn from_tracks(id: impl Into<String>, tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: id.into(),
            tracks: RwLock::new(tracks),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> Vec<MediaTrack> {
        self.tracks.read().clone()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.read().len()
    }

    /// Returns `false` when a track with the same id is already present.
    pub fn add_track(&self, track: MediaTrack) -> bool {
        let mut tracks = self.tracks.write();
        if tracks.iter().any(|existing| existing.id == track.id) {
            return false;
        }
        tracks.push(track);
        true
    }
}

impl Default for MediaStream {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("tracks", &*self.tracks.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_tracks_are_not_added_twice() {
        let stream = MediaStream::with_id("remote");
        assert!(stream.add_track(MediaTrack::new("a1", TrackKind::Audio)));
        assert!(!stream.add_track(MediaTrack::new("a1", TrackKind::Audio)));
        assert!(stream.add_track(MediaTrack::new("v1", TrackKind::Video)));
        let ids: Vec<_> = stream.tracks().iter().map(|t| t.id().to_string()).collect();
        assert_eq!(ids, vec!["a1", "v1"]);
    }

    #[test]
    fn native_handles_downcast_by_type() {
        #[derive(Debug, PartialEq)]
        struct Handle(u32);

        let track = MediaTrack::new("t", TrackKind::Video).with_native(Handle(7));
        assert_eq!(track.native::<Handle>(), Some(&Handle(7)));
        assert!(track.native::<String>().is_none());
        assert!(MediaTrack::new("bare", TrackKind::Audio).native::<Handle>().is_none());
    }
}
