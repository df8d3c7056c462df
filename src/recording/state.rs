use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RecordingStatus {
    #[default]
    Idle,
    Recording,
}

/// On/off state of the recorder. `started_at` is set exactly while recording.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    status: RecordingStatus,
    session_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    /// Monotonic twin of `started_at`, used for elapsed time.
    #[serde(skip)]
    running_anchor: Option<Instant>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RecordingStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordingStatus::Recording
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.running_anchor
            .map(|anchor| now.saturating_duration_since(anchor))
    }

    pub fn begin(&mut self, started_at: DateTime<Utc>, now: Instant) -> Result<Uuid> {
        if let Some(since) = self.started_at {
            return Err(Error::AlreadyRecording { since });
        }

        let session_id = Uuid::new_v4();
        *self = Self {
            status: RecordingStatus::Recording,
            session_id: Some(session_id),
            started_at: Some(started_at),
            running_anchor: Some(now),
        };
        Ok(session_id)
    }

    /// Returns how long the session ran.
    pub fn end(&mut self, now: Instant) -> Result<Duration> {
        let elapsed = self.elapsed(now).ok_or(Error::NotRecording)?;
        *self = Self::default();
        Ok(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_without_start_time() {
        let session = RecordingSession::new();
        assert_eq!(session.status(), RecordingStatus::Idle);
        assert!(!session.is_active());
        assert_eq!(session.started_at(), None);
        assert_eq!(session.elapsed(Instant::now()), None);
    }

    #[test]
    fn double_begin_keeps_first_start_time() {
        let mut session = RecordingSession::new();
        let first = Utc::now();
        let now = Instant::now();
        session.begin(first, now).unwrap();

        let err = session
            .begin(first + chrono::Duration::seconds(5), now)
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRecording { since } if since == first));
        assert_eq!(session.started_at(), Some(first));
    }

    #[test]
    fn end_clears_start_time_and_reports_duration() {
        let mut session = RecordingSession::new();
        let anchor = Instant::now();
        session.begin(Utc::now(), anchor).unwrap();
        assert!(session.session_id().is_some());

        let elapsed = session.end(anchor + Duration::from_secs(7)).unwrap();
        assert_eq!(elapsed, Duration::from_secs(7));
        assert!(!session.is_active());
        assert_eq!(session.started_at(), None);
        assert_eq!(session.session_id(), None);

        assert!(matches!(session.end(anchor), Err(Error::NotRecording)));
    }
}
