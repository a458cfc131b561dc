use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Level readings of the last captured frame (RMS and peak, 0.0–1.0 before gain).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioLevels {
    pub left_level: f32,
    pub right_level: f32,
    pub mix_level: f32,
    pub peak_mix_level: f32,
    /// Decaying peak hold across polls.
    pub held_peak: f32,
}

/// Diagnostics for an open capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureDiagnostics {
    pub session_id: Uuid,
    pub opened_at: DateTime<Utc>,
    pub chunks_captured: u64,
    pub short_reads: u64,
    pub device_events: u64,
}
