//! Telemetry sink.
//!
//! Telemetry is an explicitly constructed collaborator handed to the
//! components that emit events. There is no process-wide client.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Product events worth counting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    ActionExecuted {
        action: String,
        success: bool,
    },
    MultiActFinished {
        requested: usize,
        executed: usize,
        aborted_on_change: bool,
    },
    SnapshotTaken {
        url: String,
        interactive_elements: usize,
    },
}

/// Receives telemetry events.
pub trait Telemetry: Send + Sync {
    fn capture(&self, event: TelemetryEvent);
}

/// Discards everything. Used when telemetry is disabled and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn capture(&self, _event: TelemetryEvent) {}
}

/// Emits events as `tracing` records tagged with a per-instance distinct id.
#[derive(Debug, Clone)]
pub struct TracingTelemetry {
    distinct_id: Uuid,
    started_at: DateTime<Utc>,
}

impl TracingTelemetry {
    pub fn new() -> Self {
        Self {
            distinct_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    pub fn distinct_id(&self) -> Uuid {
        self.distinct_id
    }
}

impl Default for TracingTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry for TracingTelemetry {
    fn capture(&self, event: TelemetryEvent) {
        let payload = serde_json::to_string(&event).unwrap_or_default();
        debug!(
            target: "webhands::telemetry",
            distinct_id = %self.distinct_id,
            uptime_secs = (Utc::now() - self.started_at).num_seconds(),
            "{}",
            payload
        );
    }
}
