//! Event topics and payloads.
//!
//! Events are what the backend tells the UI. The topic names and the
//! camelCase payload fields are consumed verbatim by the front end.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::JobId;

/// Fixed set of event topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EventTopic {
    /// Resource verification pass beginning
    ResourceStart,
    /// Incremental status for one resource
    ResourceProgress,
    /// One resource verified
    ResourceStop,
    /// A resource failed; pass aborted
    ResourceError,
    /// All resources verified
    ResourceFinish,
    /// A download job has begun
    DownloadStart,
    /// Download/clip progress for the running job
    DownloadProgress,
    /// The running job reached a terminal state
    DownloadStop,
    /// User-facing notice
    Message,
}

impl EventTopic {
    pub const ALL: [EventTopic; 9] = [
        EventTopic::ResourceStart,
        EventTopic::ResourceProgress,
        EventTopic::ResourceStop,
        EventTopic::ResourceError,
        EventTopic::ResourceFinish,
        EventTopic::DownloadStart,
        EventTopic::DownloadProgress,
        EventTopic::DownloadStop,
        EventTopic::Message,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventTopic::ResourceStart => "resource-start",
            EventTopic::ResourceProgress => "resource-progress",
            EventTopic::ResourceStop => "resource-stop",
            EventTopic::ResourceError => "resource-error",
            EventTopic::ResourceFinish => "resource-finish",
            EventTopic::DownloadStart => "download-start",
            EventTopic::DownloadProgress => "download-progress",
            EventTopic::DownloadStop => "download-stop",
            EventTopic::Message => "message",
        }
    }

    /// Look a topic up by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for EventTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a single resource, keyed by resource name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProgress {
    /// Resource name (stable key for the UI's progress bars)
    pub key: String,
    /// Human label
    pub title: String,
    /// Current step ("Downloading", "Extracting", ...)
    pub description: String,
    /// 0-100
    pub progress: f64,
}

/// Resource pass failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFailure {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub key: Option<String>,
    pub message: String,
}

/// Download job status as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Pending,
    Processing,
    Download,
    Done,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStarted {
    pub job_id: JobId,
    pub url: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    pub job_id: JobId,
    pub status: DownloadStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStopped {
    pub job_id: JobId,
    pub status: DownloadStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Success,
    Error,
    Info,
}

/// User-facing notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Notice {
    pub status: MessageStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Event envelope: `{"topic": "...", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "topic", content = "payload", rename_all = "kebab-case")]
pub enum Event {
    ResourceStart,
    ResourceProgress(ResourceProgress),
    ResourceStop(ResourceProgress),
    ResourceError(ResourceFailure),
    ResourceFinish,
    DownloadStart(DownloadStarted),
    DownloadProgress(DownloadProgress),
    DownloadStop(DownloadStopped),
    Message(Notice),
}

impl Event {
    pub fn topic(&self) -> EventTopic {
        match self {
            Event::ResourceStart => EventTopic::ResourceStart,
            Event::ResourceProgress(_) => EventTopic::ResourceProgress,
            Event::ResourceStop(_) => EventTopic::ResourceStop,
            Event::ResourceError(_) => EventTopic::ResourceError,
            Event::ResourceFinish => EventTopic::ResourceFinish,
            Event::DownloadStart(_) => EventTopic::DownloadStart,
            Event::DownloadProgress(_) => EventTopic::DownloadProgress,
            Event::DownloadStop(_) => EventTopic::DownloadStop,
            Event::Message(_) => EventTopic::Message,
        }
    }

    /// Create a resource progress event. Progress is clamped to 0-100.
    pub fn resource_progress(
        key: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        progress: f64,
    ) -> Self {
        Event::ResourceProgress(ResourceProgress {
            key: key.into(),
            title: title.into(),
            description: description.into(),
            progress: clamp_percent(progress),
        })
    }

    /// Create a resource stop event (always at 100%).
    pub fn resource_stop(key: impl Into<String>, title: impl Into<String>) -> Self {
        Event::ResourceStop(ResourceProgress {
            key: key.into(),
            title: title.into(),
            description: String::new(),
            progress: 100.0,
        })
    }

    /// Create a resource error event.
    pub fn resource_error(key: Option<String>, message: impl Into<String>) -> Self {
        Event::ResourceError(ResourceFailure {
            key,
            message: message.into(),
        })
    }

    /// Create a download progress event.
    pub fn download_progress(
        job_id: &JobId,
        status: DownloadStatus,
        progress: Option<f64>,
        message: Option<String>,
    ) -> Self {
        Event::DownloadProgress(DownloadProgress {
            job_id: job_id.clone(),
            status,
            message,
            progress: progress.map(clamp_percent),
        })
    }

    /// Create a notice.
    pub fn message(status: MessageStatus, message: impl Into<String>) -> Self {
        Event::Message(Notice {
            status,
            message: message.into(),
            timestamp: Utc::now(),
        })
    }

    /// Split into `(topic, payload)` for transports that emit named events.
    /// Topics without a payload map to `null`.
    pub fn into_wire(self) -> (&'static str, serde_json::Value) {
        let topic = self.topic().as_str();
        let payload = match serde_json::to_value(&self) {
            Ok(serde_json::Value::Object(mut map)) => {
                map.remove("payload").unwrap_or(serde_json::Value::Null)
            }
            _ => serde_json::Value::Null,
        };
        (topic, payload)
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
