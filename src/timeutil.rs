//! Provisioning time frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Start/end timestamps for a provisioning step, with a human-readable
/// elapsed string. All fields are read-only from the user's point of
/// view; only the provisioning code writes them, through the shared
/// handle, after the step completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct TimeFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_utc: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_utc: Option<DateTime<Utc>>,
    /// Elapsed time in humantime form, derived from the two timestamps.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub took_string: String,
}

impl TimeFrame {
    /// Record a completed step from its boundary timestamps.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let took = (end - start).to_std().unwrap_or_default();
        Self {
            start_utc: Some(start),
            end_utc: Some(end),
            took_string: humantime::format_duration(took).to_string(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.start_utc.is_some() || self.end_utc.is_some()
    }

    /// Serde skip helper so empty frames are omitted from documents.
    pub fn is_unset(&self) -> bool {
        !self.is_set() && self.took_string.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Story: after a node group comes up, the provisioner records the
    /// frame and the document shows a human-readable elapsed time.
    #[test]
    fn story_frame_derives_took_string() {
        let start = Utc.with_ymd_and_hms(2021, 3, 1, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2021, 3, 1, 10, 12, 30).unwrap();
        let frame = TimeFrame::new(start, end);
        assert_eq!(frame.took_string, "12m 30s");
        assert!(frame.is_set());
    }

    #[test]
    fn story_empty_frame_serializes_to_nothing() {
        let frame = TimeFrame::default();
        assert!(!frame.is_set());
        let yaml = serde_yaml::to_string(&frame).unwrap();
        assert_eq!(yaml.trim(), "{}");
    }
}
