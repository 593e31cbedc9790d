//! Intervention records — the audit trail governance leaves on a request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How significant a governance intervention is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => f.pad("low"),
            Self::Medium => f.pad("medium"),
            Self::High => f.pad("high"),
        }
    }
}

/// One plugin's material change to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionRecord {
    /// Id of the plugin that intervened.
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl InterventionRecord {
    pub fn new(kind: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            severity,
            timestamp: Utc::now(),
        }
    }
}
