//! Core bug model with workflow enums and dependent-row models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Severity tier assigned by the classifier. Stored as lowercase text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Parse a lowercase tier label, as persisted by the classifier model.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// All tiers, most severe first.
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow status of a persisted bug. Stored as lowercase snake_case text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BugStatus {
    Open,
    InProgress,
    Fixed,
    Closed,
}

impl BugStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Fixed => "fixed",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for BugStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted finding with workflow state.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bug {
    pub id: i64,
    pub file_path: String,
    pub language: String,
    pub line_number: i64,
    pub column_number: i64,
    pub message: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub status: BugStatus,
    pub assigned_to: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Bug row joined with the assignee's username for list and detail views.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BugWithAssignee {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub bug: Bug,
    pub assigned_to_name: Option<String>,
}

/// Append-only audit row for a field change.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BugHistory {
    pub id: i64,
    pub bug_id: i64,
    pub user_id: Option<i64>,
    pub field_changed: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
    pub username: Option<String>,
}

/// Comment row joined with its author's username.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BugComment {
    pub id: i64,
    pub bug_id: i64,
    pub user_id: i64,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// LLM-generated fix suggestion attached to a bug.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SuggestedFix {
    pub id: i64,
    pub bug_id: i64,
    pub language: String,
    pub suggestion: String,
    pub code_example: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_serialization() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let parsed: Severity = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(parsed, Severity::High);
    }

    #[test]
    fn severity_label_round_trip() {
        for tier in Severity::ALL {
            assert_eq!(Severity::parse_label(tier.as_str()), Some(tier));
        }
        assert_eq!(Severity::parse_label("blocker"), None);
    }

    #[test]
    fn status_serialization() {
        let json = serde_json::to_string(&BugStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let parsed: BugStatus = serde_json::from_str("\"closed\"").unwrap();
        assert_eq!(parsed, BugStatus::Closed);
    }

    #[test]
    fn bug_kind_serializes_as_type() {
        let bug = Bug {
            id: 1,
            file_path: "main.go".to_string(),
            language: "go".to_string(),
            line_number: 12,
            column_number: 3,
            message: "Error not checked".to_string(),
            kind: "error_check".to_string(),
            severity: Severity::High,
            status: BugStatus::Open,
            assigned_to: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&bug).unwrap();
        assert_eq!(json["type"], "error_check");
        assert!(json.get("kind").is_none());
    }
}
