use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReportError;

/// Disaster categories tracked by the portal. The wire names are the
/// snake_case forms (`flood`, `earthquake`, `landslide`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasterType {
    Flood,
    Earthquake,
    Landslide,
}

impl DisasterType {
    pub const ALL: [DisasterType; 3] = [
        DisasterType::Flood,
        DisasterType::Earthquake,
        DisasterType::Landslide,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DisasterType::Flood => "flood",
            DisasterType::Earthquake => "earthquake",
            DisasterType::Landslide => "landslide",
        }
    }
}

impl fmt::Display for DisasterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisasterType {
    type Err = ReportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "flood" => Ok(DisasterType::Flood),
            "earthquake" => Ok(DisasterType::Earthquake),
            "landslide" => Ok(DisasterType::Landslide),
            other => Err(ReportError::Validation(format!(
                "unknown disaster type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Verified,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Verified => "verified",
            ReportStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = ReportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "pending" => Ok(ReportStatus::Pending),
            "verified" => Ok(ReportStatus::Verified),
            "rejected" => Ok(ReportStatus::Rejected),
            other => Err(ReportError::Validation(format!(
                "unknown report status '{other}'"
            ))),
        }
    }
}

/// A citizen-submitted incident report. Only the lifecycle manager mutates
/// these after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub district: String,
    pub disaster_type: DisasterType,
    pub description: String,
    pub year: i32,
    pub status: ReportStatus,
    pub reporter_id: String,
    pub created_at: DateTime<Utc>,
}

/// Fields a citizen supplies when submitting a report.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportDraft {
    pub district: String,
    pub disaster_type: DisasterType,
    pub description: String,
    pub year: i32,
}

/// Partial update applied by an admin edit. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportPatch {
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub disaster_type: Option<DisasterType>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub status: Option<ReportStatus>,
}

impl ReportPatch {
    pub fn is_empty(&self) -> bool {
        self.district.is_none()
            && self.disaster_type.is_none()
            && self.description.is_none()
            && self.year.is_none()
            && self.status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disaster_type_round_trips_through_wire_names() {
        for kind in DisasterType::ALL {
            let parsed: DisasterType = kind.as_str().parse().expect("wire name parses");
            assert_eq!(parsed, kind);
        }

        let json = serde_json::to_string(&DisasterType::Earthquake).unwrap();
        assert_eq!(json, "\"earthquake\"");
    }

    #[test]
    fn disaster_type_rejects_unknown_names() {
        let err = "tornado".parse::<DisasterType>().unwrap_err();
        assert!(matches!(err, ReportError::Validation(_)));
    }

    #[test]
    fn status_parses_wire_names() {
        assert_eq!(
            "verified".parse::<ReportStatus>().unwrap(),
            ReportStatus::Verified
        );
        let err = "approved".parse::<ReportStatus>().unwrap_err();
        assert!(matches!(err, ReportError::Validation(_)));
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(ReportPatch::default().is_empty());
        let patch = ReportPatch {
            year: Some(2024),
            ..ReportPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
