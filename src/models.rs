use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 20.0;
pub const PASSING_SCORE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordStatus {
    Approved,
    Failed,
}

impl RecordStatus {
    /// Status implied by a final score on the 0-20 scale.
    pub fn from_score(final_score: f64) -> Self {
        if final_score >= PASSING_SCORE {
            RecordStatus::Approved
        } else {
            RecordStatus::Failed
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Approved => "Approved",
            RecordStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Approved" => Ok(RecordStatus::Approved),
            "Failed" => Ok(RecordStatus::Failed),
            other => Err(format!("unknown record status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Student {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcademicRecord {
    pub record_id: i64,
    pub student_user_id: i64,
    pub assignment_id: i64,
    pub final_score: f64,
    pub status: RecordStatus,
}

/// A validated request to close a grade. `status` is `None` when the caller
/// leaves it to be derived from the score.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub student_user_id: i64,
    pub assignment_id: i64,
    pub final_score: f64,
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub final_score: Option<f64>,
    pub status: Option<RecordStatus>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.final_score.is_none() && self.status.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub record_id: i64,
    pub subject_name: String,
    pub teacher_name: String,
    pub final_score: f64,
    pub status: RecordStatus,
    pub period: String,
    pub period_start: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentSummary {
    #[serde(flatten)]
    pub student: Student,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportCard {
    pub message: String,
    pub student: StudentSummary,
    pub records: Vec<ReportRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedRecord {
    pub id: i64,
    pub student_user_id: i64,
    pub assignment_id: i64,
    pub final_score: f64,
    pub status: RecordStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloseRecordResponse {
    pub message: String,
    pub record: ClosedRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateRecordResponse {
    pub message: String,
}
