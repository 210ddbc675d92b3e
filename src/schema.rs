use std::fmt;

use crate::models::{NewRecord, RecordPatch, RecordStatus, MAX_SCORE, MIN_SCORE};

/// Field-level rejections collected while validating a request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    pub details: Vec<String>,
}

impl ValidationErrors {
    fn push(&mut self, field: &str, message: impl fmt::Display) {
        self.details.push(format!("{field}: {message}"));
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.details.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.details.join("; "))
    }
}

/// Unvalidated close request, as received from the calling layer.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RawCloseInput {
    pub student_user_id: Option<i64>,
    pub assignment_id: Option<i64>,
    pub final_score: Option<f64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawUpdateInput {
    pub final_score: Option<f64>,
    pub status: Option<String>,
}

pub fn validate_close(raw: RawCloseInput) -> Result<NewRecord, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let student_user_id = required_id(&mut errors, "student_user_id", raw.student_user_id);
    let assignment_id = required_id(&mut errors, "assignment_id", raw.assignment_id);
    let final_score = match raw.final_score {
        Some(score) => check_score(&mut errors, score),
        None => {
            errors.push("final_score", "is required");
            0.0
        }
    };
    let status = optional_status(&mut errors, raw.status.as_deref());

    errors.into_result(NewRecord {
        student_user_id,
        assignment_id,
        final_score,
        status,
    })
}

/// Validates each field that is present. An update with no fields passes here;
/// rejecting it is the service's job.
pub fn validate_update(raw: RawUpdateInput) -> Result<RecordPatch, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let final_score = raw.final_score.map(|score| check_score(&mut errors, score));
    let status = optional_status(&mut errors, raw.status.as_deref());

    errors.into_result(RecordPatch {
        final_score,
        status,
    })
}

/// Parses a path-style identifier. Returns `None` for anything that is not a
/// positive integer.
pub fn parse_id(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

fn required_id(errors: &mut ValidationErrors, field: &str, value: Option<i64>) -> i64 {
    match value {
        Some(id) if id > 0 => id,
        Some(_) => {
            errors.push(field, "must be a positive integer");
            0
        }
        None => {
            errors.push(field, "is required");
            0
        }
    }
}

fn check_score(errors: &mut ValidationErrors, score: f64) -> f64 {
    if !score.is_finite() || score < MIN_SCORE || score > MAX_SCORE {
        errors.push(
            "final_score",
            format!("must be between {MIN_SCORE} and {MAX_SCORE}"),
        );
    }
    score
}

fn optional_status(errors: &mut ValidationErrors, value: Option<&str>) -> Option<RecordStatus> {
    let value = value?;
    match value.parse::<RecordStatus>() {
        Ok(status) => Some(status),
        Err(message) => {
            errors.push("status", message);
            None
        }
    }
}
