use std::collections::BTreeMap;
use std::future::Future;

use crate::models::{AcademicRecord, NewRecord, RecordStatus, ReportRow, Student};

/// Columns of `final_academic_records` that an update may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordField {
    FinalScore,
    Status,
}

impl RecordField {
    pub fn column(self) -> &'static str {
        match self {
            RecordField::FinalScore => "final_score",
            RecordField::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Score(f64),
    Status(RecordStatus),
}

/// Staged column updates for a single record. Staging the same field twice
/// keeps the later value.
pub type FieldMap = BTreeMap<RecordField, FieldValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    /// The store refused the row because the (student, assignment) pair is
    /// already closed.
    Duplicate,
}

/// Persistence gateway for academic records. Every method is a single round
/// trip; none of them are composed into a transaction.
pub trait RecordStore: Send + Sync {
    fn find_student(
        &self,
        student_id: i64,
    ) -> impl Future<Output = anyhow::Result<Option<Student>>> + Send;

    /// Closed records for a student, most recent academic year first.
    fn find_report_rows(
        &self,
        student_id: i64,
    ) -> impl Future<Output = anyhow::Result<Vec<ReportRow>>> + Send;

    fn find_record_by_student_and_assignment(
        &self,
        student_id: i64,
        assignment_id: i64,
    ) -> impl Future<Output = anyhow::Result<Option<AcademicRecord>>> + Send;

    /// Inserts a record whose status has already been resolved.
    fn insert_record(
        &self,
        record: &NewRecord,
        status: RecordStatus,
    ) -> impl Future<Output = anyhow::Result<InsertOutcome>> + Send;

    /// Applies `fields` to one record and returns the number of rows affected.
    fn update_record_fields(
        &self,
        record_id: i64,
        fields: &FieldMap,
    ) -> impl Future<Output = anyhow::Result<u64>> + Send;
}
