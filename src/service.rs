use tracing::{debug, info, warn};

use crate::error::RecordError;
use crate::models::{
    ClosedRecord, CloseRecordResponse, NewRecord, RecordPatch, RecordStatus, ReportCard,
    ReportRow, StudentSummary, UpdateRecordResponse,
};
use crate::store::{FieldMap, FieldValue, InsertOutcome, RecordField, RecordStore};

const DUPLICATE_CLOSURE: &str = "a final grade is already closed for this student and subject";

pub struct RecordService<S> {
    store: S,
}

impl<S: RecordStore> RecordService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn generate_report_card(&self, student_id: i64) -> Result<ReportCard, RecordError> {
        if student_id <= 0 {
            return Err(RecordError::InvalidInput("invalid student id".to_string()));
        }

        let student = self
            .store
            .find_student(student_id)
            .await?
            .ok_or_else(|| RecordError::NotFound("student does not exist".to_string()))?;

        let records = self.store.find_report_rows(student_id).await?;
        debug!(student_id, rows = records.len(), "loaded report rows");

        if records.is_empty() {
            return Ok(ReportCard {
                message: "student has no closed academic records yet".to_string(),
                student: StudentSummary {
                    student,
                    global_average: None,
                },
                records,
            });
        }

        let global_average = global_average(&records);
        Ok(ReportCard {
            message: "report card generated".to_string(),
            student: StudentSummary {
                student,
                global_average,
            },
            records,
        })
    }

    pub async fn close_record(&self, input: NewRecord) -> Result<CloseRecordResponse, RecordError> {
        let status = input
            .status
            .unwrap_or_else(|| RecordStatus::from_score(input.final_score));

        let existing = self
            .store
            .find_record_by_student_and_assignment(input.student_user_id, input.assignment_id)
            .await?;
        if let Some(record) = existing {
            warn!(
                student_id = input.student_user_id,
                assignment_id = input.assignment_id,
                record_id = record.record_id,
                "grade already closed"
            );
            return Err(RecordError::Conflict(DUPLICATE_CLOSURE.to_string()));
        }

        let id = match self.store.insert_record(&input, status).await? {
            InsertOutcome::Inserted(id) => id,
            InsertOutcome::Duplicate => {
                warn!(
                    student_id = input.student_user_id,
                    assignment_id = input.assignment_id,
                    "insert rejected by uniqueness constraint"
                );
                return Err(RecordError::Conflict(DUPLICATE_CLOSURE.to_string()));
            }
        };

        info!(
            record_id = id,
            student_id = input.student_user_id,
            assignment_id = input.assignment_id,
            %status,
            "closed final grade"
        );

        Ok(CloseRecordResponse {
            message: "final grade recorded".to_string(),
            record: ClosedRecord {
                id,
                student_user_id: input.student_user_id,
                assignment_id: input.assignment_id,
                final_score: input.final_score,
                status,
            },
        })
    }

    pub async fn update_record(
        &self,
        record_id: i64,
        patch: RecordPatch,
    ) -> Result<UpdateRecordResponse, RecordError> {
        if record_id <= 0 {
            return Err(RecordError::InvalidInput("invalid record id".to_string()));
        }

        if patch.is_empty() {
            return Err(RecordError::InvalidInput("nothing to update".to_string()));
        }

        let fields = stage_patch(&patch);

        let affected = self.store.update_record_fields(record_id, &fields).await?;
        if affected == 0 {
            return Err(RecordError::NotFound("record not found".to_string()));
        }

        info!(record_id, fields = fields.len(), "updated academic record");
        Ok(UpdateRecordResponse {
            message: "record updated".to_string(),
        })
    }
}

/// Builds the field map for a patch: score first (re-deriving status when the
/// patch carries none), then any explicit status on top.
pub fn stage_patch(patch: &RecordPatch) -> FieldMap {
    let mut fields = FieldMap::new();
    stage_score(&mut fields, patch);
    stage_status(&mut fields, patch);
    fields
}

fn stage_score(fields: &mut FieldMap, patch: &RecordPatch) {
    let Some(score) = patch.final_score else {
        return;
    };
    fields.insert(RecordField::FinalScore, FieldValue::Score(score));
    if patch.status.is_none() {
        fields.insert(
            RecordField::Status,
            FieldValue::Status(RecordStatus::from_score(score)),
        );
    }
}

fn stage_status(fields: &mut FieldMap, patch: &RecordPatch) {
    if let Some(status) = patch.status {
        fields.insert(RecordField::Status, FieldValue::Status(status));
    }
}

/// Mean of all final scores rounded to two decimals, or `None` for no rows.
pub fn global_average(records: &[ReportRow]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let total: f64 = records.iter().map(|row| row.final_score).sum();
    let mean = total / records.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}
