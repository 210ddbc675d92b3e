use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::anyhow;
use chrono::NaiveDate;

use crate::models::{AcademicRecord, NewRecord, RecordStatus, ReportRow, Student};
use crate::store::{FieldMap, FieldValue, InsertOutcome, RecordStore};

#[derive(Debug, Clone)]
struct Assignment {
    subject_name: String,
    teacher_name: String,
    period: String,
    period_start: NaiveDate,
}

#[derive(Default)]
struct State {
    students: HashMap<i64, Student>,
    assignments: HashMap<i64, Assignment>,
    records: Vec<AcademicRecord>,
    next_record_id: i64,
    insert_calls: usize,
    update_calls: usize,
    hide_existing: bool,
    fail_next: Option<String>,
}

/// In-memory `RecordStore` that mirrors the Postgres schema closely enough for
/// service tests, including the uniqueness constraint on closed pairs.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_student(&self, user_id: i64, first_name: &str, last_name: &str, email: &str) {
        self.lock().students.insert(
            user_id,
            Student {
                user_id,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.to_string(),
            },
        );
    }

    pub fn add_assignment(
        &self,
        assignment_id: i64,
        subject_name: &str,
        teacher_name: &str,
        period: &str,
        period_start: NaiveDate,
    ) {
        self.lock().assignments.insert(
            assignment_id,
            Assignment {
                subject_name: subject_name.to_string(),
                teacher_name: teacher_name.to_string(),
                period: period.to_string(),
                period_start,
            },
        );
    }

    pub fn record(&self, record_id: i64) -> Option<AcademicRecord> {
        self.lock()
            .records
            .iter()
            .find(|record| record.record_id == record_id)
            .cloned()
    }

    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }

    pub fn insert_calls(&self) -> usize {
        self.lock().insert_calls
    }

    pub fn update_calls(&self) -> usize {
        self.lock().update_calls
    }

    /// Makes the existence lookup report nothing, simulating two closures
    /// racing past the check.
    pub fn hide_existing_records(&self, hide: bool) {
        self.lock().hide_existing = hide;
    }

    /// Fails the next store call with `message`.
    pub fn fail_next(&self, message: &str) {
        self.lock().fail_next = Some(message.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> anyhow::Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.lock();
        if let Some(message) = state.fail_next.take() {
            return Err(anyhow!(message));
        }
        Ok(state)
    }
}

impl RecordStore for MemoryStore {
    async fn find_student(&self, student_id: i64) -> anyhow::Result<Option<Student>> {
        let state = self.begin()?;
        Ok(state.students.get(&student_id).cloned())
    }

    async fn find_report_rows(&self, student_id: i64) -> anyhow::Result<Vec<ReportRow>> {
        let state = self.begin()?;
        let mut rows = Vec::new();
        for record in state
            .records
            .iter()
            .filter(|record| record.student_user_id == student_id)
        {
            let assignment = state
                .assignments
                .get(&record.assignment_id)
                .ok_or_else(|| anyhow!("assignment {} missing", record.assignment_id))?;
            rows.push(ReportRow {
                record_id: record.record_id,
                subject_name: assignment.subject_name.clone(),
                teacher_name: assignment.teacher_name.clone(),
                final_score: record.final_score,
                status: record.status,
                period: assignment.period.clone(),
                period_start: assignment.period_start,
            });
        }
        rows.sort_by(|a, b| b.period_start.cmp(&a.period_start));
        Ok(rows)
    }

    async fn find_record_by_student_and_assignment(
        &self,
        student_id: i64,
        assignment_id: i64,
    ) -> anyhow::Result<Option<AcademicRecord>> {
        let state = self.begin()?;
        if state.hide_existing {
            return Ok(None);
        }
        Ok(state
            .records
            .iter()
            .find(|record| {
                record.student_user_id == student_id && record.assignment_id == assignment_id
            })
            .cloned())
    }

    async fn insert_record(
        &self,
        record: &NewRecord,
        status: RecordStatus,
    ) -> anyhow::Result<InsertOutcome> {
        let mut state = self.begin()?;
        state.insert_calls += 1;
        let duplicate = state.records.iter().any(|existing| {
            existing.student_user_id == record.student_user_id
                && existing.assignment_id == record.assignment_id
        });
        if duplicate {
            return Ok(InsertOutcome::Duplicate);
        }
        state.next_record_id += 1;
        let record_id = state.next_record_id;
        state.records.push(AcademicRecord {
            record_id,
            student_user_id: record.student_user_id,
            assignment_id: record.assignment_id,
            final_score: record.final_score,
            status,
        });
        Ok(InsertOutcome::Inserted(record_id))
    }

    async fn update_record_fields(&self, record_id: i64, fields: &FieldMap) -> anyhow::Result<u64> {
        let mut state = self.begin()?;
        state.update_calls += 1;
        let Some(record) = state
            .records
            .iter_mut()
            .find(|record| record.record_id == record_id)
        else {
            return Ok(0);
        };
        for value in fields.values() {
            match *value {
                FieldValue::Score(score) => record.final_score = score,
                FieldValue::Status(status) => record.status = status,
            }
        }
        Ok(1)
    }
}
