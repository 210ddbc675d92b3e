use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::models::{AcademicRecord, NewRecord, RecordStatus, ReportRow, Student};
use crate::store::{FieldMap, FieldValue, InsertOutcome, RecordStore};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let users = vec![
        (1_i64, "Ana", "Rojas", "ana.rojas@school.edu"),
        (2, "Luis", "Pérez", "luis.perez@school.edu"),
        (3, "Valeria", "Mendoza", "valeria.mendoza@school.edu"),
        (101, "Marta", "Díaz", "marta.diaz@school.edu"),
        (102, "Jorge", "León", "jorge.leon@school.edu"),
    ];

    for (user_id, first_name, last_name, email) in users {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, first_name, last_name, email)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                email = EXCLUDED.email
            "#,
        )
        .bind(user_id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .execute(pool)
        .await?;
    }

    let years = vec![
        (
            1_i64,
            "2023-2024",
            NaiveDate::from_ymd_opt(2023, 9, 15).context("invalid date")?,
        ),
        (
            2,
            "2024-2025",
            NaiveDate::from_ymd_opt(2024, 9, 16).context("invalid date")?,
        ),
    ];

    for (year_id, name, start_date) in years {
        sqlx::query(
            r#"
            INSERT INTO academic_years (year_id, name, start_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (year_id) DO NOTHING
            "#,
        )
        .bind(year_id)
        .bind(name)
        .bind(start_date)
        .execute(pool)
        .await?;
    }

    for (subject_id, subject_name) in [(1_i64, "Mathematics"), (2, "Biology")] {
        sqlx::query(
            "INSERT INTO subjects (subject_id, subject_name) VALUES ($1, $2) \
             ON CONFLICT (subject_id) DO NOTHING",
        )
        .bind(subject_id)
        .bind(subject_name)
        .execute(pool)
        .await?;
    }

    for (section_id, year_id, name) in [(1_i64, 1_i64, "4A"), (2, 2, "5A")] {
        sqlx::query(
            "INSERT INTO sections (section_id, academic_year_id, name) VALUES ($1, $2, $3) \
             ON CONFLICT (section_id) DO NOTHING",
        )
        .bind(section_id)
        .bind(year_id)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let assignments = vec![
        (1_i64, 101_i64, 1_i64, 1_i64),
        (2, 102, 2, 1),
        (3, 101, 1, 2),
        (4, 102, 2, 2),
    ];

    for (assignment_id, teacher_user_id, subject_id, section_id) in assignments {
        sqlx::query(
            r#"
            INSERT INTO teacher_assignments (assignment_id, teacher_user_id, subject_id, section_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (assignment_id) DO NOTHING
            "#,
        )
        .bind(assignment_id)
        .bind(teacher_user_id)
        .bind(subject_id)
        .bind(section_id)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// `RecordStore` backed by the Postgres schema in `migrations/`.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_status(value: &str) -> anyhow::Result<RecordStatus> {
    value.parse::<RecordStatus>().map_err(anyhow::Error::msg)
}

impl RecordStore for PgRecordStore {
    async fn find_student(&self, student_id: i64) -> anyhow::Result<Option<Student>> {
        let row = sqlx::query(
            "SELECT user_id, first_name, last_name, email FROM users WHERE user_id = $1",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Student {
            user_id: row.get("user_id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            email: row.get("email"),
        }))
    }

    async fn find_report_rows(&self, student_id: i64) -> anyhow::Result<Vec<ReportRow>> {
        let rows = sqlx::query(
            r#"
            SELECT far.record_id,
                   s.subject_name,
                   t.first_name || ' ' || t.last_name AS teacher_name,
                   far.final_score,
                   far.status,
                   ay.name AS period,
                   ay.start_date
            FROM final_academic_records far
            JOIN teacher_assignments ta ON far.assignment_id = ta.assignment_id
            JOIN sections sec ON ta.section_id = sec.section_id
            JOIN academic_years ay ON sec.academic_year_id = ay.year_id
            JOIN subjects s ON ta.subject_id = s.subject_id
            JOIN users t ON ta.teacher_user_id = t.user_id
            WHERE far.student_user_id = $1
            ORDER BY ay.start_date DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::new();
        for row in rows {
            let status: String = row.get("status");
            records.push(ReportRow {
                record_id: row.get("record_id"),
                subject_name: row.get("subject_name"),
                teacher_name: row.get("teacher_name"),
                final_score: row.get("final_score"),
                status: parse_status(&status)?,
                period: row.get("period"),
                period_start: row.get("start_date"),
            });
        }

        Ok(records)
    }

    async fn find_record_by_student_and_assignment(
        &self,
        student_id: i64,
        assignment_id: i64,
    ) -> anyhow::Result<Option<AcademicRecord>> {
        let row = sqlx::query(
            r#"
            SELECT record_id, student_user_id, assignment_id, final_score, status
            FROM final_academic_records
            WHERE student_user_id = $1 AND assignment_id = $2
            "#,
        )
        .bind(student_id)
        .bind(assignment_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let status: String = row.get("status");
        Ok(Some(AcademicRecord {
            record_id: row.get("record_id"),
            student_user_id: row.get("student_user_id"),
            assignment_id: row.get("assignment_id"),
            final_score: row.get("final_score"),
            status: parse_status(&status)?,
        }))
    }

    async fn insert_record(
        &self,
        record: &NewRecord,
        status: RecordStatus,
    ) -> anyhow::Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO final_academic_records
            (student_user_id, assignment_id, final_score, status)
            VALUES ($1, $2, $3, $4)
            RETURNING record_id
            "#,
        )
        .bind(record.student_user_id)
        .bind(record.assignment_id)
        .bind(record.final_score)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(InsertOutcome::Inserted(row.get("record_id"))),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Ok(InsertOutcome::Duplicate)
            }
            Err(err) => Err(err).context("failed to insert academic record"),
        }
    }

    async fn update_record_fields(&self, record_id: i64, fields: &FieldMap) -> anyhow::Result<u64> {
        if fields.is_empty() {
            return Ok(0);
        }

        let mut query = build_update(record_id, fields);
        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn build_update(record_id: i64, fields: &FieldMap) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("UPDATE final_academic_records SET ");
    let mut assignments = query.separated(", ");
    for (field, value) in fields {
        assignments.push(field.column());
        assignments.push_unseparated(" = ");
        match *value {
            FieldValue::Score(score) => assignments.push_bind_unseparated(score),
            FieldValue::Status(status) => assignments.push_bind_unseparated(status.as_str()),
        };
    }
    query.push(" WHERE record_id = ");
    query.push_bind(record_id);
    query
}
