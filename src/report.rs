use std::fmt::Write;

use crate::models::ReportCard;

pub fn build_report(card: &ReportCard) -> String {
    let student = &card.student.student;
    let mut output = String::new();

    let _ = writeln!(output, "# Report Card");
    let _ = writeln!(
        output,
        "{} {} ({})",
        student.first_name, student.last_name, student.email
    );
    let _ = writeln!(output);

    match card.student.global_average {
        Some(average) => {
            let _ = writeln!(output, "Global average: {:.2}", average);
        }
        None => {
            let _ = writeln!(output, "Global average: n/a");
        }
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "## Final Grades");

    if card.records.is_empty() {
        let _ = writeln!(output, "No closed academic records yet.");
        return output;
    }

    let _ = writeln!(output, "| Period | Subject | Teacher | Score | Status |");
    let _ = writeln!(output, "|---|---|---|---|---|");
    for row in card.records.iter() {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {:.2} | {} |",
            row.period, row.subject_name, row.teacher_name, row.final_score, row.status
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordStatus, ReportRow, Student, StudentSummary};
    use chrono::NaiveDate;

    fn card(records: Vec<ReportRow>, global_average: Option<f64>) -> ReportCard {
        ReportCard {
            message: "report card generated".to_string(),
            student: StudentSummary {
                student: Student {
                    user_id: 1,
                    first_name: "Ana".to_string(),
                    last_name: "Rojas".to_string(),
                    email: "ana.rojas@school.edu".to_string(),
                },
                global_average,
            },
            records,
        }
    }

    #[test]
    fn lists_rows_in_card_order() {
        let rows = vec![
            ReportRow {
                record_id: 2,
                subject_name: "Biology".to_string(),
                teacher_name: "Jorge León".to_string(),
                final_score: 16.0,
                status: RecordStatus::Approved,
                period: "2024-2025".to_string(),
                period_start: NaiveDate::from_ymd_opt(2024, 9, 16).unwrap(),
            },
            ReportRow {
                record_id: 1,
                subject_name: "Mathematics".to_string(),
                teacher_name: "Marta Díaz".to_string(),
                final_score: 9.0,
                status: RecordStatus::Failed,
                period: "2023-2024".to_string(),
                period_start: NaiveDate::from_ymd_opt(2023, 9, 15).unwrap(),
            },
        ];

        let report = build_report(&card(rows, Some(12.5)));
        assert!(report.contains("Global average: 12.50"));
        let biology = report.find("Biology").unwrap();
        let maths = report.find("Mathematics").unwrap();
        assert!(biology < maths);
        assert!(report.contains("| 2023-2024 | Mathematics | Marta Díaz | 9.00 | Failed |"));
    }

    #[test]
    fn empty_card_says_so() {
        let report = build_report(&card(Vec::new(), None));
        assert!(report.contains("Global average: n/a"));
        assert!(report.contains("No closed academic records yet."));
    }
}
