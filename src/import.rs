use std::io::Read;

use tracing::warn;

use crate::error::{ErrorKind, RecordError};
use crate::schema::{self, RawCloseInput};
use crate::service::RecordService;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub closed: usize,
    pub already_closed: usize,
    pub rejected: usize,
}

/// Closes one grade per CSV row (`student_user_id,assignment_id,final_score,status`).
/// Rows that fail validation or are already closed are counted and skipped;
/// store faults abort the import.
pub async fn import_csv<S, R>(
    service: &RecordService<S>,
    source: R,
) -> Result<ImportSummary, RecordError>
where
    S: RecordStore,
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    let mut summary = ImportSummary::default();

    for (index, result) in reader.deserialize::<RawCloseInput>().enumerate() {
        let line = index + 2;
        let raw = match result {
            Ok(raw) => normalize(raw),
            Err(err) => {
                warn!(line, error = %err, "skipping unreadable row");
                summary.rejected += 1;
                continue;
            }
        };

        let input = match schema::validate_close(raw) {
            Ok(input) => input,
            Err(errors) => {
                warn!(line, %errors, "skipping invalid row");
                summary.rejected += 1;
                continue;
            }
        };

        match service.close_record(input).await {
            Ok(_) => summary.closed += 1,
            Err(err) if err.kind() == ErrorKind::Conflict => {
                warn!(line, "grade already closed, skipping");
                summary.already_closed += 1;
            }
            Err(err) if err.kind() == ErrorKind::Internal => return Err(err),
            Err(err) => {
                warn!(line, error = %err, "skipping rejected row");
                summary.rejected += 1;
            }
        }
    }

    Ok(summary)
}

fn normalize(mut raw: RawCloseInput) -> RawCloseInput {
    raw.status = raw.status.filter(|status| !status.is_empty());
    raw
}
