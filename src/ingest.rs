//! Replaces the attendance table with the contents of an uploaded `DATA.TXT`.
//!
//! The whole upload is one store batch: the table is cleared, every line is
//! validated and inserted, and the batch is committed only if the last line
//! went through. Any failure rolls the batch back, so the previous snapshot
//! survives untouched.

use std::io;

use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::model::attendance::NewAttendance;
use crate::store::{AttendanceBatch, AttendanceStore, StoreError};
use crate::validation::line::{LineError, validate_line};

pub const ALLOWED_FILENAME: &str = "DATA.TXT";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("No file was provided")]
    MissingFile,

    #[error("The file name must be exactly \"{}\", got {:?}", ALLOWED_FILENAME, .0)]
    InvalidFilename(String),

    #[error(transparent)]
    Line(#[from] LineError),

    #[error("Line {line} is not valid UTF-8 text")]
    Decode { line: usize },

    #[error("The file exceeds the {limit} byte upload limit")]
    TooLarge { limit: usize },

    #[error("Failed to read the uploaded file")]
    Read(#[source] io::Error),

    #[error("Failed to store attendance records")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub records_processed: usize,
}

impl IngestSummary {
    pub fn message(&self) -> String {
        format!(
            "File processed successfully. {} records imported.",
            self.records_processed
        )
    }
}

/// Rejects uploads that are not named `DATA.TXT` (any casing).
pub fn check_filename(file_name: &str) -> Result<(), IngestionError> {
    if file_name.trim().is_empty() {
        return Err(IngestionError::MissingFile);
    }
    if file_name.to_uppercase() != ALLOWED_FILENAME {
        return Err(IngestionError::InvalidFilename(file_name.to_string()));
    }
    Ok(())
}

/// Streams `content` into `store`, replacing whatever it held before.
pub async fn ingest<S, B>(
    store: &dyn AttendanceStore,
    file_name: &str,
    content: S,
    max_bytes: usize,
) -> Result<IngestSummary, IngestionError>
where
    S: Stream<Item = Result<B, io::Error>> + Unpin,
    B: AsRef<[u8]>,
{
    check_filename(file_name)?;

    let mut batch = store.begin().await?;

    match load(batch.as_mut(), content, max_bytes).await {
        Ok(summary) => {
            batch.commit().await?;
            info!(records = summary.records_processed, "Attendance file ingested");
            Ok(summary)
        }
        Err(e) => {
            if let Err(rollback_err) = batch.rollback().await {
                error!(error = %rollback_err, "Rollback of attendance upload failed");
            }
            match &e {
                IngestionError::Read(cause) => error!(error = %cause, "Upload stream failed"),
                IngestionError::Store(cause) => error!(error = %cause, "Attendance store failed"),
                IngestionError::Line(line_err) => {
                    warn!(line = line_err.line(), error = %line_err, "Attendance file rejected")
                }
                other => warn!(error = %other, "Attendance file rejected"),
            }
            Err(e)
        }
    }
}

async fn load<S, B>(
    batch: &mut dyn AttendanceBatch,
    mut content: S,
    max_bytes: usize,
) -> Result<IngestSummary, IngestionError>
where
    S: Stream<Item = Result<B, io::Error>> + Unpin,
    B: AsRef<[u8]>,
{
    let cleared = batch.delete_all().await?;
    debug!(cleared, "Previous attendance records cleared");

    let mut lines = LineSplitter::default();
    let mut received = 0usize;
    let mut processed = 0usize;

    while let Some(chunk) = content.next().await {
        let chunk = chunk.map_err(IngestionError::Read)?;
        let bytes = chunk.as_ref();

        received += bytes.len();
        if received > max_bytes {
            return Err(IngestionError::TooLarge { limit: max_bytes });
        }

        lines.feed(bytes);
        while let Some((number, raw)) = lines.next_line() {
            processed += store_line(batch, number, &raw).await?;
        }
    }

    if let Some((number, raw)) = lines.finish() {
        processed += store_line(batch, number, &raw).await?;
    }

    Ok(IngestSummary {
        records_processed: processed,
    })
}

/// Returns how many records the line produced: 0 for blank lines, 1 otherwise.
async fn store_line(
    batch: &mut dyn AttendanceBatch,
    number: usize,
    raw: &[u8],
) -> Result<usize, IngestionError> {
    let raw = if number == 1 {
        raw.strip_prefix(UTF8_BOM).unwrap_or(raw)
    } else {
        raw
    };
    let text = std::str::from_utf8(raw).map_err(|_| IngestionError::Decode { line: number })?;

    if text.trim().is_empty() {
        return Ok(0);
    }

    let parsed = validate_line(text, number)?;
    batch.insert(NewAttendance::from(parsed)).await?;
    Ok(1)
}

/// Reassembles lines across chunk boundaries. `\n`, `\r\n` and a bare `\r`
/// all end a line.
#[derive(Default)]
struct LineSplitter {
    pending: Vec<u8>,
    number: usize,
}

impl LineSplitter {
    fn feed(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    fn next_line(&mut self) -> Option<(usize, Vec<u8>)> {
        let end = self.pending.iter().position(|b| *b == b'\n' || *b == b'\r')?;
        let terminator = match (self.pending[end], self.pending.get(end + 1).copied()) {
            (b'\r', Some(b'\n')) => 2,
            // the `\n` of a `\r\n` pair may still be in the next chunk
            (b'\r', None) => return None,
            _ => 1,
        };

        let mut line: Vec<u8> = self.pending.drain(..end + terminator).collect();
        line.truncate(end);
        self.number += 1;
        Some((self.number, line))
    }

    /// The trailing line when the content does not end with a newline.
    fn finish(&mut self) -> Option<(usize, Vec<u8>)> {
        if self.pending.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.pending);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        self.number += 1;
        Some((self.number, line))
    }
}
