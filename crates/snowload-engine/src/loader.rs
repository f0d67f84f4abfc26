//! Chunked bulk load into a provisioned table

use std::ops::Range;

use snowload_core::{
    normalize_identifier, Dataset, LoadResult, Row, TableIdentifier, DEFAULT_CHUNK_SIZE,
    DEFAULT_MAX_STATEMENT_BYTES,
};
use snowload_warehouse::{literal, DriverError, Statement};
use tracing::{debug, error, info, warn};

use crate::connection::Session;
use crate::error::IngestError;

/// Writes datasets with multi-row `INSERT` statements
#[derive(Debug, Clone, Copy)]
pub struct BulkLoader {
    chunk_size: usize,
    max_statement_bytes: usize,
}

impl Default for BulkLoader {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_statement_bytes: DEFAULT_MAX_STATEMENT_BYTES,
        }
    }
}

impl BulkLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum rows per `INSERT`; zero is treated as one
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Set the maximum SQL length per `INSERT`
    ///
    /// A chunk closes early once its next row would push the statement past this
    /// length. A single row longer than the limit is still sent, alone.
    pub fn with_max_statement_bytes(mut self, max_statement_bytes: usize) -> Self {
        self.max_statement_bytes = max_statement_bytes;
        self
    }

    pub fn max_statement_bytes(&self) -> usize {
        self.max_statement_bytes
    }

    /// Row ranges for each `INSERT`, given the length of the statement before `VALUES` rows
    fn plan_chunks(&self, header_len: usize, rows: &[Row]) -> Vec<Range<usize>> {
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut len = header_len;

        for (i, row) in rows.iter().enumerate() {
            let width = row_width(row);
            if i > start && (i - start == self.chunk_size || len + 2 + width > self.max_statement_bytes) {
                chunks.push(start..i);
                start = i;
                len = header_len;
            }
            len += if i > start { 2 + width } else { width };
        }

        if start < rows.len() {
            chunks.push(start..rows.len());
        }
        chunks
    }

    /// Load `dataset` into `target`
    ///
    /// With `overwrite`, the table is truncated first. A statement the warehouse
    /// rejects, or an insert that reports fewer rows than it was sent, stops the load
    /// and yields `succeeded == false`. Errors that leave the outcome unknown
    /// (connection loss, a closed session, an unreadable response) are returned as
    /// [`IngestError::Load`].
    pub async fn load(
        &self,
        session: &Session,
        dataset: &Dataset,
        target: &TableIdentifier,
        overwrite: bool,
    ) -> Result<LoadResult, IngestError> {
        let fqn = target.fqn();

        let table = match target.normalized() {
            Ok(table) => table,
            Err(e) => {
                warn!(table = %fqn, error = %e, "Invalid load target");
                return Ok(LoadResult::failed(fqn, 0, 0, e.to_string()));
            }
        };
        let fqn = table.fqn();

        let columns = match dataset
            .columns()
            .iter()
            .map(|c| normalize_identifier(c))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(columns) => columns,
            Err(e) => {
                warn!(table = %fqn, error = %e, "Invalid dataset column label");
                return Ok(LoadResult::failed(fqn, 0, 0, e.to_string()));
            }
        };

        let unknown = |source: DriverError| {
            error!(table = %fqn, error = %source, "Load outcome unknown");
            IngestError::Load {
                target: fqn.clone(),
                source,
            }
        };

        if overwrite {
            match session.execute(&Statement::TruncateTable { table: &table }).await {
                Ok(_) => debug!(table = %fqn, "Existing rows cleared"),
                Err(e) if e.is_rejection() => {
                    error!(table = %fqn, error = %e, "Truncate rejected");
                    return Ok(LoadResult::failed(fqn, 0, 0, e.to_string()));
                }
                Err(e) => return Err(unknown(e)),
            }
        }

        let mut rows_written: u64 = 0;
        let mut chunk_count = 0;

        let header_len = Statement::Insert {
            table: &table,
            columns: &columns,
            rows: &[],
        }
        .to_sql()
        .len();

        for range in self.plan_chunks(header_len, dataset.rows()) {
            let chunk = &dataset.rows()[range];
            chunk_count += 1;
            let statement = Statement::Insert {
                table: &table,
                columns: &columns,
                rows: chunk,
            };

            let written = match session.execute(&statement).await {
                Ok(outcome) => outcome.rows_affected.ok_or_else(|| {
                    unknown(DriverError::InvalidResponse("INSERT returned no row count".to_string()))
                })?,
                Err(e) if e.is_rejection() => {
                    error!(table = %fqn, chunk = chunk_count, error = %e, "Chunk rejected");
                    return Ok(LoadResult::failed(fqn, rows_written, chunk_count, e.to_string()));
                }
                Err(e) => return Err(unknown(e)),
            };

            rows_written += written;

            let sent = chunk.len() as u64;
            if written < sent {
                let message = format!("chunk {} wrote {} of {} rows", chunk_count, written, sent);
                error!(table = %fqn, chunk = chunk_count, written, sent, "Short write");
                return Ok(LoadResult::failed(fqn, rows_written, chunk_count, message));
            }

            debug!(table = %fqn, chunk = chunk_count, rows = written, "Chunk written");
        }

        info!(table = %fqn, rows = rows_written, chunks = chunk_count, "Data load completed successfully");
        Ok(LoadResult::success(fqn, rows_written, chunk_count))
    }
}

/// Rendered length of `(v1, v2, ...)`
fn row_width(row: &Row) -> usize {
    let literals: usize = row.iter().map(|v| literal(v).len()).sum();
    literals + 2 * row.len().saturating_sub(1) + 2
}
