//! Newline-delimited JSON event source over any async reader.

use crate::status::ports::{
    Delivery, HealthEventSource, HealthEventSourceError, HealthEventSourceResult,
};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tracing::warn;

/// Longest line accepted by [`JsonLinesSource::new`], newline excluded.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Reads one payload per line. Blank lines are skipped.
///
/// A byte stream has no acknowledgement channel, so deliveries are
/// unacknowledged. A line longer than the limit is discarded up to its
/// newline and surfaces as an empty payload, which fails to parse and is
/// counted as malformed downstream.
#[derive(Debug)]
pub struct JsonLinesSource<R> {
    reader: R,
    buffer: Vec<u8>,
    line_limit: usize,
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Wraps a buffered reader with the [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self::with_line_limit(reader, MAX_LINE_BYTES)
    }

    /// Wraps a buffered reader, accepting lines of at most `line_limit`
    /// bytes.
    #[must_use]
    pub const fn with_line_limit(reader: R, line_limit: usize) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            line_limit,
        }
    }

    async fn discard_rest_of_line(&mut self) -> HealthEventSourceResult<()> {
        loop {
            let available = self
                .reader
                .fill_buf()
                .await
                .map_err(HealthEventSourceError::transport)?;
            if available.is_empty() {
                return Ok(());
            }
            let newline = available.iter().position(|byte| *byte == b'\n');
            let consumed = newline.map_or(available.len(), |end| end + 1);
            self.reader.consume(consumed);
            if newline.is_some() {
                return Ok(());
            }
        }
    }
}

#[async_trait]
impl<R> HealthEventSource for JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_delivery(&mut self) -> HealthEventSourceResult<Option<Delivery>> {
        let read_cap = u64::try_from(self.line_limit)
            .unwrap_or(u64::MAX)
            .saturating_add(1);
        loop {
            self.buffer.clear();
            let read = (&mut self.reader)
                .take(read_cap)
                .read_until(b'\n', &mut self.buffer)
                .await
                .map_err(HealthEventSourceError::transport)?;
            if read == 0 {
                return Ok(None);
            }
            if self.buffer.len() > self.line_limit && self.buffer.last() != Some(&b'\n') {
                self.discard_rest_of_line().await?;
                warn!(
                    line_limit = self.line_limit,
                    "discarding over-long health event line"
                );
                return Ok(Some(Delivery::unacknowledged(Vec::new())));
            }
            let line = self.buffer.trim_ascii();
            if !line.is_empty() {
                return Ok(Some(Delivery::unacknowledged(line.to_vec())));
            }
        }
    }
}
