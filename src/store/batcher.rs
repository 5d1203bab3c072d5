use tracing::{debug, info};

use crate::config::BatchConfig;
use crate::error::Result;
use crate::store::BulkSink;

/// Counters of one batched run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// input items reported through `item_done`
    pub processed: usize,
    /// records handed to the sink
    pub records: usize,
    /// bulk writes performed
    pub writes: usize,
    /// progress events emitted
    pub progress_reports: usize,
}

/// Buffered bulk writer.
///
/// Records are pushed one at a time and written to the sink in batches of
/// `batch_size`. Input items (documents, words, topics) are counted
/// separately through `item_done`, since one item may produce many records
/// or none. `finish` writes the remainder.
///
/// A failed write is returned as is: the buffer is not retried and batches
/// already written stay written.
pub struct PersistenceBatcher<'a, R, S>
where
    S: BulkSink<R> + ?Sized,
{
    sink: &'a mut S,
    buffer: Vec<R>,
    batch_size: usize,
    progress_every: usize,
    reset_diagnostics: bool,
    label: &'static str,
    total: usize,
    stats: BatchStats,
}

impl<'a, R, S> PersistenceBatcher<'a, R, S>
where
    S: BulkSink<R> + ?Sized,
{
    /// `total` is only used for progress messages.
    pub fn new(sink: &'a mut S, config: &BatchConfig, label: &'static str, total: usize) -> Self {
        let batch_size = config.batch_size.max(1);
        Self {
            sink,
            buffer: Vec::with_capacity(batch_size),
            batch_size,
            progress_every: config.progress_every.max(1),
            reset_diagnostics: config.reset_diagnostics,
            label,
            total,
            stats: BatchStats::default(),
        }
    }

    /// Buffer one record, writing the buffer out once it is full.
    #[inline]
    pub fn push(&mut self, record: R) -> Result<()> {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    pub fn extend<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
    {
        for record in records {
            self.push(record)?;
        }
        Ok(())
    }

    /// Mark one input item as processed.
    #[inline]
    pub fn item_done(&mut self) {
        self.stats.processed += 1;
        if self.stats.processed % self.progress_every == 0 {
            self.report_progress();
        }
    }

    /// Write whatever is buffered. An empty buffer is a no-op.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
        let len = batch.len();
        self.sink.bulk_insert(batch)?;
        self.stats.records += len;
        self.stats.writes += 1;
        debug!("{}: wrote batch of {} records", self.label, len);

        if self.reset_diagnostics {
            self.sink.release_diagnostics();
        }
        Ok(())
    }

    /// Flush the remainder and return the run counters.
    pub fn finish(mut self) -> Result<BatchStats> {
        let pending = !self.buffer.is_empty();
        self.flush()?;
        if pending && self.stats.processed % self.progress_every != 0 {
            self.report_progress();
        }
        Ok(self.stats)
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    fn report_progress(&mut self) {
        self.stats.progress_reports += 1;
        info!("{}: saved {} / {}", self.label, self.stats.processed, self.total);
    }
}
