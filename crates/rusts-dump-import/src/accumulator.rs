//! Batching of data lines into write requests.

use crate::client::DatabaseClient;
use crate::config::{Precision, WriteConsistency, DEFAULT_BATCH_SIZE};
use crate::context::SharedContext;
use crate::stats::ImportStats;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Parameters applied to every write
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    pub batch_size: usize,
    pub precision: Option<Precision>,
    pub consistency: Option<WriteConsistency>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            precision: None,
            consistency: None,
        }
    }
}

/// Collects data lines and writes them every `batch_size` lines.
///
/// Each full batch gets exactly one write attempt. The partial batch left
/// at shutdown is counted as inserted but is not written.
pub struct BatchAccumulator {
    client: Arc<dyn DatabaseClient>,
    context: SharedContext,
    stats: Arc<ImportStats>,
    options: WriteOptions,
    batch: Vec<String>,
}

impl BatchAccumulator {
    pub fn new(
        client: Arc<dyn DatabaseClient>,
        context: SharedContext,
        stats: Arc<ImportStats>,
        options: WriteOptions,
    ) -> Self {
        let batch_size = options.batch_size.max(1);
        Self {
            client,
            context,
            stats,
            options: WriteOptions { batch_size, ..options },
            batch: Vec::with_capacity(batch_size),
        }
    }

    /// Run until `shutdown` is cancelled or the channel closes.
    pub async fn run(mut self, mut lines: mpsc::Receiver<String>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                line = lines.recv() => match line {
                    Some(line) => self.push(line).await,
                    None => break,
                },
                _ = shutdown.cancelled() => {
                    // A send can land between the `recv` poll and this branch
                    while let Ok(line) = lines.try_recv() {
                        self.push(line).await;
                    }
                    break;
                }
            }
        }
        self.finish();
    }

    async fn push(&mut self, line: String) {
        self.batch.push(line);
        if self.batch.len() >= self.options.batch_size {
            self.flush().await;
        }
    }

    async fn flush(&mut self) {
        let count = self.batch.len() as u64;
        let body = self.batch.join("\n");
        let (database, retention_policy) = {
            let context = self.context.read();
            (context.database.clone(), context.retention_policy.clone())
        };

        match self
            .client
            .write_batch(
                &body,
                &database,
                &retention_policy,
                self.options.precision,
                self.options.consistency,
            )
            .await
        {
            Ok(()) => {
                debug!(lines = count, database = %database, "Batch written");
                self.stats.record_batch_written(count);
            }
            Err(e) => {
                error!(lines = count, database = %database, "error writing batch: {}", e);
                self.stats.record_batch_failed(count);
            }
        }
        self.batch.clear();
    }

    fn finish(&mut self) {
        let remaining = self.batch.len() as u64;
        if remaining > 0 {
            warn!(lines = remaining, "Final partial batch counted as inserted but not written");
        }
        self.stats.record_batch_unwritten(remaining);
        self.batch.clear();
        debug!("Batch accumulator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use crate::context::DatabaseContext;
    use std::sync::atomic::Ordering;

    async fn run_lines(
        client: Arc<MockClient>,
        count: usize,
        batch_size: usize,
    ) -> Arc<ImportStats> {
        let stats = Arc::new(ImportStats::new());
        let (tx, rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();
        let options = WriteOptions {
            batch_size,
            ..Default::default()
        };

        let accumulator =
            BatchAccumulator::new(client, DatabaseContext::shared(), stats.clone(), options);
        let handle = tokio::spawn(accumulator.run(rx, shutdown.clone()));

        for i in 0..count {
            tx.send(format!("cpu value={} {}", i, i)).await.unwrap();
        }
        shutdown.cancel();
        handle.await.unwrap();
        stats
    }

    #[tokio::test]
    async fn test_full_batches_and_remainder() {
        let client = Arc::new(MockClient::default());
        let stats = run_lines(client.clone(), 23, 10).await;

        let writes = client.writes.lock();
        assert_eq!(writes.len(), 2);
        assert!(writes.iter().all(|w| w.lines == 10));
        assert_eq!(stats.total_inserts.load(Ordering::Relaxed), 23);
        assert_eq!(stats.unwritten_inserts.load(Ordering::Relaxed), 3);
        assert_eq!(stats.failed_inserts.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_exact_threshold() {
        let client = Arc::new(MockClient::default());
        let stats = run_lines(client.clone(), 10, 10).await;

        assert_eq!(client.writes.lock().len(), 1);
        assert_eq!(stats.total_inserts.load(Ordering::Relaxed), 10);
        assert_eq!(stats.unwritten_inserts.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_next() {
        let mut client = MockClient::default();
        client.failing_writes.insert(0);
        let client = Arc::new(client);
        let stats = run_lines(client.clone(), 20, 10).await;

        assert_eq!(client.writes.lock().len(), 2);
        assert_eq!(stats.failed_inserts.load(Ordering::Relaxed), 10);
        assert_eq!(stats.total_inserts.load(Ordering::Relaxed), 10);
    }

    #[tokio::test]
    async fn test_queued_lines_counted_after_cancel() {
        let client = Arc::new(MockClient::default());
        let stats = Arc::new(ImportStats::new());
        let (tx, rx) = mpsc::channel(4);
        let shutdown = CancellationToken::new();
        let options = WriteOptions {
            batch_size: 2,
            ..Default::default()
        };

        for i in 0..3 {
            tx.send(format!("cpu v={} {}", i, i)).await.unwrap();
        }
        shutdown.cancel();

        let context = DatabaseContext::shared();
        let accumulator = BatchAccumulator::new(client.clone(), context, stats.clone(), options);
        accumulator.run(rx, shutdown).await;

        assert_eq!(client.writes.lock().len(), 1);
        assert_eq!(stats.total_inserts.load(Ordering::Relaxed), 3);
        assert_eq!(stats.unwritten_inserts.load(Ordering::Relaxed), 1);
        drop(tx);
    }

    #[tokio::test]
    async fn test_no_lines() {
        let client = Arc::new(MockClient::default());
        let stats = run_lines(client.clone(), 0, 10).await;

        assert!(client.writes.lock().is_empty());
        assert_eq!(stats.total_inserts.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_writes_to_current_context() {
        let client = Arc::new(MockClient::default());
        let stats = Arc::new(ImportStats::new());
        let context = DatabaseContext::shared();
        {
            let mut ctx = context.write();
            ctx.database = "telegraf".to_string();
            ctx.retention_policy = "autogen".to_string();
        }
        let (tx, rx) = mpsc::channel(1);
        let options = WriteOptions {
            batch_size: 2,
            ..Default::default()
        };

        let accumulator = BatchAccumulator::new(client.clone(), context, stats, options);
        let handle = tokio::spawn(accumulator.run(rx, CancellationToken::new()));
        tx.send("cpu v=1 1".to_string()).await.unwrap();
        tx.send("cpu v=2 2".to_string()).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        let writes = client.writes.lock();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].database, "telegraf");
        assert_eq!(writes[0].retention_policy, "autogen");
    }
}
