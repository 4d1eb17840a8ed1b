//! Import coordinator
//!
//! Owns one import from start to finish:
//! - validating the configuration and connecting to the server
//! - opening (and optionally decompressing) the dump
//! - running the command executor and batch accumulator as tasks
//! - driving the scanner on a blocking thread
//! - signalling shutdown, joining the workers and reporting

use crate::accumulator::{BatchAccumulator, WriteOptions};
use crate::client::{Credentials, DatabaseClient, HttpClient};
use crate::config::ImportConfig;
use crate::context::DatabaseContext;
use crate::error::{ImportError, Result};
use crate::executor::CommandExecutor;
use crate::scanner::Scanner;
use crate::stats::{ImportReport, ImportStats};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Hand-off depth between the scanner and each worker
const CHANNEL_CAPACITY: usize = 1;

/// Imports a dump file into a database
pub struct Importer {
    config: ImportConfig,
    client: Option<Arc<dyn DatabaseClient>>,
}

impl Importer {
    /// Create an importer that connects over HTTP using `config.connection`
    pub fn new(config: ImportConfig) -> Self {
        Self { config, client: None }
    }

    /// Create an importer that uses an existing client
    pub fn with_client(config: ImportConfig, client: Arc<dyn DatabaseClient>) -> Self {
        Self {
            config,
            client: Some(client),
        }
    }

    /// Run the import to completion.
    ///
    /// Per-statement and per-batch failures are logged and counted; only
    /// setup failures and read errors are returned.
    pub async fn run(self) -> Result<ImportReport> {
        let start = Instant::now();
        let config = self.config;

        let path = config.import.path.clone().ok_or(ImportError::MissingFile)?;
        config.validate()?;

        let client = match self.client {
            Some(client) => client,
            None => Arc::new(HttpClient::connect(
                &config.connection.url,
                Credentials {
                    username: config.connection.username.clone(),
                    password: config.connection.password.clone(),
                },
                &config.connection.version,
                config.timeout(),
            )?),
        };

        let ping = client.ping().await.map_err(|e| ImportError::Unreachable {
            url: config.connection.url.clone(),
            reason: e.to_string(),
        })?;
        info!(
            "Connected to {} version {} ({:?})",
            config.connection.url,
            ping.version.as_deref().unwrap_or("unknown"),
            ping.latency
        );

        let reader = open_source(&path, config.import.compressed)?;
        info!("Importing {}", path.display());

        let options = WriteOptions {
            batch_size: config.import.batch_size,
            precision: config.precision()?,
            consistency: config.consistency()?,
        };

        import(reader, client, options, start).await
    }
}

/// Run the scanner and both workers over `reader`, then report.
///
/// The workers are always joined, so a read error is returned only after
/// everything handed over has been processed.
async fn import(
    reader: Box<dyn BufRead + Send>,
    client: Arc<dyn DatabaseClient>,
    options: WriteOptions,
    start: Instant,
) -> Result<ImportReport> {
    let context = DatabaseContext::shared();
    let stats = Arc::new(ImportStats::new());
    let shutdown = CancellationToken::new();
    let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (line_tx, line_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let executor = tokio::spawn(
        CommandExecutor::new(Arc::clone(&client), Arc::clone(&context), Arc::clone(&stats))
            .run(command_rx, shutdown.clone()),
    );
    let accumulator = tokio::spawn(
        BatchAccumulator::new(
            Arc::clone(&client),
            Arc::clone(&context),
            Arc::clone(&stats),
            options,
        )
        .run(line_rx, shutdown.clone()),
    );

    let scanner = Scanner::new(command_tx, line_tx, context);
    let scanned = tokio::task::spawn_blocking(move || scanner.scan(reader)).await;

    shutdown.cancel();
    let executor_done = executor.await;
    let accumulator_done = accumulator.await;
    executor_done?;
    accumulator_done?;

    let scanned = scanned.map_err(ImportError::from).and_then(|result| result);
    let report = stats.report(scanned.as_ref().copied().unwrap_or_default(), start.elapsed());

    if let Some(lines) = report.summary_lines() {
        for line in lines {
            info!("{}", line);
        }
    }
    debug!(
        unwritten = report.unwritten_inserts,
        elapsed = ?report.elapsed,
        "Import finished"
    );

    scanned.map(|_| report)
}

/// Open the dump, wrapping it in a gzip decoder when `compressed`.
///
/// The gzip header is read here so a corrupt file fails before any worker
/// is started.
fn open_source(path: &Path, compressed: bool) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    if compressed {
        let mut reader = BufReader::new(MultiGzDecoder::new(file));
        reader.fill_buf().map_err(ImportError::Decompress)?;
        Ok(Box::new(reader))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
