//! RusTs Dump Import - Load legacy dump files into a time series database
//!
//! A dump is a text file (optionally gzip-compressed) with a DDL section of
//! schema statements followed, after a `# DML` line, by data points in line
//! protocol. `# CONTEXT-DATABASE:` and `# CONTEXT-RETENTION-POLICY:` lines in
//! the DML section choose where subsequent points are written.
//!
//! ## Pipeline
//!
//! - [`Scanner`] reads the file and routes each line
//! - [`CommandExecutor`] runs DDL statements one at a time
//! - [`BatchAccumulator`] groups data lines into write requests
//! - [`Importer`] wires them together and reports the totals
//!
//! ## Usage
//!
//! ```no_run
//! use rusts_dump_import::{ImportConfig, Importer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = ImportConfig::default();
//!     config.connection.url = "http://localhost:8086".to_string();
//!     config.import.path = Some("export.txt.gz".into());
//!     config.import.compressed = true;
//!
//!     let report = Importer::new(config).run().await?;
//!     println!("Imported {} points", report.total_inserts);
//!     Ok(())
//! }
//! ```

pub mod accumulator;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod importer;
pub mod scanner;
pub mod stats;

pub use accumulator::{BatchAccumulator, WriteOptions};
pub use client::{Credentials, DatabaseClient, HttpClient, PingInfo, QueryResponse};
pub use config::{ImportConfig, Precision, WriteConsistency, DEFAULT_BATCH_SIZE};
pub use context::{DatabaseContext, SharedContext};
pub use error::{ImportError, Result};
pub use executor::CommandExecutor;
pub use importer::Importer;
pub use scanner::{ScanSummary, Scanner};
pub use stats::{ImportReport, ImportStats};
