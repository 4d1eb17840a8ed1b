//! RusTs Dump Import CLI
//!
//! Imports a legacy DDL/DML dump into a running server.
//!
//! ## Usage
//!
//! ```bash
//! # Import a plain dump (uses rusts-import.yml if present)
//! rusts-dump-import --path export.txt
//!
//! # Import a gzipped dump into a remote server
//! rusts-dump-import --path export.txt.gz --compressed --url http://db:8086 -u admin -p secret
//!
//! # Generate a default config file
//! rusts-dump-import --generate-config
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use rusts_dump_import::config::DEFAULT_CONFIG_FILE;
use rusts_dump_import::{ImportConfig, Importer};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rusts-dump-import")]
#[command(author, version, about = "Import a legacy dump file into a RusTs server")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Dump file to import
    #[arg(long)]
    path: Option<PathBuf>,

    /// The dump file is gzip-compressed
    #[arg(long)]
    compressed: bool,

    /// Server URL
    #[arg(long)]
    url: Option<String>,

    /// Username for authentication
    #[arg(short, long)]
    username: Option<String>,

    /// Password for authentication
    #[arg(short, long)]
    password: Option<String>,

    /// Timestamp precision of the data lines (ns, u, ms, s, m, h)
    #[arg(long)]
    precision: Option<String>,

    /// Write consistency (any, one, quorum, all)
    #[arg(long)]
    consistency: Option<String>,

    /// Protocol version advertised to the server
    #[arg(long = "client-version")]
    client_version: Option<String>,

    /// Data lines per write request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Request timeout in seconds (0 = none)
    #[arg(long)]
    timeout: Option<u64>,

    /// Write the default config to the --config path and exit
    #[arg(long)]
    generate_config: bool,
}

impl Cli {
    /// Apply command line overrides on top of the loaded config
    fn apply(self, config: &mut ImportConfig) {
        if let Some(path) = self.path {
            config.import.path = Some(path);
        }
        if self.compressed {
            config.import.compressed = true;
        }
        if let Some(url) = self.url {
            config.connection.url = url;
        }
        if let Some(username) = self.username {
            config.connection.username = username;
        }
        if let Some(password) = self.password {
            config.connection.password = password;
        }
        if let Some(precision) = self.precision {
            config.import.precision = precision;
        }
        if let Some(consistency) = self.consistency {
            config.import.consistency = consistency;
        }
        if let Some(version) = self.client_version {
            config.connection.version = version;
        }
        if let Some(batch_size) = self.batch_size {
            config.import.batch_size = batch_size;
        }
        if let Some(timeout) = self.timeout {
            config.connection.timeout_secs = timeout;
        }
    }
}

fn load_config(path: &PathBuf) -> ImportConfig {
    if !path.exists() {
        return ImportConfig::default();
    }
    match ImportConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Failed to load {}: {}", path.display(), e);
            eprintln!("Using default configuration");
            ImportConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        ImportConfig::write_default(&cli.config)
            .with_context(|| format!("Failed to write {}", cli.config.display()))?;
        println!("Generated default configuration: {}", cli.config.display());
        return Ok(());
    }

    let mut config = load_config(&cli.config);
    cli.apply(&mut config);

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting rusts-dump-import v{}", env!("CARGO_PKG_VERSION"));

    let report = Importer::new(config).run().await.context("Import failed")?;
    info!(
        "Scanned {} lines ({} statements, {} data lines) in {:.2}s",
        report.scan.lines_read,
        report.scan.statements,
        report.scan.data_lines,
        report.elapsed.as_secs_f64()
    );
    if report.scan.invalid_utf8_lines > 0 {
        warn!(
            "{} lines contained invalid UTF-8 and were imported with replacement characters",
            report.scan.invalid_utf8_lines
        );
    }

    Ok(())
}
