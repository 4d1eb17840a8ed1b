//! Line scanner for the dump format
//!
//! A dump has two sections:
//!
//! ```text
//! CREATE DATABASE telegraf              <- DDL: one statement per line
//! # DML                                 <- section sentinel
//! # CONTEXT-DATABASE: telegraf          <- directive, sets the target database
//! # CONTEXT-RETENTION-POLICY: autogen   <- directive, sets the retention policy
//! cpu,host=a usage=1.5 1609459200000000000
//! ```
//!
//! The scanner reads line by line and hands each line to the executor or the
//! accumulator over a bounded channel, so reading never gets ahead of the
//! slower worker. Directives are only honoured in the DML section.
//!
//! Lines are not validated. Bytes that are not UTF-8 are replaced with
//! U+FFFD and the line is still dispatched; only a failing reader ends the
//! scan early.

use crate::context::SharedContext;
use crate::error::{ImportError, Result};
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Start of the DML section
pub const DML_SENTINEL: &str = "# DML";

/// Sets the target database for subsequent data lines
pub const DATABASE_DIRECTIVE: &str = "# CONTEXT-DATABASE";

/// Sets the target retention policy for subsequent data lines
pub const RETENTION_POLICY_DIRECTIVE: &str = "# CONTEXT-RETENTION-POLICY";

/// What the scanner saw in one pass over a dump
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub lines_read: u64,
    pub statements: u64,
    pub data_lines: u64,
    pub directives: u64,
    pub malformed_directives: u64,
    /// Lines carrying bytes that are not UTF-8
    pub invalid_utf8_lines: u64,
    /// Whether the `# DML` sentinel was found
    pub reached_dml: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectiveKind {
    Database,
    RetentionPolicy,
}

#[derive(Debug, PartialEq, Eq)]
enum Directive<'a> {
    Set(DirectiveKind, &'a str),
    Malformed(DirectiveKind),
}

/// Recognise a context directive. Returns `None` for ordinary comments.
fn parse_directive(line: &str) -> Option<Directive<'_>> {
    let (kind, rest) = if let Some(rest) = line.strip_prefix(RETENTION_POLICY_DIRECTIVE) {
        (DirectiveKind::RetentionPolicy, rest)
    } else if let Some(rest) = line.strip_prefix(DATABASE_DIRECTIVE) {
        (DirectiveKind::Database, rest)
    } else {
        return None;
    };

    match rest.split_once(':') {
        Some((before, value)) if before.trim().is_empty() => {
            Some(Directive::Set(kind, value.trim()))
        }
        // e.g. "# CONTEXT-DATABASES: x" is just a comment
        Some(_) => None,
        None if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
            Some(Directive::Malformed(kind))
        }
        None => None,
    }
}

/// Splits a dump into statements and data lines
pub struct Scanner {
    commands: mpsc::Sender<String>,
    lines: mpsc::Sender<String>,
    context: SharedContext,
    summary: ScanSummary,
    buf: Vec<u8>,
}

impl Scanner {
    pub fn new(
        commands: mpsc::Sender<String>,
        lines: mpsc::Sender<String>,
        context: SharedContext,
    ) -> Self {
        Self {
            commands,
            lines,
            context,
            summary: ScanSummary::default(),
            buf: Vec::new(),
        }
    }

    /// Scan the whole stream.
    ///
    /// Blocks on every hand-off, so this must run on a blocking thread.
    /// Both channels are closed when this returns, successfully or not.
    pub fn scan<R: BufRead>(mut self, mut reader: R) -> Result<ScanSummary> {
        self.scan_ddl(&mut reader)?;
        self.scan_dml(&mut reader)?;
        Ok(self.summary)
    }

    /// Next line without its `\n` or `\r\n` terminator
    fn next_line<R: BufRead>(&mut self, reader: &mut R) -> Result<Option<String>> {
        self.buf.clear();
        if reader.read_until(b'\n', &mut self.buf).map_err(ImportError::Scan)? == 0 {
            return Ok(None);
        }
        self.summary.lines_read += 1;

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        let line = match std::str::from_utf8(&self.buf) {
            Ok(line) => line.to_string(),
            Err(e) => {
                warn!(
                    line = self.summary.lines_read,
                    offset = e.valid_up_to(),
                    "Line is not valid UTF-8, replacing invalid bytes"
                );
                self.summary.invalid_utf8_lines += 1;
                String::from_utf8_lossy(&self.buf).into_owned()
            }
        };
        Ok(Some(line))
    }

    fn scan_ddl<R: BufRead>(&mut self, reader: &mut R) -> Result<()> {
        while let Some(line) = self.next_line(reader)? {
            if line.starts_with(DML_SENTINEL) {
                debug!("DML section starts at line {}", self.summary.lines_read);
                self.summary.reached_dml = true;
                return Ok(());
            }
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            self.commands
                .blocking_send(line)
                .map_err(|_| ImportError::WorkerGone("command executor"))?;
            self.summary.statements += 1;
        }
        Ok(())
    }

    fn scan_dml<R: BufRead>(&mut self, reader: &mut R) -> Result<()> {
        while let Some(line) = self.next_line(reader)? {
            if line.starts_with('#') {
                self.apply_directive(&line);
                continue;
            }
            self.lines
                .blocking_send(line)
                .map_err(|_| ImportError::WorkerGone("batch accumulator"))?;
            self.summary.data_lines += 1;
        }
        Ok(())
    }

    fn apply_directive(&mut self, line: &str) {
        match parse_directive(line) {
            Some(Directive::Set(kind, value)) => {
                let mut context = self.context.write();
                match kind {
                    DirectiveKind::Database => {
                        info!("Switching to database '{}'", value);
                        context.database = value.to_string();
                    }
                    DirectiveKind::RetentionPolicy => {
                        info!("Switching to retention policy '{}'", value);
                        context.retention_policy = value.to_string();
                    }
                }
                self.summary.directives += 1;
            }
            Some(Directive::Malformed(_)) => {
                warn!(line = self.summary.lines_read, "Ignoring malformed directive: {}", line);
                self.summary.malformed_directives += 1;
            }
            None => {}
        }
    }
}
