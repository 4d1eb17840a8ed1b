//! Serial execution of DDL statements.

use crate::client::DatabaseClient;
use crate::context::SharedContext;
use crate::stats::ImportStats;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Executes statements one at a time, in the order received.
///
/// Failures are logged and the statement is dropped; nothing is retried.
pub struct CommandExecutor {
    client: Arc<dyn DatabaseClient>,
    context: SharedContext,
    stats: Arc<ImportStats>,
}

impl CommandExecutor {
    pub fn new(
        client: Arc<dyn DatabaseClient>,
        context: SharedContext,
        stats: Arc<ImportStats>,
    ) -> Self {
        Self {
            client,
            context,
            stats,
        }
    }

    /// Run until `shutdown` is cancelled or the channel closes.
    ///
    /// Statements already handed over are executed before returning.
    pub async fn run(self, mut commands: mpsc::Receiver<String>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(statement) => self.execute(&statement).await,
                    None => break,
                },
                _ = shutdown.cancelled() => {
                    // A send can land between the `recv` poll and this branch
                    while let Ok(statement) = commands.try_recv() {
                        self.execute(&statement).await;
                    }
                    break;
                }
            }
        }
        debug!("Command executor stopped");
    }

    async fn execute(&self, statement: &str) {
        self.stats.record_command();

        let database = self.context.read().database.clone();
        match self.client.execute_statement(statement, &database).await {
            Ok(response) => {
                if let Some(e) = response.error() {
                    error!(statement, "error: {}", e);
                }
            }
            Err(e) => error!(statement, "error: {}", e),
        }
    }
}
