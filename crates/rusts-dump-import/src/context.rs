//! Target database and retention policy selected by dump directives.

use parking_lot::RwLock;
use std::sync::Arc;

/// Database context shared between the scanner (writer) and the workers (readers)
pub type SharedContext = Arc<RwLock<DatabaseContext>>;

/// Target of statements and writes.
///
/// An empty string means "use the server default".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseContext {
    pub database: String,
    pub retention_policy: String,
}

impl DatabaseContext {
    /// Create a context wrapped for sharing across tasks
    pub fn shared() -> SharedContext {
        Arc::new(RwLock::new(Self::default()))
    }
}
