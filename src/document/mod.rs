mod endpoint;
pub mod error;
mod extract;
mod stamp;
#[cfg(test)]
mod tests;

pub use endpoint::{AddressFamily, Endpoint};
pub use error::DocumentError;
pub use extract::extract;
pub use stamp::{stamp, write_atomic, AuditRecord, ISOLATED_TIME_KEY, TIMESTAMP_FORMAT};

use error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Closing root element; audit records are inserted right before it
pub const CLOSING_MARKER: &str = "</ossec_config>";

/// Agent configuration file, held in memory between reading and write-back
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    path: PathBuf,
    content: String,
}

impl ConfigDocument {
    /// Read the document from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| DocumentError::read(path, e))?;
        debug!("Read {} bytes from {}", content.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn endpoint(&self) -> Result<Endpoint> {
        extract(&self.content)
    }

    /// Insert `record` and persist the result.
    ///
    /// The in-memory content only changes once the write-back succeeded.
    pub fn stamp(&mut self, record: &AuditRecord) -> Result<()> {
        let stamped = stamp(&self.content, record)?;
        write_atomic(&self.path, &stamped)?;
        self.content = stamped;

        info!(
            "Recorded {}={} in {}",
            record.key,
            record.timestamp,
            self.path.display()
        );
        Ok(())
    }
}
