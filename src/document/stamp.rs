use super::error::{DocumentError, Result};
use super::CLOSING_MARKER;
use bon::Builder;
use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

pub const ISOLATED_TIME_KEY: &str = "isolated.time";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Labeled timestamp appended to the configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Builder)]
pub struct AuditRecord {
    #[builder(default = ISOLATED_TIME_KEY.to_string(), into)]
    pub key: String,
    #[builder(into)]
    pub timestamp: String,
}

impl AuditRecord {
    /// Record for an isolation happening now, in local time
    pub fn now() -> Self {
        Self::at(&Local::now())
    }

    pub fn at<Tz: TimeZone>(time: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self::builder()
            .timestamp(time.format(TIMESTAMP_FORMAT).to_string())
            .build()
    }

    /// Same timestamp under a different label key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    fn render(&self) -> String {
        format!(
            "\n<labels>\n  <label key=\"{}\">{}</label>\n</labels>\n",
            self.key, self.timestamp
        )
    }
}

/// Insert the audit block right before the closing root marker.
///
/// Everything outside the insertion point is left byte-identical.
pub fn stamp(document: &str, record: &AuditRecord) -> Result<String> {
    let count = document.matches(CLOSING_MARKER).count();
    if count > 1 {
        return Err(DocumentError::MarkerNotUnique {
            marker: CLOSING_MARKER.to_string(),
            count,
        });
    }

    let insertion_point = document
        .find(CLOSING_MARKER)
        .ok_or_else(|| DocumentError::MarkerNotFound {
            marker: CLOSING_MARKER.to_string(),
        })?;

    let block = record.render();
    let mut stamped = String::with_capacity(document.len() + block.len());
    stamped.push_str(&document[..insertion_point]);
    stamped.push_str(&block);
    stamped.push_str(&document[insertion_point..]);

    Ok(stamped)
}

/// Replace `path` with `contents` without ever exposing a partially written file.
///
/// The data is written and synced to a temporary file in the same directory,
/// which is then renamed over the target.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| DocumentError::write(path, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| DocumentError::write(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| DocumentError::write(path, e))?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), metadata.permissions())
            .map_err(|e| DocumentError::write(path, e))?;
        preserve_owner(&tmp, &metadata, path);
    }

    tmp.persist(path)
        .map_err(|e| DocumentError::write(path, e.error))?;
    debug!("Replaced {} atomically", path.display());

    Ok(())
}

#[cfg(unix)]
fn preserve_owner(tmp: &NamedTempFile, metadata: &fs::Metadata, path: &Path) {
    use std::os::unix::fs::{fchown, MetadataExt};

    if let Err(e) = fchown(tmp.as_file(), Some(metadata.uid()), Some(metadata.gid())) {
        warn!(
            "Could not keep owner {}:{} of {}: {}",
            metadata.uid(),
            metadata.gid(),
            path.display(),
            e
        );
    }
}

#[cfg(not(unix))]
fn preserve_owner(_tmp: &NamedTempFile, _metadata: &fs::Metadata, _path: &Path) {}
