//! Append-only audit log of accepted link payloads.

use std::io;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::server::IncomingLinkPayload;

/// One line of the audit log. Records are only ever appended, in arrival
/// order; duplicates are permitted.
#[derive(Debug, Serialize)]
struct AuditRecord<'a> {
    received_at: String,
    payload: &'a IncomingLinkPayload,
}

/// Newline-delimited JSON log, opened in append mode and never truncated.
pub struct AuditLog {
    file: Mutex<File>,
}

impl AuditLog {
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self { file: Mutex::new(file) })
    }

    /// Append one record with the current UTC timestamp. Concurrent appends
    /// are serialized through the file lock; each record is a single write.
    pub async fn append(&self, payload: &IncomingLinkPayload) -> io::Result<()> {
        let record = AuditRecord {
            received_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            payload,
        };
        let mut line = serde_json::to_string(&record).map_err(io::Error::other)?;
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
