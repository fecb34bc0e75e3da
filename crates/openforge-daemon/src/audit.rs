use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use openforge_core::audit::AuditEvent;

const AUDIT_FILE: &str = "audit.ndjson";

/// Append-only NDJSON audit log, one event per line, fsynced per record.
///
/// The log is advisory: operations that already persisted their state do
/// not fail because the audit append failed; the failure is surfaced in
/// the service log instead.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(AUDIT_FILE),
        }
    }

    pub fn append(&self, event: &AuditEvent) {
        if let Err(err) = self.append_inner(event) {
            tracing::warn!(
                error = %err,
                event_type = %event.event_type,
                "audit append failed"
            );
        }
    }

    fn append_inner(&self, event: &AuditEvent) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        serde_json::to_writer(&mut file, event)?;
        file.write_all(b"\n")?;
        file.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn events_append_as_one_json_line_each() {
        let dir = TempDir::new().expect("tmp");
        let log = AuditLog::open(dir.path());

        log.append(&AuditEvent::gate_token_issued("p1", "OF-2026-A7F3", 42));
        log.append(&AuditEvent::gate_token_revoked("admin", "p1", 50, 50));

        let raw = std::fs::read_to_string(dir.path().join(AUDIT_FILE)).expect("log");
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AuditEvent = serde_json::from_str(lines[0]).expect("event json");
        assert_eq!(first.event_type, "gate_token_issued");
        assert_eq!(first.target_id, "OF-2026-A7F3");

        let second: AuditEvent = serde_json::from_str(lines[1]).expect("event json");
        assert_eq!(second.event_type, "gate_token_revoked");
        assert_eq!(second.metadata["token_floor_ms"], 50);
    }
}
