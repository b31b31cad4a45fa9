//! Raw profile log format and the temp file that backs it.

use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::{HotstepError, HotstepResult, Statement};

pub const LOG_FORMAT: &str = "hotstep-log";
pub const LOG_VERSION: u32 = 1;

/// Raw, temp-file-backed record of one profiling session: run metadata plus
/// one event per executed step. Written at session close, read once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileLog {
    pub format: String,
    pub version: u32,
    pub engine_version: String,
    pub run_id: String,
    pub seed: u64,
    pub script: String,
    pub args: Vec<String>,
    pub created: String,
    pub events: Vec<LogEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub seq: usize,
    pub symbol: String,
    pub time_virtual_ms: u64,
    pub dur_nanos: u64,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ProfileLog {
    fn new(statement: &Statement, seed: u64) -> HotstepResult<Self> {
        Ok(Self {
            format: LOG_FORMAT.to_string(),
            version: LOG_VERSION,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_id: Uuid::new_v4().to_string(),
            seed,
            script: statement.script().display().to_string(),
            args: statement.args().to_vec(),
            created: time::OffsetDateTime::now_utc().format(&Rfc3339)?,
            events: Vec::new(),
        })
    }

    pub fn write_json(&self, path: &Path) -> HotstepResult<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> HotstepResult<Self> {
        let bytes = std::fs::read(path)?;
        let log: ProfileLog = serde_json::from_slice(&bytes)?;
        if log.format != LOG_FORMAT || log.version != LOG_VERSION {
            return Err(HotstepError::Log(format!(
                "unrecognized log header {}/{} in {}",
                log.format,
                log.version,
                path.display()
            )));
        }
        Ok(log)
    }
}

/// Profiling session writer bound to the log path it will flush to on close.
#[derive(Debug)]
pub struct LogWriter {
    path: PathBuf,
    log: ProfileLog,
}

impl LogWriter {
    pub fn create(path: &Path, statement: &Statement, seed: u64) -> HotstepResult<Self> {
        Ok(Self { path: path.to_path_buf(), log: ProfileLog::new(statement, seed)? })
    }

    pub fn record(&mut self, event: LogEvent) {
        self.log.events.push(event);
    }

    /// Finalize the session: flush the accumulated log to its path.
    pub fn close(self) -> HotstepResult<()> {
        self.log.write_json(&self.path)
    }
}

/// Uniquely-named temp file in the system temp directory, deleted on drop so
/// the log disappears on every exit path, including failures before the
/// statistics are loaded.
#[derive(Debug)]
pub struct TempLog {
    file: tempfile::NamedTempFile,
}

impl TempLog {
    pub fn new() -> HotstepResult<Self> {
        let file = tempfile::Builder::new().prefix("hotstep-").suffix(".log").tempfile()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
