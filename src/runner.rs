//! Orchestrates one profiled run end to end.

use std::path::Path;

use crate::{
    execute_statement, HotstepError, HotstepResult, LogWriter, SortKey, Statement, Statistics,
    TempLog,
};

/// Run `statement` under the profiler and report or persist the statistics.
///
/// A temp log backs the session and is deleted on every exit path. The
/// statement runs exactly once; an `exit` step is treated as normal
/// completion, every other failure propagates. With `outfile` the statistics
/// dump is written there, otherwise a formatted report goes to stdout. The
/// loaded statistics are returned either way.
pub fn run(
    statement: &Statement,
    outfile: Option<&Path>,
    sort: SortKey,
    seed: u64,
    limit: usize,
) -> HotstepResult<Statistics> {
    let temp = TempLog::new()?;
    let mut writer = LogWriter::create(temp.path(), statement, seed)?;

    match execute_statement(statement, &mut writer, seed) {
        Ok(()) => {}
        Err(HotstepError::EarlyExit { code }) => {
            tracing::debug!("script requested exit with code {code}; continuing to statistics");
        }
        Err(err) => return Err(err),
    }
    writer.close()?;

    let mut stats = Statistics::load(temp.path())?;
    stats.strip_dirs();
    stats.sort_by(sort);

    match outfile {
        Some(path) => stats.dump(path)?,
        None => stats.print(&mut std::io::stdout().lock(), limit)?,
    }
    Ok(stats)
}
