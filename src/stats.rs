//! Loaded statistics: aggregation, sorting, and the two report outputs.

use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use crate::{HotstepResult, ProfileLog};

/// Report sort key. `None` is the no-explicit-resort sentinel: rows keep the
/// order they were first seen in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    None,
    Calls,
    Time,
    Name,
}

impl clap::ValueEnum for SortKey {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::None, Self::Calls, Self::Time, Self::Name]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::None => clap::builder::PossibleValue::new("none"),
            Self::Calls => clap::builder::PossibleValue::new("calls"),
            Self::Time => clap::builder::PossibleValue::new("time"),
            Self::Name => clap::builder::PossibleValue::new("name"),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatRow {
    pub symbol: String,
    pub calls: u64,
    pub total_nanos: u64,
}

/// Aggregated view of one profile log: one row per symbol, plus the run
/// metadata carried over from the log header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub run_id: String,
    pub seed: u64,
    pub script: String,
    pub created: String,
    pub event_count: usize,
    pub total_nanos: u64,
    pub virtual_ms: u64,
    pub rows: Vec<StatRow>,
}

impl Statistics {
    /// Load a raw profile log and aggregate it per symbol, preserving the
    /// first-seen order of symbols.
    pub fn load(path: &Path) -> HotstepResult<Self> {
        let log = ProfileLog::read_json(path)?;
        let mut rows: Vec<StatRow> = Vec::new();
        let mut index = HashMap::<String, usize>::new();
        let mut total_nanos = 0u64;
        let mut virtual_ms = 0u64;
        for event in &log.events {
            total_nanos = total_nanos.saturating_add(event.dur_nanos);
            virtual_ms = virtual_ms.max(event.time_virtual_ms);
            match index.get(&event.symbol) {
                Some(&i) => {
                    rows[i].calls = rows[i].calls.saturating_add(1);
                    rows[i].total_nanos = rows[i].total_nanos.saturating_add(event.dur_nanos);
                }
                None => {
                    index.insert(event.symbol.clone(), rows.len());
                    rows.push(StatRow {
                        symbol: event.symbol.clone(),
                        calls: 1,
                        total_nanos: event.dur_nanos,
                    });
                }
            }
        }
        Ok(Self {
            run_id: log.run_id,
            seed: log.seed,
            script: log.script,
            created: log.created,
            event_count: log.events.len(),
            total_nanos,
            virtual_ms,
            rows,
        })
    }

    /// Strip directory prefixes from symbol names, merging rows whose symbols
    /// collide after stripping.
    pub fn strip_dirs(&mut self) {
        let mut rows: Vec<StatRow> = Vec::new();
        let mut index = HashMap::<String, usize>::new();
        for row in self.rows.drain(..) {
            let symbol = strip_symbol_dirs(&row.symbol);
            match index.get(&symbol) {
                Some(&i) => {
                    rows[i].calls = rows[i].calls.saturating_add(row.calls);
                    rows[i].total_nanos = rows[i].total_nanos.saturating_add(row.total_nanos);
                }
                None => {
                    index.insert(symbol.clone(), rows.len());
                    rows.push(StatRow { symbol, ..row });
                }
            }
        }
        self.rows = rows;
    }

    /// Sort rows by `key`. Ties break on the symbol name so a given key always
    /// yields the same ordering for the same set of symbols.
    pub fn sort_by(&mut self, key: SortKey) {
        match key {
            SortKey::None => {}
            SortKey::Calls => self
                .rows
                .sort_by(|a, b| b.calls.cmp(&a.calls).then_with(|| a.symbol.cmp(&b.symbol))),
            SortKey::Time => self.rows.sort_by(|a, b| {
                b.total_nanos.cmp(&a.total_nanos).then_with(|| a.symbol.cmp(&b.symbol))
            }),
            SortKey::Name => self.rows.sort_by(|a, b| a.symbol.cmp(&b.symbol)),
        }
    }

    /// Print the formatted report. `limit` caps the rows shown (0 shows all).
    pub fn print(&self, out: &mut dyn Write, limit: usize) -> HotstepResult<()> {
        writeln!(out, "profile: {}  run {}  seed {}", self.script, self.run_id, self.seed)?;
        writeln!(
            out,
            "{} events in {:.6}s (virtual {}ms)",
            self.event_count,
            self.total_nanos as f64 / 1e9,
            self.virtual_ms
        )?;
        writeln!(out)?;
        writeln!(out, "{:>8}  {:>12}  {:>12}  symbol", "calls", "time", "percall")?;
        let shown = if limit == 0 { self.rows.len() } else { limit.min(self.rows.len()) };
        for row in &self.rows[..shown] {
            let total = row.total_nanos as f64 / 1e9;
            let percall = total / row.calls.max(1) as f64;
            writeln!(out, "{:>8}  {total:>12.6}  {percall:>12.6}  {}", row.calls, row.symbol)?;
        }
        if shown < self.rows.len() {
            writeln!(out, "  ({} more rows not shown)", self.rows.len() - shown)?;
        }
        Ok(())
    }

    /// Serialize the statistics dump to `path`.
    pub fn dump(&self, path: &Path) -> HotstepResult<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

fn strip_symbol_dirs(symbol: &str) -> String {
    let (path_part, label_part) = match symbol.find('(') {
        Some(i) => symbol.split_at(i),
        None => (symbol, ""),
    };
    let stripped = path_part.rsplit(['/', '\\']).next().unwrap_or(path_part);
    format!("{stripped}{label_part}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LogEvent, LogWriter, Statement, TempLog};
    use std::path::PathBuf;

    fn event(seq: usize, symbol: &str, dur_nanos: u64) -> LogEvent {
        LogEvent {
            seq,
            symbol: symbol.to_string(),
            time_virtual_ms: 0,
            dur_nanos,
            fields: serde_json::Map::new(),
        }
    }

    fn stats_from(events: Vec<LogEvent>) -> Statistics {
        let temp = TempLog::new().unwrap();
        let statement = Statement::new(PathBuf::from("demo/script.json"), vec![]);
        let mut writer = LogWriter::create(temp.path(), &statement, 9).unwrap();
        for e in events {
            writer.record(e);
        }
        writer.close().unwrap();
        Statistics::load(temp.path()).unwrap()
    }

    #[test]
    fn aggregates_repeated_symbols() {
        let stats = stats_from(vec![
            event(0, "demo/script.json(setup)", 100),
            event(1, "demo/script.json(work)", 50),
            event(2, "demo/script.json(setup)", 300),
        ]);
        assert_eq!(stats.event_count, 3);
        assert_eq!(stats.total_nanos, 450);
        assert_eq!(stats.rows.len(), 2);
        assert_eq!(stats.rows[0].symbol, "demo/script.json(setup)");
        assert_eq!(stats.rows[0].calls, 2);
        assert_eq!(stats.rows[0].total_nanos, 400);
    }

    #[test]
    fn strip_dirs_removes_directories_and_merges() {
        let mut stats = stats_from(vec![
            event(0, "a/script.json(setup)", 100),
            event(1, "b/script.json(setup)", 10),
        ]);
        assert_eq!(stats.rows.len(), 2);
        stats.strip_dirs();
        assert_eq!(stats.rows.len(), 1);
        assert_eq!(stats.rows[0].symbol, "script.json(setup)");
        assert_eq!(stats.rows[0].calls, 2);
        assert_eq!(stats.rows[0].total_nanos, 110);
    }

    #[test]
    fn sort_keys_order_rows_deterministically() {
        let mut stats = stats_from(vec![
            event(0, "s(beta)", 10),
            event(1, "s(alpha)", 10),
            event(2, "s(alpha)", 10),
            event(3, "s(gamma)", 500),
        ]);

        stats.sort_by(SortKey::Calls);
        let by_calls: Vec<&str> = stats.rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(by_calls, vec!["s(alpha)", "s(beta)", "s(gamma)"]);

        stats.sort_by(SortKey::Time);
        assert_eq!(stats.rows[0].symbol, "s(gamma)");

        stats.sort_by(SortKey::Name);
        let by_name: Vec<&str> = stats.rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(by_name, vec!["s(alpha)", "s(beta)", "s(gamma)"]);
    }

    #[test]
    fn sort_none_keeps_load_order() {
        let mut stats = stats_from(vec![
            event(0, "s(zulu)", 1),
            event(1, "s(alpha)", 1),
        ]);
        stats.sort_by(SortKey::None);
        assert_eq!(stats.rows[0].symbol, "s(zulu)");
        assert_eq!(stats.rows[1].symbol, "s(alpha)");
    }

    #[test]
    fn print_respects_the_row_limit() {
        let stats = stats_from(vec![
            event(0, "s(a)", 1),
            event(1, "s(b)", 1),
            event(2, "s(c)", 1),
        ]);
        let mut out = Vec::new();
        stats.print(&mut out, 2).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("s(a)"));
        assert!(text.contains("s(b)"));
        assert!(!text.contains("s(c)"));
        assert!(text.contains("(1 more rows not shown)"));
    }

    #[test]
    fn dump_writes_a_reloadable_file() {
        let stats = stats_from(vec![event(0, "s(a)", 1)]);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("stats.json");
        stats.dump(&out).unwrap();
        let bytes = std::fs::read(&out).unwrap();
        assert!(!bytes.is_empty());
        let reloaded: Statistics = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reloaded.rows.len(), 1);
        assert_eq!(reloaded.seed, stats.seed);
    }
}
