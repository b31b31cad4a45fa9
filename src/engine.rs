//! Deterministic step engine: the measurement side of the profiler.
//!
//! This is the narrow "load a script by path and run it as main" capability.
//! The harness delegates execution here and never interprets script content
//! itself.

use rand_chacha::ChaCha20Rng;
use rand_core::{OsRng, RngCore, SeedableRng};

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use crate::{
    parse_duration, HotstepError, HotstepResult, LogEvent, LogWriter, Script, Statement, Step,
};

/// Seed for the engine RNG: the config override when present, otherwise fresh
/// OS entropy. The chosen seed is recorded in the log header either way.
pub fn pick_seed(config_seed: Option<u64>) -> u64 {
    config_seed.unwrap_or_else(|| OsRng.next_u64())
}

struct Engine {
    rng: ChaCha20Rng,
    clock_ms: u64,
    kv: BTreeMap<String, String>,
    search_dir: PathBuf,
}

impl Engine {
    fn new(statement: &Statement, seed: u64) -> Self {
        let mut kv = BTreeMap::new();
        // Script arguments surface through the KV store as arg0..argN.
        for (i, arg) in statement.args().iter().enumerate() {
            kv.insert(format!("arg{i}"), arg.clone());
        }
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            clock_ms: 0,
            kv,
            search_dir: statement.search_dir(),
        }
    }

    fn apply(&mut self, step: &Step) -> HotstepResult<()> {
        match step {
            Step::TraceEvent { .. } => Ok(()),
            Step::RandU64 { key } => {
                let value = self.rng.next_u64();
                if let Some(key) = key {
                    self.kv.insert(key.clone(), value.to_string());
                }
                Ok(())
            }
            Step::AssertEqInt { a, b, msg } => {
                if a != b {
                    return Err(assertion(format!("{a} != {b}"), msg));
                }
                Ok(())
            }
            Step::AssertEqStr { a, b, msg } => {
                if a != b {
                    return Err(assertion(format!("{a:?} != {b:?}"), msg));
                }
                Ok(())
            }
            Step::Sleep { duration } => {
                let ms = parse_duration(duration)?;
                std::thread::sleep(std::time::Duration::from_millis(ms));
                self.clock_ms = self.clock_ms.saturating_add(ms);
                Ok(())
            }
            Step::Advance { duration } => {
                let ms = parse_duration(duration)?;
                self.clock_ms = self.clock_ms.saturating_add(ms);
                Ok(())
            }
            Step::SetKv { key, value } => {
                self.kv.insert(key.clone(), value.clone());
                Ok(())
            }
            Step::GetKvAssert { key, equals, is_null } => {
                let found = self.kv.get(key);
                if is_null.unwrap_or(false) {
                    if let Some(value) = found {
                        return Err(HotstepError::Assertion(format!(
                            "kv {key:?} expected to be unset, found {value:?}"
                        )));
                    }
                    return Ok(());
                }
                match (found, equals) {
                    (Some(value), Some(expected)) if value == expected => Ok(()),
                    (Some(value), Some(expected)) => Err(HotstepError::Assertion(format!(
                        "kv {key:?} is {value:?}, expected {expected:?}"
                    ))),
                    (None, Some(expected)) => Err(HotstepError::Assertion(format!(
                        "kv {key:?} is unset, expected {expected:?}"
                    ))),
                    (Some(_), None) => Ok(()),
                    (None, None) => Err(HotstepError::Assertion(format!("kv {key:?} is unset"))),
                }
            }
            Step::FsWrite { path, data } => {
                let path = self.resolve(path);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, data)?;
                Ok(())
            }
            Step::FsReadAssert { path, equals } => {
                let resolved = self.resolve(path);
                let data = std::fs::read_to_string(&resolved)?;
                if data != *equals {
                    return Err(HotstepError::Assertion(format!(
                        "{} contains {data:?}, expected {equals:?}",
                        resolved.display()
                    )));
                }
                Ok(())
            }
            Step::Exit { code } => Err(HotstepError::EarlyExit { code: code.unwrap_or(0) }),
            Step::Fail { message } => {
                Err(HotstepError::Script(format!("script failure: {message}")))
            }
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = PathBuf::from(path);
        if p.is_absolute() { p } else { self.search_dir.join(p) }
    }
}

/// Run the statement's script to completion under `writer`, recording one
/// timed event per executed step. Runs the script exactly once. The only
/// non-`Ok` outcome that is not a failure is `EarlyExit`, which is recorded
/// like any other step before it surfaces.
pub fn execute_statement(statement: &Statement, writer: &mut LogWriter, seed: u64) -> HotstepResult<()> {
    let script = Script::load(statement.script())?;
    script.validate()?;

    let mut engine = Engine::new(statement, seed);
    let symbol_base = statement.script().display().to_string();

    for (seq, step) in script.steps.iter().enumerate() {
        let started = Instant::now();
        let outcome = engine.apply(step);
        let dur_nanos = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);

        let mut fields = serde_json::Map::new();
        if let Step::TraceEvent { fields: event_fields, .. } = step {
            fields = event_fields.clone();
        }
        if let Step::Exit { code } = step {
            fields.insert("code".to_string(), serde_json::json!(code.unwrap_or(0)));
        }
        writer.record(LogEvent {
            seq,
            symbol: format!("{symbol_base}({})", step.label()),
            time_virtual_ms: engine.clock_ms,
            dur_nanos,
            fields,
        });

        outcome?;
    }
    Ok(())
}

fn assertion(detail: String, msg: &Option<String>) -> HotstepError {
    match msg {
        Some(m) => HotstepError::Assertion(format!("{m}: {detail}")),
        None => HotstepError::Assertion(detail),
    }
}
