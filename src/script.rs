//! Script file parsing and the step DSL executed under the profiler.

use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

use crate::{parse_duration, HotstepError, HotstepResult};

/// The target script invocation to be profiled: a script path plus the
/// arguments handed through to it.
#[derive(Debug, Clone)]
pub struct Statement {
    script: PathBuf,
    args: Vec<String>,
}

impl Statement {
    pub fn new(script: PathBuf, args: Vec<String>) -> Self {
        Self { script, args }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Directory that script-relative paths resolve against.
    pub fn search_dir(&self) -> PathBuf {
        match self.script.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptFile {
    pub version: u32,
    pub name: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    TraceEvent { name: String, #[serde(default)] fields: serde_json::Map<String, serde_json::Value> },
    RandU64 { #[serde(default)] key: Option<String> },
    AssertEqInt { a: i64, b: i64, #[serde(default)] msg: Option<String> },
    AssertEqStr { a: String, b: String, #[serde(default)] msg: Option<String> },
    Sleep { duration: String },
    Advance { duration: String },
    SetKv { key: String, value: String },
    GetKvAssert { key: String, #[serde(default)] equals: Option<String>, #[serde(default)] is_null: Option<bool> },
    FsWrite { path: String, data: String },
    FsReadAssert { path: String, equals: String },
    Exit { #[serde(default)] code: Option<i32> },
    Fail { message: String },
}

impl Step {
    /// Label the step's timing is attributed to in the statistics.
    pub fn label(&self) -> &str {
        match self {
            Step::TraceEvent { name, .. } => name,
            Step::RandU64 { .. } => "rand_u64",
            Step::AssertEqInt { .. } => "assert_eq_int",
            Step::AssertEqStr { .. } => "assert_eq_str",
            Step::Sleep { .. } => "sleep",
            Step::Advance { .. } => "advance",
            Step::SetKv { .. } => "set_kv",
            Step::GetKvAssert { .. } => "get_kv_assert",
            Step::FsWrite { .. } => "fs_write",
            Step::FsReadAssert { .. } => "fs_read_assert",
            Step::Exit { .. } => "exit",
            Step::Fail { .. } => "fail",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Script {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> HotstepResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            HotstepError::Script(format!("cannot read script {}: {e}", path.display()))
        })?;
        let file: ScriptFile = serde_json::from_slice(&bytes).map_err(|e| {
            HotstepError::Script(format!("cannot parse script {}: {e}", path.display()))
        })?;
        if file.version != 1 {
            return Err(HotstepError::Script(format!(
                "unsupported script version {} (expected 1)",
                file.version
            )));
        }
        Ok(Self { name: file.name, steps: file.steps })
    }

    pub fn validate(&self) -> HotstepResult<()> {
        for step in &self.steps {
            match step {
                Step::Sleep { duration } | Step::Advance { duration } => {
                    parse_duration(duration)?;
                }
                Step::GetKvAssert { equals: Some(_), is_null: Some(true), .. } => {
                    return Err(HotstepError::Script(
                        "get_kv_assert: cannot set both equals and is_null=true".to_string(),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
