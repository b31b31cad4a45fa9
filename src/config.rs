//! `hotstep.toml` config loading.

use serde::{Deserialize, Serialize};

use std::path::Path;

use crate::SortKey;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Engine RNG seed override.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Sort key used when `-s` is not given.
    #[serde(default)]
    pub default_sort: Option<SortKey>,

    /// Maximum report rows printed (0 prints all).
    #[serde(default)]
    pub report_limit: usize,
}

impl Config {
    pub fn load_optional(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<Config>(&s) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!("failed to parse config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!("failed to read config {}: {err}", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = Config::load_optional(Path::new("/nonexistent/hotstep.toml"));
        assert!(cfg.seed.is_none());
        assert!(cfg.default_sort.is_none());
        assert_eq!(cfg.report_limit, 0);
    }

    #[test]
    fn parses_a_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"seed = 42\ndefault_sort = \"calls\"\nreport_limit = 5\n").unwrap();
        let cfg = Config::load_optional(file.path());
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.default_sort, Some(SortKey::Calls));
        assert_eq!(cfg.report_limit, 5);
    }

    #[test]
    fn malformed_config_degrades_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"report_limit = \"lots\"\n").unwrap();
        let cfg = Config::load_optional(file.path());
        assert_eq!(cfg.report_limit, 0);
    }
}
