//! Configuration loader: merges env vars, .env file, and config.toml.

use common::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

use prop_strategy::config::{AdjusterParams, EdgeConfig, LineSanity, RankerConfig};

// ── Scanner config types ──────────────────────────────────────────────

/// Top-level scanner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Default target bookmaker for `compare`.
    #[serde(default)]
    pub target_bookmaker: Option<String>,

    #[serde(default)]
    pub adjuster: AdjusterParams,

    #[serde(default)]
    pub sanity: LineSanity,

    #[serde(default)]
    pub ranker: RankerConfig,

    #[serde(default)]
    pub edge: EdgeConfig,

    #[serde(default)]
    pub timing: TimingConfig,
}

/// Watch-mode timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Snapshot older than this is reloaded from disk.
    #[serde(default = "default_snapshot_max_age")]
    pub snapshot_max_age_secs: u64,
}

fn default_refresh_interval() -> u64 {
    60
}

fn default_snapshot_max_age() -> u64 {
    300
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            snapshot_max_age_secs: default_snapshot_max_age(),
        }
    }
}

impl ScannerConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.adjuster.validate()?;
        self.ranker.validate()?;
        self.edge.validate()?;
        if self.timing.refresh_interval_secs == 0 {
            return Err(Error::Config(
                "timing.refresh_interval_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}

// ── Config loader ─────────────────────────────────────────────────────

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, Error> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} is not a valid value: {:?}", name, raw))),
        _ => Ok(None),
    }
}

/// Load scanner configuration from environment and an optional config file.
/// Without a path, `config.toml` in the working directory is used if present.
pub fn load_config_from(path: Option<&Path>) -> Result<ScannerConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = ScannerConfig::default();

    // 3. Try loading the config file if it exists. An explicit path must exist.
    let config_path = path.unwrap_or_else(|| Path::new("config.toml"));
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", config_path.display(), e))
        })?;
        config = toml::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", config_path.display(), e))
        })?;
    } else if path.is_some() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            config_path.display()
        )));
    }

    // 4. Override with environment variables (highest priority).
    if let Some(v) = env_parse("PROP_MIN_EV")? {
        config.ranker.min_ev = v;
    }
    if let Some(v) = env_parse("PROP_MAX_EV")? {
        config.ranker.max_ev = v;
    }
    if let Some(v) = env_parse("PROP_MIN_BOOKMAKERS")? {
        config.ranker.min_bookmakers = v;
    }
    if let Some(v) = env_parse("PROP_TOP_N")? {
        config.ranker.top_n = v;
    }
    if let Some(v) = env_parse("PROP_MIN_EDGE")? {
        config.edge.min_edge = v;
    }
    if let Ok(book) = std::env::var("PROP_TARGET_BOOKMAKER") {
        if !book.trim().is_empty() {
            config.target_bookmaker = Some(book.trim().to_string());
        }
    }

    // 5. Validate thresholds.
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let file = make_config_file(
            r#"
target_bookmaker = "fanduel"

[ranker]
min_ev = 3.0
top_n = 25

[edge]
min_edge = 2.5
"#,
        );
        let cfg = load_config_from(Some(file.path())).unwrap();
        assert_eq!(cfg.target_bookmaker.as_deref(), Some("fanduel"));
        assert_eq!(cfg.ranker.min_ev, 3.0);
        assert_eq!(cfg.ranker.top_n, 25);
        assert_eq!(cfg.ranker.max_ev, 80.0);
        assert_eq!(cfg.edge.min_edge, 2.5);
        assert_eq!(cfg.edge.max_odds_difference, 300.0);
        assert_eq!(cfg.adjuster.per_unit_shift, 0.075);
        assert_eq!(cfg.timing.refresh_interval_secs, 60);
    }

    #[test]
    fn test_inconsistent_thresholds_rejected() {
        let file = make_config_file("[ranker]\nmin_ev = 90.0\nmax_ev = 10.0\n");
        let err = load_config_from(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {:?}", err);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/prop-scanner.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let file = make_config_file("[ranker\nmin_ev = ");
        assert!(matches!(
            load_config_from(Some(file.path())),
            Err(Error::Config(_))
        ));
    }
}
