//! Optional config from .summarc or ~/.summarc (JSON). Merged with env and CLI.

use std::path::Path;

use log::warn;
use serde::Deserialize;

pub const CONFIG_FILE: &str = ".summarc";
pub const MAX_CONCURRENCY: usize = 256;
const DEFAULT_CONCURRENCY_CAP: usize = 16;

/// Optional config from file. CLI and env override these.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub concurrency: Option<usize>,
    pub quiet: Option<bool>,
    pub color: Option<bool>,
    pub delimiter: Option<char>,
}

/// Load config from .summarc in dir, then ~/.summarc. Missing file = default;
/// an unreadable or invalid file is skipped with a warning.
pub fn load_config(dir: &Path) -> Config {
    let mut candidates = vec![dir.join(CONFIG_FILE)];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(CONFIG_FILE));
    }
    candidates
        .iter()
        .find(|path| path.is_file())
        .map(|path| read_config(path))
        .unwrap_or_default()
}

fn read_config(path: &Path) -> Config {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("ignoring {}: {}", path.display(), e);
            return Config::default();
        }
    };
    match serde_json::from_str(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("ignoring invalid config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// SUMMA_CONCURRENCY, if set to a positive integer.
pub fn concurrency_from_env() -> Option<usize> {
    std::env::var("SUMMA_CONCURRENCY")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
}

/// SUMMA_QUIET=1 or SUMMA_QUIET=true.
pub fn quiet_from_env() -> bool {
    std::env::var("SUMMA_QUIET")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn default_concurrency() -> usize {
    num_cpus::get().clamp(1, DEFAULT_CONCURRENCY_CAP)
}

/// Pick the worker count: CLI flag, then env, then config file, then CPU count.
/// The result is always within `1..=MAX_CONCURRENCY`.
pub fn resolve_concurrency(cli: Option<usize>, env: Option<usize>, cfg: &Config) -> usize {
    cli.or(env)
        .or(cfg.concurrency)
        .unwrap_or_else(default_concurrency)
        .clamp(1, MAX_CONCURRENCY)
}
