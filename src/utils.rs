//! Terminal helpers: colors, styled messages, progress and log setup.

use std::env;
use std::io::{IsTerminal, Write};

use chrono::Local;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

use summa_core::Config;

/// Color only when stdout is a TTY, NO_COLOR is unset and config allows it.
pub fn use_color(cfg: &Config) -> bool {
    std::io::stdout().is_terminal()
        && env::var("NO_COLOR").unwrap_or_default().is_empty()
        && cfg.color != Some(false)
}

pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

pub fn warning(msg: &str) {
    eprintln!("{}", msg.yellow());
}

pub fn dim(msg: &str) {
    println!("{}", msg.dimmed());
}

/// SUMMA_LOG=quiet behaves like --quiet, as does SUMMA_QUIET=1.
pub fn is_quiet_env() -> bool {
    summa_core::config::quiet_from_env()
        || env::var("SUMMA_LOG")
            .map(|v| v.eq_ignore_ascii_case("quiet"))
            .unwrap_or(false)
}

/// Install the stderr logger. Level comes from SUMMA_LOG (default `warn`);
/// quiet mode only lets errors through.
pub fn init_logging(quiet: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Warn);
    match env::var("SUMMA_LOG") {
        Ok(filters) if !filters.eq_ignore_ascii_case("quiet") => {
            builder.parse_filters(&filters);
        }
        _ => {}
    }
    if quiet {
        builder.filter_level(LevelFilter::Error);
    }
    builder
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        });
    // A second init (e.g. in tests) keeps the first logger.
    let _ = builder.try_init();
}

/// Progress bar on stderr; hidden when quiet, not a TTY, or only one item.
pub fn progress_bar(len: usize, quiet: bool) -> anyhow::Result<ProgressBar> {
    if quiet || len < 2 || !std::io::stderr().is_terminal() {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.dim} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    Ok(pb)
}
