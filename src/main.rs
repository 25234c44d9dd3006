//! Thin CLI layer: parse args, styled output, and call into summa-core.
//! Crash-proof: panic caught and reported; all errors return Result.

mod utils;

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use indicatif::ProgressBar;
use log::debug;

use summa_core::config::{concurrency_from_env, resolve_concurrency};
use summa_core::{load_config, summarize_csv_files, Config, CsvOptions, CsvSummary, JsonSummary};

use crate::utils::{dim, error, init_logging, is_quiet_env, progress_bar, use_color, warning};

fn cli() -> Command {
    let files_arg = Arg::new("file")
        .required(true)
        .num_args(1..)
        .value_parser(clap::value_parser!(PathBuf))
        .help("Input file(s)");
    let concurrency_arg = Arg::new("concurrency")
        .short('c')
        .long("concurrency")
        .value_parser(clap::value_parser!(usize))
        .help("Max files processed at once (or set SUMMA_CONCURRENCY)");
    let json_arg = Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output machine-readable JSON");
    let quiet_arg = Arg::new("quiet")
        .short('q')
        .long("quiet")
        .action(ArgAction::SetTrue)
        .help("Minimal output; no progress bar");

    Command::new("summa")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Summarize JSON file shapes and CSV groups")
        .after_help(
            "Examples:\n  summa json data/*.json -c 4\n  summa csv sales.csv --group-by region --value amount",
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("json")
                .about("Summarize the shape of each JSON file")
                .arg(files_arg.clone())
                .arg(concurrency_arg.clone())
                .arg(json_arg.clone())
                .arg(quiet_arg.clone()),
        )
        .subcommand(
            Command::new("csv")
                .about("Group CSV rows by a column and aggregate a numeric column")
                .arg(files_arg)
                .arg(
                    Arg::new("group-by")
                        .short('g')
                        .long("group-by")
                        .required(true)
                        .help("Column to group rows by"),
                )
                .arg(
                    Arg::new("value")
                        .short('v')
                        .long("value")
                        .required(true)
                        .help("Numeric column to aggregate"),
                )
                .arg(
                    Arg::new("delimiter")
                        .short('d')
                        .long("delimiter")
                        .value_parser(clap::value_parser!(char))
                        .help("Field delimiter (default ',')"),
                )
                .arg(concurrency_arg)
                .arg(json_arg)
                .arg(quiet_arg),
        )
}

fn quiet(sub: &ArgMatches, cfg: &Config) -> bool {
    sub.get_flag("quiet") || is_quiet_env() || cfg.quiet == Some(true)
}

fn concurrency(sub: &ArgMatches, cfg: &Config) -> usize {
    resolve_concurrency(
        sub.get_one::<usize>("concurrency").copied(),
        concurrency_from_env(),
        cfg,
    )
}

fn files(sub: &ArgMatches) -> Vec<PathBuf> {
    sub.get_many::<PathBuf>("file")
        .map(|v| v.cloned().collect())
        .unwrap_or_default()
}

#[cfg(feature = "async")]
fn summarize_json(paths: Vec<PathBuf>, concurrency: usize, pb: ProgressBar) -> Result<Vec<JsonSummary>> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .build()
        .context("failed to start async runtime")?;
    let summaries = rt.block_on(summa_core::summarize_json_files_async(
        paths,
        concurrency,
        move |_| pb.inc(1),
    ))?;
    Ok(summaries)
}

#[cfg(not(feature = "async"))]
fn summarize_json(paths: Vec<PathBuf>, concurrency: usize, pb: ProgressBar) -> Result<Vec<JsonSummary>> {
    Ok(summa_core::summarize_json_files(&paths, concurrency, |_| {
        pb.inc(1)
    })?)
}

fn cmd_json(sub: &ArgMatches, cfg: &Config) -> Result<()> {
    let paths = files(sub);
    let quiet = quiet(sub, cfg);
    let concurrency = concurrency(sub, cfg);
    debug!("summarizing {} JSON files, concurrency {}", paths.len(), concurrency);

    let pb = progress_bar(paths.len(), quiet)?;
    let result = summarize_json(paths, concurrency, pb.clone());
    pb.finish_and_clear();
    let summaries = result?;

    if sub.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    for s in &summaries {
        println!(
            "{}  {}  {}",
            s.path.display().to_string().bold(),
            s.describe(),
            format!("({} bytes, depth {})", s.bytes, s.depth).dimmed()
        );
    }
    if !quiet {
        dim(&format!("{} file(s) summarized", summaries.len()));
    }
    Ok(())
}

fn print_csv_table(summary: &CsvSummary) {
    let width = summary
        .groups
        .iter()
        .map(|g| g.key.len())
        .chain(std::iter::once(summary.group_by.len()))
        .max()
        .unwrap_or(0);
    println!(
        "{}",
        format!(
            "{:<width$}  {:>8}  {:>12}  {:>12}  {:>12}  {:>12}",
            summary.group_by,
            "count",
            "sum",
            "mean",
            "min",
            "max",
            width = width
        )
        .bold()
    );
    for g in &summary.groups {
        println!(
            "{:<width$}  {:>8}  {:>12.2}  {:>12.2}  {:>12.2}  {:>12.2}",
            g.key,
            g.count,
            g.sum,
            g.mean,
            g.min,
            g.max,
            width = width
        );
    }
}

fn cmd_csv(sub: &ArgMatches, cfg: &Config) -> Result<()> {
    let paths = files(sub);
    let quiet = quiet(sub, cfg);
    let concurrency = concurrency(sub, cfg);

    let delimiter = sub
        .get_one::<char>("delimiter")
        .copied()
        .or(cfg.delimiter)
        .unwrap_or(',');
    if !delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character, got '{}'", delimiter);
    }
    let group_by = sub
        .get_one::<String>("group-by")
        .context("--group-by is required")?;
    let value = sub
        .get_one::<String>("value")
        .context("--value is required")?;
    let opts = CsvOptions::new(group_by, value).with_delimiter(delimiter as u8);
    debug!(
        "grouping {} CSV files by '{}' over '{}', concurrency {}",
        paths.len(),
        opts.group_by,
        opts.value,
        concurrency
    );

    let summary = summarize_csv_files(&paths, &opts, concurrency)?;

    if sub.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    if summary.groups.is_empty() {
        warning(&format!("No rows with a value in column '{}'", opts.value));
        return Ok(());
    }
    print_csv_table(&summary);
    if !quiet {
        dim(&format!(
            "{} row(s) in {} group(s) from {} file(s)",
            summary.total_count(),
            summary.groups.len(),
            paths.len()
        ));
    }
    Ok(())
}

fn run() -> Result<()> {
    let matches = cli().get_matches();
    let Some((name, sub)) = matches.subcommand() else {
        return Ok(());
    };
    init_logging(sub.get_flag("quiet") || is_quiet_env());

    let cwd = env::current_dir().context("cannot read current directory")?;
    let cfg = load_config(&cwd);
    if !use_color(&cfg) {
        colored::control::set_override(false);
    }

    match name {
        "json" => cmd_json(sub, &cfg),
        "csv" => cmd_csv(sub, &cfg),
        other => bail!("unknown command '{}'", other),
    }
}

fn main() {
    let code = match std::panic::catch_unwind(run) {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            error(&format!("{:#}", e));
            1
        }
        Err(_) => {
            error("An unexpected error occurred. Please report this issue.");
            1
        }
    };
    std::process::exit(code);
}
