//! HopeStream CLI: inspect configuration and replay DAO scenarios.

mod script;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use hopestream_dao::{Dao, DaoConfig, LogFormat};
use hopestream_nullables::NullClock;
use hopestream_utils::format_duration;

use crate::script::{Runner, Script};

#[derive(Parser)]
#[command(name = "hopestream", about = "HopeStream donation DAO tooling")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "HOPESTREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "HOPESTREAM_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "HOPESTREAM_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print the effective configuration as TOML.
    Config,

    /// Replay a scenario script and print the audit trail as JSON lines.
    Simulate {
        /// Scenario script (TOML with `[[step]]` tables).
        script: PathBuf,

        /// Resume from a bincode snapshot instead of a fresh deployment.
        #[arg(long)]
        load_state: Option<PathBuf>,

        /// Write a bincode snapshot of the final state.
        #[arg(long)]
        save_state: Option<PathBuf>,

        /// Stop at the first rejected step.
        #[arg(long)]
        strict: bool,
    },

    /// Print vault statistics from a saved snapshot as JSON.
    Inspect {
        state: PathBuf,
    },
}

fn effective_config(cli: &Cli) -> anyhow::Result<DaoConfig> {
    let mut config = match &cli.config {
        Some(path) => DaoConfig::from_toml_file(path)?,
        None => DaoConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    config.validate()?;
    Ok(config)
}

/// Whether a restored deployment differs from the effective config in
/// anything but logging.
fn overrides_ignored(effective: &DaoConfig, restored: &DaoConfig) -> bool {
    let mut effective = effective.clone();
    effective.log_level = restored.log_level.clone();
    effective.log_format = restored.log_format;
    effective != *restored
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = effective_config(&cli)?;
    hopestream_dao::init_logging(&config);
    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    let mut out = std::io::stdout().lock();
    match cli.command {
        Command::Config => {
            write!(out, "{}", config.to_toml_string()?)?;
        }
        Command::Simulate {
            script,
            load_state,
            save_state,
            strict,
        } => {
            let text = std::fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let script = Script::from_toml_str(&text)?;
            let start = script.start_secs();
            let clock = NullClock::new(start);
            let dao = match &load_state {
                Some(path) => {
                    let bytes = std::fs::read(path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    let dao = Dao::restore_bytes(&bytes, &clock)?;
                    if overrides_ignored(&config, dao.config()) {
                        tracing::warn!(
                            "{} carries its own deployment config; settings from --config and flags other than logging are ignored",
                            path.display()
                        );
                    }
                    dao
                }
                None => Dao::new(config, &clock)?,
            };
            let mut runner = Runner::new(dao, &clock);

            let mut printed = 0;
            let mut rejected = 0usize;
            for (index, step) in script.steps.iter().enumerate() {
                let outcome = runner.apply(index, step)?;
                let records = runner.dao.audit().since(printed);
                for record in records {
                    writeln!(out, "{}", serde_json::to_string(record)?)?;
                }
                printed += records.len() as u64;
                if let Err(failure) = outcome {
                    let line = serde_json::json!({
                        "event": "StepRejected",
                        "step": failure.step,
                        "action": failure.action,
                        "code": failure.code,
                        "message": failure.message,
                    });
                    writeln!(out, "{line}")?;
                    rejected += 1;
                    if strict {
                        bail!("step {index} ({}) rejected: {}", failure.action, failure.message);
                    }
                }
            }
            tracing::info!(
                steps = script.steps.len(),
                rejected,
                "Replay finished at {} after {} of simulated time",
                runner.dao.now(),
                format_duration(runner.dao.now().as_secs().saturating_sub(start))
            );

            if let Some(path) = save_state {
                std::fs::write(&path, runner.dao.snapshot_bytes()?)
                    .with_context(|| format!("writing {}", path.display()))?;
                tracing::info!("Saved state to {}", path.display());
            }
        }
        Command::Inspect { state } => {
            let bytes =
                std::fs::read(&state).with_context(|| format!("reading {}", state.display()))?;
            let clock = NullClock::new(u64::MAX);
            let dao = Dao::restore_bytes(&bytes, &clock)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&dao.stats())?)?;
        }
    }
    Ok(())
}
