//! catalyst-launch - Start the catalyst agent, optionally under a debugger
//!
//! Debugging is requested with `--debug` anywhere on the command line or a
//! truthy `ENABLE_PTVSD`. The launcher then waits for a debugger to attach
//! through the configured facility before starting the agent:
//!
//! - `dap`: listens on `0.0.0.0:5678` for a Debug Adapter Protocol client and
//!   hands the connection to the agent via `DEBUG_ADAPTER_FD`
//! - `ptrace`: waits for gdb/lldb to attach to the launcher pid
//!
//! # Usage
//!
//! ```sh
//! # Run the configured agent
//! catalyst-launch
//!
//! # Run a specific command, waiting for a debugger first
//! catalyst-launch --debug -- catalyst-agent --inbound-transport http 0.0.0.0 8020
//!
//! # Same, via the environment
//! ENABLE_PTVSD=1 catalyst-launch catalyst-agent
//! ```
//!
//! Exit code: whatever the agent exits with. Launcher failures exit 1.

use std::env;
use std::ffi::OsString;
use std::path::Path;

use anyhow::{Context, Result};

use launcher::{launch, CommandEntry, Config, DebugMode, DebugSource, Registry, DEBUG_ENV_VAR};

mod cli;


use cli::{Action, Cli, USAGE};

fn main() -> Result<()> {
    setup_logging();

    let args: Vec<OsString> = env::args_os().collect();
    tracing::debug!(?args, "starting");

    let cli = Cli::parse(&args)?;
    if cli.action == Action::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let (mut config, config_source) = Config::load(cli.config_path.as_deref())?;
    config.apply_env_overrides();

    // Computed once, before anything else runs
    let mode = DebugMode::from_process();

    if cli.action == Action::Status {
        print_status(&mode, &config, config_source.as_deref(), &cli.command);
        return Ok(());
    }

    let entry = CommandEntry::resolve(&cli.command, &config.entry)?;
    tracing::info!(entry = %entry.display(), debug = mode.enabled(), "launching");

    let mut stdout = std::io::stdout();
    let code = launch(mode, &config.debugger, &Registry, &mut stdout, entry)?
        .context("entry point failed")?;

    std::process::exit(code)
}

/// Print the resolved launch plan
fn print_status(mode: &DebugMode, config: &Config, config_source: Option<&Path>, command: &[OsString]) {
    let env_value = env::var_os(DEBUG_ENV_VAR);

    println!("catalyst-launch status:");
    println!("  debug: {}", match mode.source() {
        DebugSource::Flag => "enabled (--debug)".to_string(),
        DebugSource::Environment => format!("enabled ({DEBUG_ENV_VAR}={})", display_env(&env_value)),
        DebugSource::Disabled => "disabled".to_string(),
    });
    println!("  {DEBUG_ENV_VAR}: {}", display_env(&env_value));
    println!("  facility: {} (known: {})", config.debugger.facility, Registry::NAMES.join(", "));
    println!("  attach address: {}", config.debugger.address());
    println!("  config: {}", match config_source {
        Some(path) => path.display().to_string(),
        None => "(defaults)".to_string(),
    });
    println!("  entry: {}", match CommandEntry::resolve(command, &config.entry) {
        Ok(entry) => entry.display(),
        Err(e) => format!("NOT SET - {e}"),
    });
}

fn display_env(value: &Option<OsString>) -> String {
    match value {
        Some(v) => format!("{:?}", v.to_string_lossy()),
        None => "(not set)".to_string(),
    }
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // Plain output when NO_COLOR is set
    let use_ansi = env::var("NO_COLOR").is_err();

    // stdout belongs to the launcher diagnostics and the agent
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .with_ansi(use_ansi),
        )
        .with(filter)
        .init();
}
