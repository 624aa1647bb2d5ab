//! Command-line parsing
//!
//! Launcher options come first; the first non-option (or everything after
//! `--`) is the entry command and is forwarded untouched.

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{bail, Result};

use launcher::DEBUG_FLAG;

pub(crate) const USAGE: &str = "\
usage: catalyst-launch [--debug] [--config PATH] [--status] [--] [PROGRAM [ARGS...]]

Start PROGRAM (or the configured [entry] program). With --debug or a truthy
ENABLE_PTVSD, wait for a debugger to attach first.

options:
  --debug          wait for a debugger before starting
  --config PATH    read launcher config from PATH
  --status         show what would be launched and exit
  -h, --help       show this help

environment:
  ENABLE_PTVSD                 enable debugging unless empty, \"false\" or \"0\"
  CATALYST_LAUNCHER_CONFIG     config file to use when --config is absent
  DEBUGGER_FACILITY            debug facility (dap, ptrace)
  DEBUGGER_HOST, DEBUGGER_PORT address the dap facility listens on
  RUST_LOG                     log filter (default: warn)";

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Launch,
    Status,
    Help,
}

/// Parsed launcher arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cli {
    pub action: Action,
    pub config_path: Option<PathBuf>,
    /// Entry program and its arguments, empty when taken from config
    pub command: Vec<OsString>,
}

impl Cli {
    /// Parse the full argument list (argv[0] included)
    ///
    /// `--debug` is accepted here but debug mode itself is resolved from the
    /// whole argument list, so a `--debug` meant for the entry program counts too.
    /// Only launcher options need to be UTF-8; the entry command is kept as raw
    /// OS strings.
    pub fn parse(args: &[OsString]) -> Result<Self> {
        let mut cli = Cli {
            action: Action::Launch,
            config_path: None,
            command: Vec::new(),
        };

        let mut rest = args.iter().skip(1);
        while let Some(arg) = rest.next() {
            let Some(text) = arg.to_str() else {
                if arg.as_encoded_bytes().first() == Some(&b'-') {
                    bail!("unknown option: {}\n\n{USAGE}", arg.to_string_lossy());
                }
                cli.command = std::iter::once(arg).chain(rest).cloned().collect();
                break;
            };

            match text {
                "--" => {
                    cli.command = rest.cloned().collect();
                    break;
                }
                flag if flag == DEBUG_FLAG => {}
                "--config" => match rest.next() {
                    Some(path) => cli.config_path = Some(PathBuf::from(path)),
                    None => bail!("missing path after --config"),
                },
                "--status" => cli.action = Action::Status,
                "-h" | "--help" => {
                    cli.action = Action::Help;
                    return Ok(cli);
                }
                option if option.starts_with('-') && option.len() > 1 => {
                    bail!("unknown option: {option}\n\n{USAGE}");
                }
                _ => {
                    cli.command = std::iter::once(arg).chain(rest).cloned().collect();
                    break;
                }
            }
        }

        Ok(cli)
    }
}
