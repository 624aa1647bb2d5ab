//! Debug mode resolution
//!
//! Debugging is requested either through the `ENABLE_PTVSD` environment
//! variable or the `--debug` flag anywhere on the command line.

use std::env;
use std::ffi::OsStr;

/// Environment variable that requests debugging
pub const DEBUG_ENV_VAR: &str = "ENABLE_PTVSD";

/// Command-line flag that requests debugging
pub const DEBUG_FLAG: &str = "--debug";

/// Values of `ENABLE_PTVSD` that keep debugging off (compared case-insensitively)
const NEGATORY_VALUES: [&str; 2] = ["false", "0"];

/// Where the debug request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSource {
    /// `--debug` was on the command line
    Flag,
    /// `ENABLE_PTVSD` held a truthy value
    Environment,
    /// Nothing requested debugging
    Disabled,
}

/// Whether the launcher should wait for a debugger before starting the entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMode {
    enabled: bool,
    source: DebugSource,
}

impl DebugMode {
    /// Debugging off
    pub const fn disabled() -> Self {
        Self { enabled: false, source: DebugSource::Disabled }
    }

    /// Resolve from an environment value and the full argument list (argv[0] included)
    pub fn resolve<S: AsRef<OsStr>>(env_value: Option<&OsStr>, args: &[S]) -> Self {
        if args_request_debug(args) {
            Self { enabled: true, source: DebugSource::Flag }
        } else if env_value_enables(env_value) {
            Self { enabled: true, source: DebugSource::Environment }
        } else {
            Self::disabled()
        }
    }

    /// Resolve from the current process environment and arguments
    pub fn from_process() -> Self {
        let args: Vec<_> = env::args_os().collect();
        Self::resolve(env::var_os(DEBUG_ENV_VAR).as_deref(), &args)
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn source(&self) -> DebugSource {
        self.source
    }
}

/// Check whether an `ENABLE_PTVSD` value turns debugging on
///
/// Unset and empty values are off, as are `false` and `0` in any case.
/// Every other value, including non-UTF-8 ones, is on.
pub fn env_value_enables(value: Option<&OsStr>) -> bool {
    let Some(value) = value else {
        return false;
    };
    if value.is_empty() {
        return false;
    }
    let value = value.to_string_lossy();
    !NEGATORY_VALUES
        .iter()
        .any(|negatory| value.eq_ignore_ascii_case(negatory))
}

/// Check whether `--debug` appears anywhere in the argument list
pub fn args_request_debug<S: AsRef<OsStr>>(args: &[S]) -> bool {
    args.iter().any(|arg| arg.as_ref() == DEBUG_FLAG)
}
