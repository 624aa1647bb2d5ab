//! Application entry point
//!
//! The launcher's only contract with the application: call it last, once,
//! unconditionally. Whatever it returns or fails with is the caller's business.

use std::ffi::{OsStr, OsString};
use std::process::Command;

use thiserror::Error;

use crate::config::EntryConfig;
use crate::debugger::Attachment;

#[derive(Error, Debug)]
pub enum EntryError {
    #[error("no entry point configured: pass a command or set [entry] program in the config")]
    MissingProgram,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to exec {program}: {source}")]
    Exec {
        program: String,
        source: std::io::Error,
    },
}

/// Something the launcher hands control to
pub trait EntryPoint {
    type Output;

    /// Run the application. `attachment` is set when a debugger attached first.
    fn invoke(self, attachment: Option<&Attachment>) -> Self::Output;
}

impl<F, T> EntryPoint for F
where
    F: FnOnce(Option<&Attachment>) -> T,
{
    type Output = T;

    fn invoke(self, attachment: Option<&Attachment>) -> T {
        self(attachment)
    }
}

/// Runs an external program as the entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    program: OsString,
    args: Vec<OsString>,
    replace_process: bool,
}

impl CommandEntry {
    pub fn new(program: impl Into<OsString>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
            replace_process: cfg!(unix),
        }
    }

    /// Pick the command line over the configured program
    ///
    /// A non-empty `command` (program followed by its arguments) wins entirely;
    /// configured args are only used with the configured program. Command-line
    /// arguments are kept as raw OS strings; they need not be UTF-8.
    pub fn resolve(command: &[OsString], config: &EntryConfig) -> Result<Self, EntryError> {
        let entry = match command.split_first() {
            Some((program, args)) => Self::new(program.clone(), args.to_vec()),
            None => {
                let program = config.program.as_deref().ok_or(EntryError::MissingProgram)?;
                Self::new(program, config.args.iter().map(OsString::from).collect())
            }
        };
        Ok(entry.replace_process(config.replace_process))
    }

    /// Exec into the program (Unix) instead of spawning and waiting
    pub fn replace_process(mut self, replace: bool) -> Self {
        self.replace_process = replace && cfg!(unix);
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn replaces_process(&self) -> bool {
        self.replace_process
    }

    /// Program and arguments, shell-ish, for diagnostics
    ///
    /// Bytes that are not valid UTF-8 show up as U+FFFD.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    fn command(&self, attachment: Option<&Attachment>) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(attachment) = attachment {
            command.envs(attachment.env.iter().map(|(k, v)| (k, v)));
        }
        command
    }

    #[cfg(unix)]
    fn exec(&self, attachment: Option<&Attachment>) -> Result<i32, EntryError> {
        use std::os::unix::process::CommandExt;

        tracing::debug!(program = ?self.program, args = ?self.args, "exec entry point");
        // Only returns on failure
        let source = self.command(attachment).exec();
        Err(EntryError::Exec {
            program: self.program_name(),
            source,
        })
    }

    #[cfg(not(unix))]
    fn exec(&self, attachment: Option<&Attachment>) -> Result<i32, EntryError> {
        self.spawn(attachment)
    }

    fn spawn(&self, attachment: Option<&Attachment>) -> Result<i32, EntryError> {
        tracing::debug!(program = ?self.program, args = ?self.args, "spawning entry point");
        let status = self
            .command(attachment)
            .status()
            .map_err(|source| EntryError::Spawn {
                program: self.program_name(),
                source,
            })?;
        let code = exit_code(status);
        tracing::debug!(code, "entry point exited");
        Ok(code)
    }
}

impl EntryPoint for CommandEntry {
    type Output = Result<i32, EntryError>;

    /// Returns the program's exit code; with `replace_process` it returns only on failure
    fn invoke(self, attachment: Option<&Attachment>) -> Self::Output {
        if self.replace_process {
            self.exec(attachment)
        } else {
            self.spawn(attachment)
        }
    }
}

/// Map a child status to the code the launcher should exit with
///
/// Signal deaths follow the shell convention of 128 + signal number.
pub fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
